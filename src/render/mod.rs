pub(crate) mod compositor;
pub(crate) mod frame;
pub(crate) mod icon;
pub(crate) mod paint;
