pub(crate) mod cancel;
pub(crate) mod pipeline;
pub(crate) mod sink;
