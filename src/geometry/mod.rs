pub(crate) mod bounds;
pub(crate) mod path;
pub(crate) mod primitives;
pub(crate) mod transform;
