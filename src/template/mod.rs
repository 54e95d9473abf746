pub(crate) mod annotation;
pub(crate) mod classify;
pub(crate) mod decompose;
pub(crate) mod embed;
pub(crate) mod flatten;
pub(crate) mod mask;
pub(crate) mod measure;
