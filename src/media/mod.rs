pub(crate) mod ffmpeg;
pub(crate) mod prefetch;
pub(crate) mod scratch;
pub(crate) mod service;
