pub(crate) mod data_uri;
pub(crate) mod fetch;
pub(crate) mod fonts;
pub(crate) mod raster;
pub(crate) mod text;
