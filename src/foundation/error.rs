/// Convenience result type used across tessera.
pub type TesseraResult<T> = Result<T, TesseraError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Only [`TesseraError::TemplateParse`], [`TesseraError::Collaborator`],
/// [`TesseraError::Validation`] and [`TesseraError::Cancelled`] reach callers of the public
/// operations. The remaining classes are raised internally and absorbed where the engine degrades
/// (skip an element, keep an original reference, fall back to a default size, skip a clip).
#[derive(thiserror::Error, Debug)]
pub enum TesseraError {
    /// Unreadable or malformed markup / annotation JSON.
    #[error("template parse error: {0}")]
    TemplateParse(String),

    /// An annotation id or a clip-path chain that points at nothing.
    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),

    /// A raster asset could not be fetched or inlined.
    #[error("asset embed error: {0}")]
    AssetEmbed(String),

    /// Bounding-box measurement failed or timed out.
    #[error("geometry measurement error: {0}")]
    GeometryMeasurement(String),

    /// A single clip failed to draw.
    #[error("draw error: {0}")]
    Draw(String),

    /// Frame-extraction or encoding service failure.
    #[error("collaborator error: {0}")]
    Collaborator(String),

    /// Invalid user-provided data or options.
    #[error("validation error: {0}")]
    Validation(String),

    /// The operation observed a cancellation request.
    #[error("operation cancelled")]
    Cancelled,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TesseraError {
    /// Build a [`TesseraError::TemplateParse`] value.
    pub fn template_parse(msg: impl Into<String>) -> Self {
        Self::TemplateParse(msg.into())
    }

    /// Build a [`TesseraError::UnresolvedReference`] value.
    pub fn unresolved(msg: impl Into<String>) -> Self {
        Self::UnresolvedReference(msg.into())
    }

    /// Build a [`TesseraError::AssetEmbed`] value.
    pub fn asset_embed(msg: impl Into<String>) -> Self {
        Self::AssetEmbed(msg.into())
    }

    /// Build a [`TesseraError::GeometryMeasurement`] value.
    pub fn measurement(msg: impl Into<String>) -> Self {
        Self::GeometryMeasurement(msg.into())
    }

    /// Build a [`TesseraError::Draw`] value.
    pub fn draw(msg: impl Into<String>) -> Self {
        Self::Draw(msg.into())
    }

    /// Build a [`TesseraError::Collaborator`] value.
    pub fn collaborator(msg: impl Into<String>) -> Self {
        Self::Collaborator(msg.into())
    }

    /// Build a [`TesseraError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
