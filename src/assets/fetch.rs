use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::foundation::error::{TesseraError, TesseraResult};

/// Source of raster/vector asset bytes referenced from markup.
pub trait AssetFetcher: Send + Sync {
    /// Fetch the bytes behind `reference` (a path or URL as written in the markup).
    fn fetch(&self, reference: &str) -> TesseraResult<Vec<u8>>;
}

/// Filesystem fetcher resolving relative references against a base directory.
///
/// `file://` URLs are accepted; remote (`http`/`https`) references are rejected so the caller
/// keeps the original reference.
#[derive(Clone, Debug)]
pub struct FsAssetFetcher {
    base_dir: PathBuf,
}

impl FsAssetFetcher {
    /// Fetcher rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Resolve a reference into a filesystem path.
    pub fn resolve(&self, reference: &str) -> TesseraResult<PathBuf> {
        let r = reference.trim();
        if r.is_empty() {
            return Err(TesseraError::asset_embed("empty asset reference"));
        }
        let lower = r.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Err(TesseraError::asset_embed(format!(
                "remote asset '{r}' cannot be fetched from the filesystem"
            )));
        }
        let r = r.strip_prefix("file://").unwrap_or(r);
        let p = Path::new(r);
        Ok(if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        })
    }
}

impl AssetFetcher for FsAssetFetcher {
    fn fetch(&self, reference: &str) -> TesseraResult<Vec<u8>> {
        let path = self.resolve(reference)?;
        std::fs::read(&path)
            .with_context(|| format!("read asset bytes from '{}'", path.display()))
            .map_err(|e| TesseraError::asset_embed(format!("{e:#}")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/fetch.rs"]
mod tests;
