use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;

use crate::foundation::error::TesseraResult;

static NEXT: AtomicU64 = AtomicU64::new(0);

/// Temporary directory removed with everything in it when dropped, including during unwinding.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create a fresh directory under the system temp dir.
    pub fn new(prefix: &str) -> TesseraResult<Self> {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!(
            "tessera_{prefix}_{}_{nanos}_{}",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&path)
            .with_context(|| format!("create scratch directory '{}'", path.display()))?;
        tracing::debug!(path = %path.display(), "scratch directory created");
        Ok(Self { path })
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of `name` inside the directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Write `bytes` to `name` inside the directory.
    pub fn write(&self, name: &str, bytes: &[u8]) -> TesseraResult<PathBuf> {
        let path = self.file(name);
        std::fs::write(&path, bytes)
            .with_context(|| format!("write scratch file '{}'", path.display()))?;
        Ok(path)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove scratch directory"
            );
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/scratch.rs"]
mod tests;
