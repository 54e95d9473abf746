use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::foundation::error::{TesseraError, TesseraResult};

/// Shared cooperative cancellation flag.
///
/// Clones observe the same flag. Long operations poll it between frames and batches.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> TesseraResult<()> {
        if self.is_cancelled() {
            Err(TesseraError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/cancel.rs"]
mod tests;
