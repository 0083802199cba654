//! Cooperative cancellation shared by index passes and searches.
//!
//! Scans look at the token once per walked entry; the search fan-in looks
//! before every flushed batch and providers look between rows. Nothing is
//! interrupted mid-statement.

use crate::error::PartSearchError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop flag. Clones observe the same state.
///
/// ```
/// use partsearch_core::cancel::CancellationToken;
///
/// let token = CancellationToken::new();
/// let worker_view = token.clone();
///
/// token.cancel();
/// assert!(worker_view.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder to stop at its next check. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// `Err(CancelledError)` once cancelled, for use with `?` in loops.
    pub fn check(&self) -> Result<(), CancelledError> {
        match self.is_cancelled() {
            true => Err(CancelledError),
            false => Ok(()),
        }
    }
}

/// The operation observed a cancelled token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cancelled")]
pub struct CancelledError;

impl From<CancelledError> for PartSearchError {
    fn from(_: CancelledError) -> Self {
        PartSearchError::Cancelled
    }
}
