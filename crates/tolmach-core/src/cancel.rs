//! Cooperative cancellation.
//!
//! Scheduling at the service boundary is single-threaded and cooperative:
//! long-running operations check a shared token at bounded intervals and
//! bail out with [`Cancelled`]. Partial results are discarded by the caller.
//! Parsing itself never suspends and therefore never observes cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The dedicated cancellation outcome. Never attached to a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Shared cancellation token. Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that can never be cancelled, for callers without a deadline.
    pub fn never() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Suspension-point check: `Err(Cancelled)` once triggered.
    #[inline]
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}
