//! Cooperative cancellation for long-running computations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, TaxonError};

/// Bulk loops poll their token once per this many comparisons.
pub const CANCEL_CHECK_INTERVAL: usize = 256;

/// A shared stop flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Checks the flag only when `counter` is a multiple of [`CANCEL_CHECK_INTERVAL`].
    #[inline]
    pub fn should_stop(&self, counter: usize) -> bool {
        counter % CANCEL_CHECK_INTERVAL == 0 && self.is_cancelled()
    }
}

/// Result of a computation that may have been cancelled.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Completed(T),
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::Cancelled => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Completed(value) => Outcome::Completed(f(value)),
            Outcome::Cancelled => Outcome::Cancelled,
        }
    }

    /// `Cancelled` becomes [`TaxonError::ComputationCancelled`].
    pub fn into_result(self) -> Result<T> {
        match self {
            Outcome::Completed(value) => Ok(value),
            Outcome::Cancelled => Err(TaxonError::ComputationCancelled),
        }
    }
}
