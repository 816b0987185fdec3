//! Cooperative cancellation for long-running despeckle calls.
//!
//! The engine polls its status token at every stage boundary; a poll is
//! the only point where a run can stop early. Cancellation unwinds as
//! [`DespeckleError::Cancelled`] without leaving a partially masked image
//! behind (the output image is only touched in the final stage).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::DespeckleError;

/// A cancellation token polled between pipeline stages.
pub trait TaskStatus {
    /// Returns true once the owner has requested cancellation.
    fn is_cancelled(&self) -> bool;

    /// Converts the flag into an error, for use at stage boundaries.
    ///
    /// # Errors
    /// Returns [`DespeckleError::Cancelled`] when cancellation was
    /// requested.
    fn check_cancelled(&self) -> Result<(), DespeckleError> {
        if self.is_cancelled() {
            Err(DespeckleError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A status token that never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancelled;

impl TaskStatus for NeverCancelled {
    #[inline]
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A shareable cancellation flag.
///
/// Clone one handle into whatever owns the work and keep another to flip
/// from a different thread.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; every clone of the flag observes it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

impl TaskStatus for CancelFlag {
    #[inline]
    fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_cancelled_always_passes() {
        assert!(NeverCancelled.check_cancelled().is_ok());
    }

    #[test]
    fn flag_cancels_every_clone() {
        let flag = CancelFlag::new();
        let handle = flag.clone();
        assert!(flag.check_cancelled().is_ok());
        handle.cancel();
        assert_eq!(flag.check_cancelled(), Err(DespeckleError::Cancelled));
    }
}
