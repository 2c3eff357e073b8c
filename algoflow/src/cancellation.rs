//! Run-level cancellation.
//!
//! A single token is shared by every in-flight algorithm pipeline; each
//! pipeline checks it between stages and transitions to its `Cancelled`
//! terminal state without invoking publish or notify.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Token for coordinating cancellation across pipelines.
pub struct CancelToken {
    cancelled: AtomicBool,
    reason: Mutex<Option<String>>,
}

impl CancelToken {
    /// Creates a new shared token.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            cancelled: AtomicBool::new(false),
            reason: Mutex::new(None),
        })
    }

    /// Returns true if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Requests cancellation with a reason.
    ///
    /// Idempotent; only the first reason is stored.
    pub fn cancel(&self, reason: impl Into<String>) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            *self.reason.lock() = Some(reason.into());
        }
    }

    /// Returns the cancellation reason if cancelled.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.lock().clone()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_uncancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.reason().is_none());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let token = CancelToken::new();
        token.cancel("operator abort");
        token.cancel("second reason");

        assert!(token.is_cancelled());
        assert_eq!(token.reason(), Some("operator abort".to_string()));
    }
}
