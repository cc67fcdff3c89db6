//! Cooperative cancellation.
//!
//! A single `AtomicBool` flag, checked at feature boundaries and inside the
//! R-tree candidate loop every `N` candidates. Cheap to clone and share
//! across the `rayon` fan-outs in C5/C6 without needing a `Mutex`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How often the spatial-index candidate loop re-checks cancellation.
pub const CANDIDATE_CHECK_INTERVAL: usize = 256;

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncancelled_and_latches_once_cancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn clones_share_the_same_flag() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
