use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable cancellation flag for multi-page drains.
///
/// The pager checks the flag before issuing each page request, never
/// mid-request. Cloning is cheap; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.inner.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_starts_clear_and_latches_once_cancelled() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());

        flag.cancel();
        assert!(flag.is_cancelled());
        // Cancelling again is a no-op.
        flag.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn clones_share_the_same_flag() {
        let flag = CancelFlag::new();
        let clone = flag.clone();

        clone.cancel();
        assert!(flag.is_cancelled());
    }
}
