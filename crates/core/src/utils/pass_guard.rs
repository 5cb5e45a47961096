//! In-progress guard for run-to-completion passes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// RAII guard that clears the shared in-progress flag when dropped.
///
/// A pass acquires the guard on entry; a second caller that finds the flag
/// already set gets `None` and returns without doing any work.
#[derive(Debug)]
pub struct PassGuard {
    flag: Arc<AtomicBool>,
}

impl PassGuard {
    pub fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused_until_drop() {
        let flag = Arc::new(AtomicBool::new(false));

        let guard = PassGuard::try_acquire(&flag);
        assert!(guard.is_some());
        assert!(PassGuard::try_acquire(&flag).is_none());

        drop(guard);
        assert!(!flag.load(Ordering::SeqCst));
        assert!(PassGuard::try_acquire(&flag).is_some());
    }
}
