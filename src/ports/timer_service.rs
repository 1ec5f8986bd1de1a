//! TimerService port - Shared scheduler for phase timeouts.
//!
//! Conversations do not own timer threads. They hand a task to the shared
//! service and keep the returned handle so the task can be cancelled when
//! the phase ends first.

use futures::future::BoxFuture;
use std::fmt;
use std::time::Duration;

/// Cancellation handle for a scheduled task.
///
/// Dropping the handle does NOT cancel the task; call `cancel`.
pub struct TimerHandle {
    cancel: Box<dyn FnOnce() + Send + Sync>,
}

impl TimerHandle {
    /// Creates a handle that runs `cancel` when cancelled.
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Box::new(cancel),
        }
    }

    /// Cancels the task if it has not run yet.
    pub fn cancel(self) {
        (self.cancel)();
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle").finish_non_exhaustive()
    }
}

/// Port for scheduling delayed tasks.
pub trait TimerService: Send + Sync {
    /// Run `task` once after `delay`, unless cancelled first.
    fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) -> TimerHandle;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn TimerService) {}

    #[test]
    fn cancel_runs_the_cancellation_once() {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let handle = TimerHandle::new(move || flag.store(true, Ordering::SeqCst));

        handle.cancel();

        assert!(cancelled.load(Ordering::SeqCst));
    }

    #[test]
    fn dropping_does_not_cancel() {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        drop(TimerHandle::new(move || flag.store(true, Ordering::SeqCst)));

        assert!(!cancelled.load(Ordering::SeqCst));
    }
}
