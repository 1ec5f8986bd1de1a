//! Timer service backed by the tokio runtime.
//!
//! Each scheduled task is a spawned sleep-then-run future; cancelling aborts
//! it. No thread is created per timer.

use futures::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::ports::{TimerHandle, TimerService};

/// `TimerService` running tasks on the current tokio runtime.
///
/// Must be used from within a runtime, like `tokio::spawn`.
#[derive(Debug, Clone, Default)]
pub struct TokioTimerService {
    active: Arc<AtomicUsize>,
}

impl TokioTimerService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of timers scheduled and neither fired nor cancelled.
    pub fn active_timers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Decrements the active count however the task ends.
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TimerService for TokioTimerService {
    fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) -> TimerHandle {
        self.active.fetch_add(1, Ordering::SeqCst);
        let guard = ActiveGuard(self.active.clone());

        let handle = tokio::spawn(async move {
            let guard = guard;
            tokio::time::sleep(delay).await;
            // Fired: no longer pending, even while the task itself runs.
            drop(guard);
            task.await;
        });

        TimerHandle::new(move || handle.abort())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::AtomicBool;

    fn flag_task(flag: Arc<AtomicBool>) -> BoxFuture<'static, ()> {
        async move { flag.store(true, Ordering::SeqCst) }.boxed()
    }

    #[tokio::test]
    async fn task_runs_after_delay() {
        let timers = TokioTimerService::new();
        let fired = Arc::new(AtomicBool::new(false));

        let _handle = timers.schedule(Duration::from_millis(20), flag_task(fired.clone()));

        assert!(!fired.load(Ordering::SeqCst));
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert_eq!(timers.active_timers(), 0);
    }

    #[tokio::test]
    async fn cancelled_task_never_runs() {
        let timers = TokioTimerService::new();
        let fired = Arc::new(AtomicBool::new(false));

        let handle = timers.schedule(Duration::from_millis(20), flag_task(fired.clone()));
        assert_eq!(timers.active_timers(), 1);
        handle.cancel();

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!fired.load(Ordering::SeqCst));
        assert_eq!(timers.active_timers(), 0);
    }

    #[tokio::test]
    async fn clones_share_the_active_count() {
        let timers = TokioTimerService::new();
        let clone = timers.clone();

        let handle = clone.schedule(Duration::from_secs(60), async {}.boxed());

        assert_eq!(timers.active_timers(), 1);
        handle.cancel();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(timers.active_timers(), 0);
    }
}
