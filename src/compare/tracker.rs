//! Outstanding-task tracking for the recursive fan-out
//!
//! Every comparison task is spawned through a [`TaskTracker`]. The counter is
//! incremented before `spawn` returns, so a parent that registers its
//! children and then finishes can never let the count touch zero early.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Counts spawned tasks that have not finished yet
#[derive(Debug, Default)]
pub struct TaskTracker {
    outstanding: AtomicUsize,
    drained: Notify,
}

/// Decrements the tracker when the task ends, including on panic
struct TaskGuard {
    tracker: Arc<TaskTracker>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if self.tracker.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.tracker.drained.notify_waiters();
        }
    }
}

impl TaskTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Spawn `task` on the runtime and track it until it completes
    pub fn spawn<F>(self: &Arc<Self>, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        let guard = TaskGuard {
            tracker: Arc::clone(self),
        };

        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
    }

    /// Number of tasks spawned and not yet finished
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Wait until no tracked task remains
    pub async fn wait(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            // Register before checking so a wakeup between the two is not lost
            notified.as_mut().enable();

            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }
}
