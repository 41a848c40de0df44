//! Run-scoped cancellation

use crate::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Exit status after an operator interrupt (128 + SIGINT)
pub const EXIT_INTERRUPTED: u8 = 130;

/// Cancellation token shared by every task of one run
///
/// Cancelling is idempotent and can be done from any thread, including a
/// signal handler that is not running on the async runtime.
#[derive(Debug, Clone)]
pub struct CancelToken {
    state: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    /// Cancel the run
    pub fn cancel(&self) {
        self.state.send_replace(true);
    }

    /// Check whether the run was cancelled
    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolve once the run is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Cancel the run on SIGINT, SIGTERM or SIGHUP
    ///
    /// The first signal cancels, letting the output close cleanly; a second
    /// one exits the process with [`EXIT_INTERRUPTED`]. The returned flag is
    /// set once a signal was received. Can be installed once per process.
    pub fn cancel_on_signal(&self) -> Result<Arc<AtomicBool>> {
        let interrupted = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&interrupted);
        let cancel = self.clone();

        ctrlc::set_handler(move || {
            if flag.swap(true, Ordering::SeqCst) {
                eprintln!("\nSecond interrupt received, exiting");
                std::process::exit(i32::from(EXIT_INTERRUPTED));
            }
            eprintln!("\nInterrupt received, shutting down...");
            cancel.cancel();
        })?;

        Ok(interrupted)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
