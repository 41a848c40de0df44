//! Admission control for remote calls
//!
//! Each bucket gets a counting gate of N permits; one permit is held for
//! the duration of exactly one remote call. When both sides of a
//! comparison use the same bucket they share one gate, so that bucket
//! never sees more than N concurrent calls from this run.

use super::cancel::CancelToken;
use crate::error::{SubtreeError, SubtreeResult};
use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};

/// Bounded gate for concurrent remote calls against one bucket
#[derive(Debug)]
pub struct AdmissionController {
    /// Permits available for calls
    semaphore: Semaphore,
    /// Configured capacity
    capacity: usize,
}

/// Right to make one remote call; released on drop
#[derive(Debug)]
pub struct AdmissionPermit<'a> {
    _permit: SemaphorePermit<'a>,
}

impl AdmissionController {
    /// Create a controller allowing `capacity` concurrent calls
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Semaphore::new(capacity),
            capacity,
        }
    }

    /// Create the controllers for the two sides of a comparison
    ///
    /// Returns the same controller twice when both buckets are the same.
    pub fn for_pair(
        first_bucket: &str,
        second_bucket: &str,
        capacity: usize,
    ) -> (Arc<AdmissionController>, Arc<AdmissionController>) {
        let first = Arc::new(Self::new(capacity));
        let second = if first_bucket == second_bucket {
            Arc::clone(&first)
        } else {
            Arc::new(Self::new(capacity))
        };
        (first, second)
    }

    /// Get the configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the number of permits currently available
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a permit, or fail with `Cancelled` if the run is cancelled first
    pub async fn acquire(&self, cancel: &CancelToken) -> SubtreeResult<AdmissionPermit<'_>> {
        if cancel.is_cancelled() {
            return Err(SubtreeError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SubtreeError::Cancelled),
            permit = self.semaphore.acquire() => permit
                .map(|p| AdmissionPermit { _permit: p })
                .map_err(|_| SubtreeError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_same_bucket_shares_controller() {
        let (a, b) = AdmissionController::for_pair("bucket", "bucket", 5);
        assert!(Arc::ptr_eq(&a, &b));

        let (a, b) = AdmissionController::for_pair("bucket", "other", 5);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.capacity(), 5);
        assert_eq!(b.capacity(), 5);
    }

    #[tokio::test]
    async fn test_permit_released_on_drop() {
        let controller = AdmissionController::new(2);
        let cancel = CancelToken::new();

        let p1 = controller.acquire(&cancel).await.unwrap();
        let _p2 = controller.acquire(&cancel).await.unwrap();
        assert_eq!(controller.available(), 0);

        drop(p1);
        assert_eq!(controller.available(), 1);
    }

    #[tokio::test]
    async fn test_acquire_waits_for_release() {
        let controller = Arc::new(AdmissionController::new(1));
        let cancel = CancelToken::new();
        let held = controller.acquire(&cancel).await.unwrap();

        let waiter = {
            let controller = Arc::clone(&controller);
            let cancel = cancel.clone();
            tokio::spawn(async move { controller.acquire(&cancel).await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(held);
        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_acquire_fails_on_cancel() {
        let controller = Arc::new(AdmissionController::new(1));
        let cancel = CancelToken::new();
        let _held = controller.acquire(&cancel).await.unwrap();

        let waiter = {
            let controller = Arc::clone(&controller);
            let cancel = cancel.clone();
            tokio::spawn(async move { controller.acquire(&cancel).await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        assert_eq!(waiter.await.unwrap(), Err(SubtreeError::Cancelled));
    }

    #[tokio::test]
    async fn test_acquire_after_cancel_fails_fast() {
        let controller = AdmissionController::new(3);
        let cancel = CancelToken::new();
        cancel.cancel();

        assert!(controller.acquire(&cancel).await.is_err());
        assert_eq!(controller.available(), 3);
    }
}
