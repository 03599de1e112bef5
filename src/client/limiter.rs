//! Bounded concurrency for high-level tasks.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::trace;

use crate::error::{Error, Result};

// ============================================================================
// TaskLimiter
// ============================================================================

/// Caps how many tasks run at once; excess tasks queue for a permit.
#[derive(Debug, Clone)]
pub struct TaskLimiter {
    semaphore: Arc<Semaphore>,
    max: usize,
}

impl TaskLimiter {
    /// Creates a limiter allowing `max` concurrent tasks.
    #[must_use]
    pub fn new(max: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max)),
            max,
        }
    }

    /// Returns the concurrency bound.
    #[inline]
    #[must_use]
    pub fn max(&self) -> usize {
        self.max
    }

    /// Returns the number of free permits.
    #[inline]
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Runs `task` once a permit is free.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionClosed`] if the limiter was closed, or the task's
    /// own error.
    pub async fn run<T, F>(&self, task: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| Error::ConnectionClosed)?;

        trace!(available = self.available(), "Task permit acquired");
        task.await
    }

    /// Stops admitting tasks; queued and future `run` calls fail.
    pub fn close(&self) {
        self.semaphore.close();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_excess_tasks_queue_instead_of_failing() {
        let limiter = TaskLimiter::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks = (0..6).map(|i| {
            let limiter = limiter.clone();
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            tokio::spawn(async move {
                limiter
                    .run(async {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                        Ok(i)
                    })
                    .await
            })
        });

        let mut results = Vec::new();
        for task in tasks.collect::<Vec<_>>() {
            results.push(task.await.expect("join").expect("task"));
        }

        assert_eq!(results, [0, 1, 2, 3, 4, 5]);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(limiter.available(), 2);
    }

    #[test]
    fn test_permit_returns_after_task() {
        let limiter = TaskLimiter::new(1);

        let value = tokio_test::assert_ok!(tokio_test::block_on(limiter.run(async { Ok(7) })));
        assert_eq!(value, 7);
        assert_eq!(limiter.available(), 1);

        tokio_test::assert_err!(tokio_test::block_on(
            limiter.run(async { Err::<(), _>(Error::config("task failed")) })
        ));
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test]
    async fn test_closed_limiter_rejects() {
        let limiter = TaskLimiter::new(1);
        limiter.close();

        let err = limiter.run(async { Ok(()) }).await.unwrap_err();
        assert!(err.is_connection_error());
    }
}
