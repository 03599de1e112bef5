//! Deadline-bounded polling.
//!
//! Every "wait for condition" operation takes a [`WaitOptions`] with an
//! explicit deadline and a fixed polling interval. Exceeding the deadline
//! yields [`Error::Timeout`], never an empty success.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::trace;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default wait deadline.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

// ============================================================================
// WaitOptions
// ============================================================================

/// Deadline and interval for a polling wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Total time allowed.
    pub timeout: Duration,
    /// Delay between probes.
    pub interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_WAIT_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl WaitOptions {
    /// Creates options with the default interval.
    #[inline]
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Sets the deadline.
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the polling interval.
    #[inline]
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Returns the deadline in milliseconds.
    #[inline]
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

// ============================================================================
// Polling
// ============================================================================

/// Polls `probe` until it yields `Some`, an error, or the deadline passes.
///
/// The probe runs at least once. Errors from the probe end the wait
/// immediately.
///
/// # Errors
///
/// - [`Error::Timeout`] naming `operation` if the deadline passes
/// - Any error returned by the probe
pub async fn poll_until<T, F, Fut>(operation: &str, options: WaitOptions, mut probe: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = Instant::now() + options.timeout;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        if let Some(value) = probe().await? {
            return Ok(value);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(Error::timeout(operation, options.timeout_ms()));
        }

        trace!(operation, attempt, "Condition not met, polling again");
        sleep(options.interval.min(deadline - now)).await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_defaults() {
        let options = WaitOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(10));
        assert_eq!(options.interval, Duration::from_millis(250));
        assert_eq!(options.timeout_ms(), 10_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_returns_when_ready() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let value = poll_until("ready", WaitOptions::default(), move || {
            let counter = Arc::clone(&counter);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok((n == 3).then_some(n))
            }
        })
        .await
        .expect("poll");

        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_times_out() {
        let options = WaitOptions::new(Duration::from_secs(1)).with_interval(Duration::from_millis(100));
        let err = poll_until::<(), _, _>("never", options, || async { Ok(None) })
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(err.to_string().contains("never"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_propagates_probe_error() {
        let err = poll_until::<(), _, _>("broken", WaitOptions::default(), || async {
            Err(Error::script("boom"))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Script { .. }));
    }
}
