//! Client configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use cdp_scope::ClientOptions;
//!
//! let options = ClientOptions::new()
//!     .with_command_timeout(Duration::from_secs(10))
//!     .with_max_concurrency(4);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::DEFAULT_COMMAND_TIMEOUT;
use crate::wait::WaitOptions;

// ============================================================================
// Constants
// ============================================================================

/// Default WebSocket handshake deadline.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on concurrently running client tasks.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

// ============================================================================
// ClientOptions
// ============================================================================

/// Timeouts, wait defaults and concurrency bound for a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Per-command response deadline.
    pub command_timeout: Duration,

    /// WebSocket handshake deadline.
    pub connect_timeout: Duration,

    /// Defaults for "wait for condition" operations.
    pub wait: WaitOptions,

    /// Maximum concurrently running [`crate::Client::run`] tasks.
    pub max_concurrency: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors & Builders
// ============================================================================

impl ClientOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            wait: WaitOptions::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Sets the per-command deadline.
    #[inline]
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the handshake deadline.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the wait defaults.
    #[inline]
    #[must_use]
    pub fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// Sets the concurrency bound.
    #[inline]
    #[must_use]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientOptions {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for a zero timeout, zero interval or zero
    /// concurrency.
    pub fn validate(&self) -> Result<()> {
        if self.command_timeout.is_zero() {
            return Err(Error::config("command timeout must be greater than zero"));
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::config("connect timeout must be greater than zero"));
        }
        if self.wait.timeout.is_zero() || self.wait.interval.is_zero() {
            return Err(Error::config("wait timeout and interval must be greater than zero"));
        }
        if self.max_concurrency == 0 {
            return Err(Error::config("max concurrency must be at least 1"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::new();
        assert_eq!(options.command_timeout, Duration::from_secs(30));
        assert_eq!(options.connect_timeout, Duration::from_secs(30));
        assert_eq!(options.wait, WaitOptions::default());
        assert_eq!(options.max_concurrency, 8);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let options = ClientOptions::new()
            .with_command_timeout(Duration::from_secs(5))
            .with_connect_timeout(Duration::from_secs(2))
            .with_max_concurrency(2);

        assert_eq!(options.command_timeout, Duration::from_secs(5));
        assert_eq!(options.connect_timeout, Duration::from_secs(2));
        assert_eq!(options.max_concurrency, 2);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert!(ClientOptions::new().with_max_concurrency(0).validate().is_err());
        assert!(
            ClientOptions::new()
                .with_command_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(
            ClientOptions::new()
                .with_wait(WaitOptions::default().with_interval(Duration::ZERO))
                .validate()
                .is_err()
        );
    }
}
