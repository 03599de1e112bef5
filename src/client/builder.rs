//! Builder pattern for client configuration.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use cdp_scope::Client;
//!
//! # async fn example() -> cdp_scope::Result<()> {
//! let client = Client::builder()
//!     .endpoint("ws://127.0.0.1:9222/devtools/page/ABC")
//!     .command_timeout(Duration::from_secs(10))
//!     .max_concurrency(4)
//!     .connect()
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport;
use crate::wait::WaitOptions;

use super::core::Client;
use super::options::ClientOptions;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for a [`Client`].
///
/// Use [`Client::builder()`] to create one.
#[derive(Debug, Default, Clone)]
pub struct ClientBuilder {
    /// WebSocket endpoint.
    endpoint: Option<String>,
    /// Accumulated options.
    options: ClientOptions,
}

impl ClientBuilder {
    /// Creates a builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the remote-debugging WebSocket URL.
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    /// Replaces all options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the per-command deadline.
    #[inline]
    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.options.command_timeout = timeout;
        self
    }

    /// Sets the handshake deadline.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Sets the wait defaults.
    #[inline]
    #[must_use]
    pub fn wait(mut self, wait: WaitOptions) -> Self {
        self.options.wait = wait;
        self
    }

    /// Sets the concurrency bound for [`Client::run`].
    #[inline]
    #[must_use]
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.options.max_concurrency = max;
        self
    }

    /// Validates the configuration and connects.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the endpoint is missing or invalid, or an
    ///   option is out of range
    /// - [`Error::ConnectionTimeout`] if the handshake exceeds its deadline
    /// - [`Error::WebSocket`] if the handshake fails
    pub async fn connect(self) -> Result<Client> {
        let endpoint = self.validate()?;
        let connection = transport::connect(
            &endpoint,
            self.options.connect_timeout,
            self.options.command_timeout,
        )
        .await?;

        Ok(Client::from_connection(connection, self.options))
    }

    /// Checks options and returns the endpoint.
    fn validate(&self) -> Result<String> {
        self.options.validate()?;

        let endpoint = self.endpoint.clone().ok_or_else(|| {
            Error::config(
                "endpoint is required. Use .endpoint() to set it.\n\
                 Example: Client::builder().endpoint(\"ws://127.0.0.1:9222/devtools/browser/ID\")",
            )
        })?;
        transport::parse_endpoint(&endpoint)?;
        Ok(endpoint)
    }
}

// ============================================================================
// Tests
// ============================================================================
