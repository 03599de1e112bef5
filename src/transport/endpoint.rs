//! Remote-debugging endpoint connection.
//!
//! # Connection Flow
//!
//! 1. Validate the endpoint URL (`ws://` or `wss://`)
//! 2. Perform the WebSocket handshake within the connect deadline
//! 3. Hand the socket to a [`Connection`] event loop

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};

use super::Connection;

// ============================================================================
// Endpoint
// ============================================================================

/// Parses and validates a WebSocket endpoint URL.
///
/// # Errors
///
/// Returns [`Error::Config`] for empty, unparsable or non-WebSocket URLs.
pub fn parse_endpoint(endpoint: &str) -> Result<Url> {
    if endpoint.trim().is_empty() {
        return Err(Error::config("endpoint URL is empty"));
    }

    let url = Url::parse(endpoint)
        .map_err(|e| Error::config(format!("invalid endpoint URL {endpoint}: {e}")))?;

    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(Error::config(format!(
            "endpoint must use ws or wss, got {other}"
        ))),
    }
}

/// Connects to a browser's remote-debugging WebSocket.
///
/// # Errors
///
/// - [`Error::Config`] if the URL is invalid
/// - [`Error::ConnectionTimeout`] if the handshake exceeds `connect_timeout`
/// - [`Error::WebSocket`] if the handshake fails
pub async fn connect(
    endpoint: &str,
    connect_timeout: Duration,
    command_timeout: Duration,
) -> Result<Connection> {
    let url = parse_endpoint(endpoint)?;

    debug!(%url, "Connecting to endpoint");

    let (ws_stream, response) = timeout(connect_timeout, connect_async(url.as_str()))
        .await
        .map_err(|_| Error::connection_timeout(connect_timeout.as_millis() as u64))??;

    info!(%url, status = %response.status(), "WebSocket connected");

    Ok(Connection::new(ws_stream, command_timeout))
}

// ============================================================================
// Tests
// ============================================================================
