//! Error types for the protocol client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use cdp_scope::{By, Error, Result};
//!
//! async fn example(host: &Element) -> Result<()> {
//!     let root = host.shadow_root().await?;
//!     match root.find(By::css(".item")).await {
//!         Err(e) if e.is_stale() => { /* re-resolve from a fresh lookup */ }
//!         other => { other?.click().await?; }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Transport | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`], [`Error::MalformedMessage`] |
//! | DOM | [`Error::StaleReference`], [`Error::Capability`], [`Error::ElementNotFound`], [`Error::ShadowRootNotFound`], [`Error::FrameNotFound`] |
//! | Execution | [`Error::Script`], [`Error::Timeout`], [`Error::RequestTimeout`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::{CommandId, FrameId, NodeRef, SessionId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Constants
// ============================================================================

/// Protocol error code for an unknown or detached session.
pub const SESSION_NOT_FOUND_CODE: i64 = -32001;

/// Browser messages that mean a node, object or context no longer exists.
const STALE_MESSAGES: &[&str] = &[
    "Could not find node with given id",
    "No node with given id found",
    "Could not find object with given id",
    "Cannot find context with specified id",
    "Node with given id does not belong to the document",
    "No node found for given backend id",
    "Node is detached from document",
    "Inspected target navigated or closed",
];

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant names the identifier (session, node reference, frame)
/// implicated in the failure.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// WebSocket handshake did not finish in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Transport closed before the response arrived.
    ///
    /// Every pending command resolves with this when the connection drops.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Structured error payload returned by the browser.
    #[error("Protocol error {code} in {method} (session {session_id}): {message}")]
    Protocol {
        /// Protocol error code.
        code: i64,
        /// Protocol error message.
        message: String,
        /// Method of the failed command.
        method: String,
        /// Session the command was routed to.
        session_id: SessionId,
    },

    /// Incoming frame was neither a response nor an event.
    #[error("Malformed message: {message}")]
    MalformedMessage {
        /// Description of the problem.
        message: String,
    },

    // ========================================================================
    // DOM Errors
    // ========================================================================
    /// Node reference or object handle is no longer valid.
    ///
    /// Callers should re-resolve from a fresh lookup instead of retrying.
    #[error("Stale reference {reference} in session {session_id}: {message}")]
    StaleReference {
        /// The reference that went stale.
        reference: NodeRef,
        /// Session the reference belonged to.
        session_id: SessionId,
        /// Browser message.
        message: String,
    },

    /// Selector dialect not supported by the scope.
    ///
    /// Raised locally; nothing is sent to the browser.
    #[error("{dialect} selectors are not supported by {scope} scopes")]
    Capability {
        /// Rejected dialect.
        dialect: &'static str,
        /// Scope kind that rejected it.
        scope: &'static str,
    },

    /// Selector matched nothing.
    #[error("Element not found: selector={selector}, session={session_id}")]
    ElementNotFound {
        /// Selector expression used.
        selector: String,
        /// Session where the search ran.
        session_id: SessionId,
    },

    /// Host carries no usable shadow root.
    #[error("Shadow root not found on {reference}")]
    ShadowRootNotFound {
        /// The host node.
        reference: NodeRef,
    },

    /// Frame content could not be reached.
    #[error(
        "Frame not found for {reference} (frame {})",
        .frame_id.as_ref().map_or("-", FrameId::as_str)
    )]
    FrameNotFound {
        /// The frame owner element.
        reference: NodeRef,
        /// The frame id it reported, if any.
        frame_id: Option<FrameId>,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// JavaScript exception during evaluation.
    #[error("Script error: {message}")]
    Script {
        /// Exception description.
        message: String,
    },

    /// Polling deadline exceeded.
    ///
    /// Distinct from [`Error::ElementNotFound`]: the condition may still
    /// become true later.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// No response to a command within its deadline.
    #[error("Command {command_id} ({method}) timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The command that timed out.
        command_id: CommandId,
        /// Its method.
        method: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(
        code: i64,
        message: impl Into<String>,
        method: impl Into<String>,
        session_id: SessionId,
    ) -> Self {
        Self::Protocol {
            code,
            message: message.into(),
            method: method.into(),
            session_id,
        }
    }

    /// Creates a malformed message error.
    #[inline]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedMessage {
            message: message.into(),
        }
    }

    /// Creates a stale reference error.
    #[inline]
    pub fn stale(reference: NodeRef, session_id: SessionId, message: impl Into<String>) -> Self {
        Self::StaleReference {
            reference,
            session_id,
            message: message.into(),
        }
    }

    /// Creates a capability error.
    #[inline]
    pub fn capability(dialect: &'static str, scope: &'static str) -> Self {
        Self::Capability { dialect, scope }
    }

    /// Creates an element not found error.
    #[inline]
    pub fn element_not_found(selector: impl Into<String>, session_id: SessionId) -> Self {
        Self::ElementNotFound {
            selector: selector.into(),
            session_id,
        }
    }

    /// Creates a shadow root not found error.
    #[inline]
    pub fn shadow_root_not_found(reference: NodeRef) -> Self {
        Self::ShadowRootNotFound { reference }
    }

    /// Creates a frame not found error.
    #[inline]
    pub fn frame_not_found(reference: NodeRef, frame_id: Option<FrameId>) -> Self {
        Self::FrameNotFound {
            reference,
            frame_id,
        }
    }

    /// Creates a script error.
    #[inline]
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(command_id: CommandId, method: impl Into<String>, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            command_id,
            method: method.into(),
            timeout_ms,
        }
    }
}

// ============================================================================
// Stale Classification
// ============================================================================

impl Error {
    /// Converts a stale-class protocol error into [`Error::StaleReference`].
    ///
    /// Any other error is returned unchanged.
    #[must_use]
    pub fn into_stale(self, reference: &NodeRef) -> Self {
        match self {
            Self::Protocol {
                message,
                session_id,
                ..
            } if is_stale_message(&message) => Self::stale(reference.clone(), session_id, message),
            other => other,
        }
    }
}

/// Returns `true` if a browser error message means the referent is gone.
#[must_use]
pub fn is_stale_message(message: &str) -> bool {
    STALE_MESSAGES.iter().any(|m| message.contains(m))
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::Timeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is a stale reference error.
    #[inline]
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleReference { .. })
    }

    /// Returns `true` if the browser rejected the command's session.
    #[inline]
    #[must_use]
    pub fn is_session_not_found(&self) -> bool {
        matches!(
            self,
            Self::Protocol { code, message, .. }
                if *code == SESSION_NOT_FOUND_CODE || message.contains("Session with given id not found")
        )
    }

    /// Returns `true` if an element, shadow root or frame was not found.
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. } | Self::ShadowRootNotFound { .. } | Self::FrameNotFound { .. }
        )
    }

    /// Returns `true` if this is a capability error.
    #[inline]
    #[must_use]
    pub fn is_capability(&self) -> bool {
        matches!(self, Self::Capability { .. })
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry or re-resolution.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. }
                | Self::Timeout { .. }
                | Self::RequestTimeout { .. }
                | Self::StaleReference { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
