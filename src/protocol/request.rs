//! Request and Response message types.
//!
//! Defines the frames for command requests and responses, plus the
//! classifier that tells responses and events apart on the way in.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{CommandId, SessionId};

use super::{Command, Event};

// ============================================================================
// Request
// ============================================================================

/// A command request from client to browser.
///
/// # Format
///
/// ```json
/// {
///   "id": 7,
///   "method": "Domain.methodName",
///   "params": { ... },
///   "sessionId": "..."
/// }
/// ```
///
/// `sessionId` is omitted for the top-level session.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Correlation id.
    pub id: CommandId,

    /// Session the command is routed to.
    #[serde(rename = "sessionId", skip_serializing_if = "SessionId::is_top_level")]
    pub session_id: SessionId,

    /// Command with method and params.
    #[serde(flatten)]
    pub command: Command,
}

impl Request {
    /// Creates a new request.
    #[inline]
    #[must_use]
    pub fn new(id: CommandId, session_id: SessionId, command: Command) -> Self {
        Self {
            id,
            session_id,
            command,
        }
    }
}

// ============================================================================
// Response
// ============================================================================

/// A response from browser to client.
///
/// # Format
///
/// Success:
/// ```json
/// { "id": 7, "result": { ... } }
/// ```
///
/// Error:
/// ```json
/// { "id": 7, "error": { "code": -32000, "message": "..." } }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Matches the request `id`.
    pub id: CommandId,

    /// Result data (if success).
    #[serde(default)]
    pub result: Option<Value>,

    /// Error payload (if error).
    #[serde(default)]
    pub error: Option<ProtocolErrorPayload>,

    /// Session echoed by the browser.
    #[serde(rename = "sessionId", default)]
    pub session_id: SessionId,
}

/// Structured error body of a failed command.
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolErrorPayload {
    /// Protocol error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional extra detail, usually a string.
    #[serde(default)]
    pub data: Option<Value>,
}

impl ProtocolErrorPayload {
    /// Returns the message with any detail appended.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.data {
            None | Some(Value::Null) => self.message.clone(),
            Some(Value::String(data)) if data.is_empty() => self.message.clone(),
            Some(Value::String(data)) => format!("{} ({data})", self.message),
            Some(data) => format!("{} ({data})", self.message),
        }
    }
}

impl Response {
    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Extracts the result value, returning error if response was error.
    ///
    /// `method` and `session_id` describe the originating command and are
    /// carried into the error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the response was an error.
    pub fn into_result(self, method: &str, session_id: SessionId) -> Result<Value> {
        match self.error {
            None => Ok(self.result.unwrap_or(Value::Null)),
            Some(payload) => Err(Error::protocol(
                payload.code,
                payload.describe(),
                method,
                session_id,
            )),
        }
    }
}

// ============================================================================
// Incoming
// ============================================================================

/// A classified inbound frame.
#[derive(Debug, Clone)]
pub enum Incoming {
    /// Reply to a command.
    Response(Response),
    /// Unsolicited notification.
    Event(Event),
}

impl Incoming {
    /// Parses a text frame.
    ///
    /// Frames carrying `id` are responses; frames carrying only `method`
    /// are events.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the text is not valid JSON
    /// - [`Error::MalformedMessage`] if the frame is neither kind, or has
    ///   an id but not the shape of a response
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;

        if let Some(id) = value.get("id") {
            let id = id.as_u64().map(CommandId::new);
            return serde_json::from_value(value)
                .map(Self::Response)
                .map_err(|e| match id {
                    Some(id) => Error::malformed(format!("unreadable response {id}: {e}")),
                    None => Error::Json(e),
                });
        }

        if value.get("method").is_some() {
            return Ok(Self::Event(serde_json::from_value(value)?));
        }

        Err(Error::malformed("frame has neither id nor method"))
    }

    /// Reads just the correlation id of a frame, if it has a numeric one.
    #[must_use]
    pub fn response_id(text: &str) -> Option<CommandId> {
        serde_json::from_str::<Value>(text)
            .ok()?
            .get("id")?
            .as_u64()
            .map(CommandId::new)
    }
}

// ============================================================================
// Tests
// ============================================================================
