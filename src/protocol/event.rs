//! Event message types.
//!
//! Events are notifications sent by the browser without a correlation id.
//! Only the target lifecycle events the session router reacts to are parsed
//! into typed variants.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

use crate::identifiers::{SessionId, TargetId};

use super::types::TargetInfo;

// ============================================================================
// Event
// ============================================================================

/// An event notification from browser to client.
///
/// # Format
///
/// ```json
/// {
///   "method": "Domain.eventName",
///   "params": { ... },
///   "sessionId": "..."
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Event name in `Domain.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,

    /// Session that emitted the event (empty for top-level).
    #[serde(rename = "sessionId", default)]
    pub session_id: SessionId,
}

impl Event {
    /// Returns the domain name from the method.
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns the event name from the method.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.method.split('.').nth(1).unwrap_or_default()
    }

    /// Parses the event into a typed variant.
    #[must_use]
    pub fn parse(&self) -> ParsedEvent {
        match self.method.as_str() {
            "Target.attachedToTarget" => ParsedEvent::AttachedToTarget {
                session_id: SessionId::new(self.get_string("sessionId")),
                target_info: self
                    .params
                    .get("targetInfo")
                    .and_then(|v| serde_json::from_value(v.clone()).ok())
                    .unwrap_or_default(),
            },

            "Target.detachedFromTarget" => ParsedEvent::DetachedFromTarget {
                session_id: SessionId::new(self.get_string("sessionId")),
                target_id: self
                    .params
                    .get("targetId")
                    .and_then(|v| v.as_str())
                    .map(TargetId::new),
            },

            "Target.targetDestroyed" => ParsedEvent::TargetDestroyed {
                target_id: TargetId::new(self.get_string("targetId")),
            },

            _ => ParsedEvent::Unknown {
                method: self.method.clone(),
                params: self.params.clone(),
            },
        }
    }

    /// Gets a string from params.
    #[inline]
    fn get_string(&self, key: &str) -> String {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }
}

// ============================================================================
// ParsedEvent
// ============================================================================

/// Parsed event types for type-safe handling.
#[derive(Debug, Clone)]
pub enum ParsedEvent {
    /// A session was attached.
    AttachedToTarget {
        /// New session.
        session_id: SessionId,
        /// Target description.
        target_info: TargetInfo,
    },

    /// A session was detached.
    DetachedFromTarget {
        /// Detached session.
        session_id: SessionId,
        /// Target it belonged to, when reported.
        target_id: Option<TargetId>,
    },

    /// A target went away.
    TargetDestroyed {
        /// Destroyed target.
        target_id: TargetId,
    },

    /// Unknown event type.
    Unknown {
        /// Event method.
        method: String,
        /// Event params.
        params: Value,
    },
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_parsing() {
        let json_str = r#"{
            "method": "Target.detachedFromTarget",
            "params": { "sessionId": "S9", "targetId": "T9" }
        }"#;

        let event: Event = serde_json::from_str(json_str).expect("parse event");
        assert_eq!(event.domain(), "Target");
        assert_eq!(event.event_name(), "detachedFromTarget");
        assert!(event.session_id.is_top_level());

        match event.parse() {
            ParsedEvent::DetachedFromTarget {
                session_id,
                target_id,
            } => {
                assert_eq!(session_id.as_str(), "S9");
                assert_eq!(target_id, Some(TargetId::new("T9")));
            }
            other => panic!("unexpected parsed event type: {other:?}"),
        }
    }

    #[test]
    fn test_attached_to_target_parsing() {
        let json_str = r#"{
            "method": "Target.attachedToTarget",
            "params": {
                "sessionId": "S2",
                "targetInfo": { "targetId": "F1", "type": "iframe", "url": "https://b.test/" },
                "waitingForDebugger": false
            }
        }"#;

        let event: Event = serde_json::from_str(json_str).expect("parse event");
        match event.parse() {
            ParsedEvent::AttachedToTarget {
                session_id,
                target_info,
            } => {
                assert_eq!(session_id.as_str(), "S2");
                assert_eq!(target_info.target_id.as_str(), "F1");
                assert_eq!(target_info.target_type, "iframe");
            }
            other => panic!("unexpected parsed event type: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_event() {
        let json_str = r#"{ "method": "Page.loadEventFired", "params": { "timestamp": 1.5 } }"#;

        let event: Event = serde_json::from_str(json_str).expect("parse event");
        match event.parse() {
            ParsedEvent::Unknown { method, .. } => {
                assert_eq!(method, "Page.loadEventFired");
            }
            other => panic!("expected Unknown variant, got {other:?}"),
        }
    }
}
