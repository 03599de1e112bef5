//! Type-safe identifiers for protocol entities.
//!
//! Newtype wrappers keep the many string- and integer-shaped identifiers of
//! the protocol from being mixed up at compile time.
//!
//! | Type | Wire shape | Meaning |
//! |------|------------|---------|
//! | [`CommandId`] | integer | Correlation id of one command |
//! | [`SessionId`] | string | Flattened session (empty = top-level) |
//! | [`TargetId`] | string | Browser target (tab, out-of-process frame) |
//! | [`FrameId`] | string | Frame in a frame tree |
//! | [`BackendNodeId`] | integer | Stable backend DOM node reference |
//! | [`RemoteObjectId`] | string | Short-lived script object handle |
//! | [`SubscriptionId`] | integer | Local event subscription |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// ============================================================================
// CommandId
// ============================================================================

/// Correlation id attached to every outgoing command.
///
/// Ids are strictly increasing per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(u64);

impl CommandId {
    /// Wraps a raw id.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// SessionId
// ============================================================================

/// Flattened session identifier.
///
/// The empty id addresses the connection's own (top-level) session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps a session id string.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the top-level session id (empty).
    #[inline]
    #[must_use]
    pub const fn top_level() -> Self {
        Self(String::new())
    }

    /// Returns `true` for the top-level session.
    #[inline]
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<top-level>")
        } else {
            f.write_str(&self.0)
        }
    }
}

// ============================================================================
// TargetId / FrameId / RemoteObjectId
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw id.
            #[inline]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the raw id.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id! {
    /// Browser target identifier.
    ///
    /// Out-of-process frames use their frame id as target id.
    TargetId
}

string_id! {
    /// Frame identifier within a page's frame tree.
    FrameId
}

string_id! {
    /// Handle to a script object living in one execution context.
    ///
    /// Not interchangeable across sessions; invalid once its context dies.
    RemoteObjectId
}

impl From<&FrameId> for TargetId {
    fn from(frame_id: &FrameId) -> Self {
        Self(frame_id.0.clone())
    }
}

// ============================================================================
// BackendNodeId
// ============================================================================

/// Stable reference to a node in the browser's internal DOM tree.
///
/// Valid without the DOM tracking domain being enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendNodeId(i64);

impl BackendNodeId {
    /// Wraps a raw backend node id.
    #[inline]
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for BackendNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// SubscriptionId
// ============================================================================

/// Global counter for subscription IDs.
static SUBSCRIPTION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifies one local event subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Allocates the next subscription id.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(SUBSCRIPTION_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// NodeRef
// ============================================================================

/// Either kind of node reference a command can be keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeRef {
    /// Stable backend reference.
    Backend(BackendNodeId),
    /// Short-lived object handle.
    Object(RemoteObjectId),
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(id) => write!(f, "backendNodeId={id}"),
            Self::Object(id) => write!(f, "objectId={id}"),
        }
    }
}

impl From<BackendNodeId> for NodeRef {
    fn from(id: BackendNodeId) -> Self {
        Self::Backend(id)
    }
}

impl From<RemoteObjectId> for NodeRef {
    fn from(id: RemoteObjectId) -> Self {
        Self::Object(id)
    }
}

// ============================================================================
// Tests
// ============================================================================
