//! Command definitions organized by domain.
//!
//! Commands follow `Domain.methodName` format. Only the commands the query
//! engine and its entities issue are typed; anything else goes through
//! [`RawCommand`].
//!
//! # Command Domains
//!
//! | Domain | Commands |
//! |--------|----------|
//! | `DOM` | Describe, resolve, outer HTML, geometry |
//! | `Runtime` | Evaluation, bound calls, properties, release |
//! | `Target` | Discovery, attach, detach |
//! | `Input` | Mouse dispatch |

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::identifiers::{BackendNodeId, RemoteObjectId, SessionId, TargetId};

// ============================================================================
// Command Wrapper
// ============================================================================

/// All protocol commands organized by domain.
///
/// This enum wraps domain-specific command enums for unified serialization.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Command {
    /// DOM domain commands.
    Dom(DomCommand),
    /// Runtime domain commands.
    Runtime(RuntimeCommand),
    /// Target domain commands.
    Target(TargetCommand),
    /// Input domain commands.
    Input(InputCommand),
    /// Any other method, sent verbatim.
    Raw(RawCommand),
}

impl Command {
    /// Returns the wire method name.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::Dom(cmd) => cmd.method(),
            Self::Runtime(cmd) => cmd.method(),
            Self::Target(cmd) => cmd.method(),
            Self::Input(cmd) => cmd.method(),
            Self::Raw(cmd) => &cmd.method,
        }
    }
}

impl From<DomCommand> for Command {
    fn from(cmd: DomCommand) -> Self {
        Self::Dom(cmd)
    }
}

impl From<RuntimeCommand> for Command {
    fn from(cmd: RuntimeCommand) -> Self {
        Self::Runtime(cmd)
    }
}

impl From<TargetCommand> for Command {
    fn from(cmd: TargetCommand) -> Self {
        Self::Target(cmd)
    }
}

impl From<InputCommand> for Command {
    fn from(cmd: InputCommand) -> Self {
        Self::Input(cmd)
    }
}

impl From<RawCommand> for Command {
    fn from(cmd: RawCommand) -> Self {
        Self::Raw(cmd)
    }
}

// ============================================================================
// DOM Commands
// ============================================================================

/// DOM domain commands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum DomCommand {
    /// Describe a node, piercing shadow roots and frames.
    #[serde(rename = "DOM.describeNode")]
    DescribeNode {
        /// Object handle of the node.
        #[serde(rename = "objectId", skip_serializing_if = "Option::is_none")]
        object_id: Option<RemoteObjectId>,
        /// Backend reference of the node.
        #[serde(rename = "backendNodeId", skip_serializing_if = "Option::is_none")]
        backend_node_id: Option<BackendNodeId>,
        /// Subtree depth to describe.
        depth: i32,
        /// Reveal shadow and frame content.
        pierce: bool,
    },

    /// Resolve a backend reference to an object handle.
    #[serde(rename = "DOM.resolveNode")]
    ResolveNode {
        /// Backend reference of the node.
        #[serde(rename = "backendNodeId")]
        backend_node_id: BackendNodeId,
    },

    /// Serialize a node to markup.
    #[serde(rename = "DOM.getOuterHTML")]
    GetOuterHtml {
        /// Object handle of the node.
        #[serde(rename = "objectId", skip_serializing_if = "Option::is_none")]
        object_id: Option<RemoteObjectId>,
        /// Backend reference of the node.
        #[serde(rename = "backendNodeId", skip_serializing_if = "Option::is_none")]
        backend_node_id: Option<BackendNodeId>,
    },

    /// Read the node's box model.
    #[serde(rename = "DOM.getBoxModel")]
    GetBoxModel {
        /// Object handle of the node.
        #[serde(rename = "objectId")]
        object_id: RemoteObjectId,
    },

    /// Scroll the node into view.
    #[serde(rename = "DOM.scrollIntoViewIfNeeded")]
    ScrollIntoViewIfNeeded {
        /// Object handle of the node.
        #[serde(rename = "objectId")]
        object_id: RemoteObjectId,
    },
}

impl DomCommand {
    /// Returns the wire method name.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::DescribeNode { .. } => "DOM.describeNode",
            Self::ResolveNode { .. } => "DOM.resolveNode",
            Self::GetOuterHtml { .. } => "DOM.getOuterHTML",
            Self::GetBoxModel { .. } => "DOM.getBoxModel",
            Self::ScrollIntoViewIfNeeded { .. } => "DOM.scrollIntoViewIfNeeded",
        }
    }
}

// ============================================================================
// Runtime Commands
// ============================================================================

/// Runtime domain commands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum RuntimeCommand {
    /// Evaluate an expression in the session's global scope.
    #[serde(rename = "Runtime.evaluate")]
    Evaluate {
        /// JavaScript expression.
        expression: String,
        /// Return a JSON value instead of a handle.
        #[serde(rename = "returnByValue")]
        return_by_value: bool,
        /// Await a returned promise.
        #[serde(rename = "awaitPromise")]
        await_promise: bool,
    },

    /// Call a function with `this` bound to an object handle.
    #[serde(rename = "Runtime.callFunctionOn")]
    CallFunctionOn {
        /// Function source.
        #[serde(rename = "functionDeclaration")]
        function_declaration: String,
        /// Receiver handle.
        #[serde(rename = "objectId")]
        object_id: RemoteObjectId,
        /// Positional arguments.
        #[serde(skip_serializing_if = "Vec::is_empty")]
        arguments: Vec<CallArgument>,
        /// Return a JSON value instead of a handle.
        #[serde(rename = "returnByValue")]
        return_by_value: bool,
        /// Await a returned promise.
        #[serde(rename = "awaitPromise")]
        await_promise: bool,
    },

    /// List an object's properties.
    #[serde(rename = "Runtime.getProperties")]
    GetProperties {
        /// Object handle.
        #[serde(rename = "objectId")]
        object_id: RemoteObjectId,
        /// Skip the prototype chain.
        #[serde(rename = "ownProperties")]
        own_properties: bool,
    },

    /// Release an object handle.
    #[serde(rename = "Runtime.releaseObject")]
    ReleaseObject {
        /// Object handle.
        #[serde(rename = "objectId")]
        object_id: RemoteObjectId,
    },
}

impl RuntimeCommand {
    /// Returns the wire method name.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::Evaluate { .. } => "Runtime.evaluate",
            Self::CallFunctionOn { .. } => "Runtime.callFunctionOn",
            Self::GetProperties { .. } => "Runtime.getProperties",
            Self::ReleaseObject { .. } => "Runtime.releaseObject",
        }
    }
}

/// Argument of a bound call.
#[derive(Debug, Clone, Serialize)]
pub struct CallArgument {
    /// Plain JSON value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Handle value.
    #[serde(rename = "objectId", skip_serializing_if = "Option::is_none")]
    pub object_id: Option<RemoteObjectId>,
}

impl CallArgument {
    /// Creates a plain value argument.
    #[inline]
    #[must_use]
    pub fn value(value: impl Into<Value>) -> Self {
        Self {
            value: Some(value.into()),
            object_id: None,
        }
    }

    /// Creates a handle argument.
    #[inline]
    #[must_use]
    pub fn object(object_id: RemoteObjectId) -> Self {
        Self {
            value: None,
            object_id: Some(object_id),
        }
    }
}

// ============================================================================
// Target Commands
// ============================================================================

/// Target domain commands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum TargetCommand {
    /// List known targets.
    #[serde(rename = "Target.getTargets")]
    GetTargets,

    /// Attach to a target on the shared connection.
    #[serde(rename = "Target.attachToTarget")]
    AttachToTarget {
        /// Target to attach.
        #[serde(rename = "targetId")]
        target_id: TargetId,
        /// Multiplex the session over this connection.
        flatten: bool,
    },

    /// Detach a session.
    #[serde(rename = "Target.detachFromTarget")]
    DetachFromTarget {
        /// Session to detach.
        #[serde(rename = "sessionId")]
        session_id: SessionId,
    },

    /// Toggle target discovery events.
    #[serde(rename = "Target.setDiscoverTargets")]
    SetDiscoverTargets {
        /// Enable discovery.
        discover: bool,
    },
}

impl TargetCommand {
    /// Returns the wire method name.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::GetTargets => "Target.getTargets",
            Self::AttachToTarget { .. } => "Target.attachToTarget",
            Self::DetachFromTarget { .. } => "Target.detachFromTarget",
            Self::SetDiscoverTargets { .. } => "Target.setDiscoverTargets",
        }
    }
}

// ============================================================================
// Input Commands
// ============================================================================

/// Input domain commands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum InputCommand {
    /// Dispatch a mouse event at viewport coordinates.
    #[serde(rename = "Input.dispatchMouseEvent")]
    DispatchMouseEvent {
        /// Event type.
        #[serde(rename = "type")]
        event_type: MouseEventType,
        /// X coordinate (CSS pixels).
        x: f64,
        /// Y coordinate (CSS pixels).
        y: f64,
        /// Mouse button.
        button: MouseButton,
        /// Click count.
        #[serde(rename = "clickCount")]
        click_count: u32,
    },
}

impl InputCommand {
    /// Returns the wire method name.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::DispatchMouseEvent { .. } => "Input.dispatchMouseEvent",
        }
    }
}

/// Mouse event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MouseEventType {
    /// Pointer moved.
    MouseMoved,
    /// Button pressed.
    MousePressed,
    /// Button released.
    MouseReleased,
}

/// Mouse buttons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    /// No button.
    None,
    /// Primary button.
    #[default]
    Left,
    /// Auxiliary button.
    Middle,
    /// Secondary button.
    Right,
}

// ============================================================================
// RawCommand
// ============================================================================

/// Untyped command for methods without a typed variant.
#[derive(Debug, Clone, Serialize)]
pub struct RawCommand {
    /// Method name.
    pub method: String,
    /// Parameters object.
    pub params: Value,
}

impl RawCommand {
    /// Creates a raw command.
    #[inline]
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
