//! Wire protocol message types.
//!
//! This module defines the JSON frames exchanged with the browser's
//! remote-debugging endpoint.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Shape |
//! |--------------|-----------|-------|
//! | `Request` | Client → Browser | `{id, method, params, sessionId?}` |
//! | `Response` | Browser → Client | `{id, result}` or `{id, error: {code, message}}` |
//! | `Event` | Browser → Client | `{method, params, sessionId?}` |
//!
//! # Command Naming
//!
//! Commands follow `Domain.methodName` format:
//!
//! - `DOM.describeNode`
//! - `Runtime.callFunctionOn`
//! - `Target.attachToTarget`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Command definitions by domain |
//! | `event` | Event types |
//! | `request` | Request, Response and the incoming frame classifier |
//! | `types` | Typed result payloads |

// ============================================================================
// Submodules
// ============================================================================

/// Command definitions organized by domain.
pub mod command;

/// Event message types.
pub mod event;

/// Request and Response message types.
pub mod request;

/// Typed result payloads.
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{
    CallArgument, Command, DomCommand, InputCommand, MouseButton, MouseEventType, RawCommand,
    RuntimeCommand, TargetCommand,
};
pub use event::{Event, ParsedEvent};
pub use request::{Incoming, ProtocolErrorPayload, Request, Response};
pub use types::{
    AttachResult, BoxModel, BoxModelResult, DescribeNodeResult, EvaluateResult,
    ExceptionDetails, Node, OuterHtmlResult, PropertiesResult, PropertyDescriptor, Quad, Rect,
    RemoteObject, ResolveNodeResult, ShadowRootMode, TargetInfo, TargetInfosResult,
};
