//! cdp-scope - Scoped DOM queries over the Chrome DevTools Protocol.
//!
//! This library drives a running Chromium-family browser over its
//! remote-debugging WebSocket and exposes a hierarchical query API that
//! crosses closed shadow roots, same-process iframes and out-of-process
//! iframes.
//!
//! # Architecture
//!
//! - **Connection**: one WebSocket; commands are correlated by id and
//!   tagged with a session id, events are fanned out by method
//! - **Session router**: maps targets to flattened sessions on that socket
//! - **Routing context**: the (session, router) pair every entity carries;
//!   entities found in a scope inherit it, out-of-process frames replace it
//! - **Scope**: document, node or shadow root; one query engine serves all
//!
//! # Quick Start
//!
//! ```no_run
//! use cdp_scope::{By, Client, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::builder()
//!         .endpoint("ws://127.0.0.1:9222/devtools/page/ABC")
//!         .connect()
//!         .await?;
//!
//!     let page = client.page();
//!
//!     // Through a closed shadow root
//!     let host = page.find("#checkout").await?;
//!     let button = host.shadow_root().await?.find(".pay").await?;
//!     button.click().await?;
//!
//!     // Through an out-of-process frame in one selector
//!     let field = page.find(By::css("iframe#card input[name='number']")).await?;
//!     println!("{}", field.outer_html().await?);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Client`] facade and configuration |
//! | [`dom`] | Scopes, query engine, [`Element`], [`ShadowRoot`], [`Page`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire frames and typed commands |
//! | [`session`] | Session router and routing context |
//! | [`transport`] | WebSocket connection and event streams |
//! | [`wait`] | Deadline-bounded polling |

// ============================================================================
// Modules
// ============================================================================

/// Client bootstrap.
///
/// Use [`Client::builder()`] to connect.
pub mod client;

/// Scoped DOM queries.
pub mod dom;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for protocol entities.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Wire protocol message types.
pub mod protocol;

/// Session routing.
pub mod session;

/// WebSocket transport layer.
pub mod transport;

/// Deadline-bounded polling.
pub mod wait;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientBuilder, ClientOptions, TaskLimiter};

// DOM types
pub use dom::{By, Dialect, Element, Page, Scope, ScopeKind, ShadowRoot};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{
    BackendNodeId, CommandId, FrameId, NodeRef, RemoteObjectId, SessionId, SubscriptionId,
    TargetId,
};

// Protocol types
pub use protocol::{Event, MouseButton, ParsedEvent, ShadowRootMode};

// Session types
pub use session::{RoutingContext, Session, SessionRouter};

// Transport types
pub use transport::{Connection, EventStream};

// Wait types
pub use wait::WaitOptions;
