//! WebSocket transport layer.
//!
//! This module carries every session over one WebSocket to the browser.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                          ┌──────────────────┐
//! │  Client (Rust)   │                          │  Browser         │
//! │                  │        WebSocket         │                  │
//! │  Connection  ────┼─────────────────────────►│  /devtools/...   │
//! │  (event loop)    │◄─────────────────────────┤  sessions A, B.. │
//! └──────────────────┘                          └──────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `connect` - Handshake with the endpoint
//! 2. `Connection::send` - Commands tagged with id and session
//! 3. `Connection::subscribe` - Event streams by method
//! 4. `Connection::shutdown` - Close; pending commands fail
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Multiplexer, correlator and event loop |
//! | `endpoint` | Endpoint validation and handshake |
//! | `subscription` | Event subscription registry |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// Endpoint validation and handshake.
pub mod endpoint;

/// Event subscriptions.
pub mod subscription;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, DEFAULT_COMMAND_TIMEOUT};
pub use endpoint::{connect, parse_endpoint};
pub use subscription::EventStream;
