//! Client bootstrap.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | Connection, session router and task limiter |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`ClientOptions`] | Timeouts, wait defaults, concurrency bound |
//! | [`TaskLimiter`] | Semaphore-backed task bound |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for client configuration.
pub mod builder;

/// Core client implementation.
pub mod core;

/// Bounded task concurrency.
pub mod limiter;

/// Client options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use core::Client;
pub use limiter::TaskLimiter;
pub use options::ClientOptions;
