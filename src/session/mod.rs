//! Session routing.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `router` | Target attach/detach and session bookkeeping |
//! | `context` | Routing context inherited by entities |

// ============================================================================
// Submodules
// ============================================================================

/// Routing context.
pub mod context;

/// Session router.
pub mod router;

// ============================================================================
// Re-exports
// ============================================================================

pub use context::RoutingContext;
pub use router::{Session, SessionRouter};
