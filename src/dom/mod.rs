//! Scoped DOM queries.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `selector` | `By` locator strategies and dialects |
//! | `compiler` | Frame-crossing selector splitting |
//! | `scope` | Document / node / shadow search roots |
//! | `query` | The scoped query engine |
//! | `resolve` | `describeNode` / `resolveNode` pipeline |
//! | `frame` | Frame content scopes and session switching |
//! | `element` | Element handles |
//! | `shadow_root` | Shadow root handles |
//! | `page` | Session document root |

// ============================================================================
// Submodules
// ============================================================================

/// Selector compiler.
pub mod compiler;

/// Element handles.
pub mod element;

/// Frame boundaries.
mod frame;

/// Session document root.
pub mod page;

/// Scoped query engine.
pub mod query;

/// Node resolution pipeline.
pub mod resolve;

/// Search roots.
pub mod scope;

/// Locator strategies.
pub mod selector;

/// Shadow root handles.
pub mod shadow_root;


// ============================================================================
// Re-exports
// ============================================================================

pub use compiler::split_frame_segments;
pub use element::Element;
pub use page::Page;
pub use scope::{Scope, ScopeKind};
pub use selector::{By, Dialect};
pub use shadow_root::ShadowRoot;
