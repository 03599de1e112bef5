//! The polymorphic "search relative to me" capability.
//!
//! A [`Scope`] is data: a [`ScopeKind`] plus the [`RoutingContext`] every
//! command issued on its behalf must use. Pages, elements and shadow roots
//! all expose their search through one.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::error::{Error, Result};
use crate::identifiers::RemoteObjectId;
use crate::protocol::ShadowRootMode;
use crate::session::RoutingContext;
use crate::wait::{WaitOptions, poll_until};

use super::element::Element;
use super::query;
use super::selector::{By, Dialect};

// ============================================================================
// ScopeKind
// ============================================================================

/// What a search is relative to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeKind {
    /// The session's whole top-level document.
    Document,
    /// The subtree of a node.
    Node {
        /// Handle of the node.
        object_id: RemoteObjectId,
    },
    /// The tree of a shadow root.
    Shadow {
        /// Handle of the shadow root.
        object_id: RemoteObjectId,
        /// Access mode of the shadow root.
        mode: ShadowRootMode,
    },
}

impl ScopeKind {
    /// Returns a display name for the variant.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Node { .. } => "node",
            Self::Shadow { .. } => "shadow",
        }
    }

    /// Returns the scope's object handle, if any.
    #[inline]
    #[must_use]
    pub fn object_id(&self) -> Option<&RemoteObjectId> {
        match self {
            Self::Document => None,
            Self::Node { object_id } | Self::Shadow { object_id, .. } => Some(object_id),
        }
    }

    /// Returns `true` if selectors of `dialect` can run in this scope.
    ///
    /// Shadow roots have no path-query evaluator, so XPath is rejected.
    #[inline]
    #[must_use]
    pub const fn supports(&self, dialect: Dialect) -> bool {
        !matches!((self, dialect), (Self::Shadow { .. }, Dialect::XPath))
    }
}

// ============================================================================
// Scope
// ============================================================================

/// A search root and its routing context.
#[derive(Clone, PartialEq, Eq)]
pub struct Scope {
    kind: ScopeKind,
    context: RoutingContext,
}

impl Scope {
    /// Creates a document scope.
    #[inline]
    #[must_use]
    pub fn document(context: RoutingContext) -> Self {
        Self {
            kind: ScopeKind::Document,
            context,
        }
    }

    /// Creates a node scope.
    #[inline]
    #[must_use]
    pub fn node(context: RoutingContext, object_id: RemoteObjectId) -> Self {
        Self {
            kind: ScopeKind::Node { object_id },
            context,
        }
    }

    /// Creates a shadow scope.
    #[inline]
    #[must_use]
    pub fn shadow(context: RoutingContext, object_id: RemoteObjectId, mode: ShadowRootMode) -> Self {
        Self {
            kind: ScopeKind::Shadow { object_id, mode },
            context,
        }
    }

    /// Returns the variant.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &ScopeKind {
        &self.kind
    }

    /// Returns the routing context.
    #[inline]
    #[must_use]
    pub fn context(&self) -> &RoutingContext {
        &self.context
    }

    /// Returns the scope's object handle, if any.
    #[inline]
    #[must_use]
    pub fn object_id(&self) -> Option<&RemoteObjectId> {
        self.kind.object_id()
    }

    /// Returns `true` if selectors of `dialect` can run in this scope.
    #[inline]
    #[must_use]
    pub fn supports(&self, dialect: Dialect) -> bool {
        self.kind.supports(dialect)
    }

    /// Rejects a dialect the scope cannot evaluate.
    ///
    /// # Errors
    ///
    /// [`Error::Capability`] if the dialect is unsupported.
    pub fn check(&self, dialect: Dialect) -> Result<()> {
        if self.supports(dialect) {
            Ok(())
        } else {
            Err(Error::capability(dialect.as_str(), self.kind.name()))
        }
    }
}

// ============================================================================
// Scope - Search
// ============================================================================

impl Scope {
    /// Runs a query; `all` selects every match instead of the first.
    ///
    /// Frame-crossing selectors are split and evaluated segment by segment.
    ///
    /// # Errors
    ///
    /// - [`Error::Capability`] for XPath against a shadow scope
    /// - [`Error::StaleReference`] if the scope's handle is gone
    /// - [`Error::Script`] if the browser throws while matching
    pub async fn query(&self, by: impl Into<By>, all: bool) -> Result<Vec<Element>> {
        query::query(self, &by.into(), all).await
    }

    /// Finds the first matching element.
    ///
    /// # Errors
    ///
    /// [`Error::ElementNotFound`] if nothing matches, plus the errors of
    /// [`Scope::query`].
    pub async fn find(&self, by: impl Into<By>) -> Result<Element> {
        let by = by.into();
        self.query(&by, false)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::element_not_found(by.to_string(), self.context.session_id().clone()))
    }

    /// Finds every matching element in document order.
    ///
    /// # Errors
    ///
    /// See [`Scope::query`].
    pub async fn find_all(&self, by: impl Into<By>) -> Result<Vec<Element>> {
        self.query(by, true).await
    }

    /// Polls until an element matches, using the context's wait defaults.
    ///
    /// # Errors
    ///
    /// See [`Scope::wait_for_with`].
    pub async fn wait_for(&self, by: impl Into<By>) -> Result<Element> {
        self.wait_for_with(by, self.context.wait()).await
    }

    /// Polls until an element matches.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] when the deadline passes, plus the errors of
    /// [`Scope::query`].
    pub async fn wait_for_with(&self, by: impl Into<By>, options: WaitOptions) -> Result<Element> {
        let by = by.into();
        let operation = format!("wait for {by}");
        let by = &by;
        poll_until(&operation, options, move || async move {
            Ok(self.query(by, false).await?.into_iter().next())
        })
        .await
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("kind", &self.kind)
            .field("session_id", self.context.session_id())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
