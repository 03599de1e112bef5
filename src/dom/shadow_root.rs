//! Shadow root handles.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::error::Result;
use crate::identifiers::{BackendNodeId, NodeRef, RemoteObjectId};
use crate::protocol::{DomCommand, OuterHtmlResult, ShadowRootMode};
use crate::session::RoutingContext;
use crate::wait::WaitOptions;

use super::element::Element;
use super::scope::Scope;
use super::selector::By;

// ============================================================================
// ShadowRoot
// ============================================================================

/// A resolved shadow root.
///
/// Queries run with `this` bound to the root's handle, so closed and
/// user-agent roots are searchable exactly like open ones. Only CSS
/// selectors are accepted.
#[derive(Clone)]
pub struct ShadowRoot {
    object_id: RemoteObjectId,
    mode: ShadowRootMode,
    backend_node_id: BackendNodeId,
    host: Element,
}

impl ShadowRoot {
    pub(crate) fn new(
        object_id: RemoteObjectId,
        mode: ShadowRootMode,
        backend_node_id: BackendNodeId,
        host: Element,
    ) -> Self {
        Self {
            object_id,
            mode,
            backend_node_id,
            host,
        }
    }

    /// Returns the access mode.
    #[inline]
    #[must_use]
    pub fn mode(&self) -> ShadowRootMode {
        self.mode
    }

    /// Returns `true` for an open root.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.mode == ShadowRootMode::Open
    }

    /// Returns `true` for a closed root.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.mode == ShadowRootMode::Closed
    }

    /// Returns `true` for an engine-internal root.
    #[inline]
    #[must_use]
    pub fn is_user_agent(&self) -> bool {
        self.mode == ShadowRootMode::UserAgent
    }

    /// Returns the host element.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &Element {
        &self.host
    }

    /// Returns the object handle.
    #[inline]
    #[must_use]
    pub fn object_id(&self) -> &RemoteObjectId {
        &self.object_id
    }

    /// Returns the backend reference.
    #[inline]
    #[must_use]
    pub fn backend_node_id(&self) -> BackendNodeId {
        self.backend_node_id
    }

    /// Returns the routing context, inherited from the host.
    #[inline]
    #[must_use]
    pub fn context(&self) -> &RoutingContext {
        self.host.context()
    }

    /// Returns a shadow scope over this root.
    #[inline]
    #[must_use]
    pub fn scope(&self) -> Scope {
        Scope::shadow(self.context().clone(), self.object_id.clone(), self.mode)
    }

    /// Returns the serialized content of the root.
    ///
    /// # Errors
    ///
    /// [`crate::Error::StaleReference`] if the handle is gone.
    pub async fn inner_html(&self) -> Result<String> {
        let reference = NodeRef::Object(self.object_id.clone());
        let result: OuterHtmlResult = self
            .context()
            .call(DomCommand::GetOuterHtml {
                object_id: Some(self.object_id.clone()),
                backend_node_id: None,
            })
            .await
            .map_err(|e| e.into_stale(&reference))?;
        Ok(result.outer_html)
    }

    /// Runs a CSS query in this root.
    pub async fn query(&self, by: impl Into<By>, all: bool) -> Result<Vec<Element>> {
        self.scope().query(by, all).await
    }

    /// Finds the first match in this root.
    pub async fn find(&self, by: impl Into<By>) -> Result<Element> {
        self.scope().find(by).await
    }

    /// Finds every match in this root.
    pub async fn find_all(&self, by: impl Into<By>) -> Result<Vec<Element>> {
        self.scope().find_all(by).await
    }

    /// Polls until an element in this root matches, using the context's wait defaults.
    pub async fn wait_for(&self, by: impl Into<By>) -> Result<Element> {
        self.scope().wait_for(by).await
    }

    /// Polls until an element in this root matches.
    pub async fn wait_for_with(&self, by: impl Into<By>, options: WaitOptions) -> Result<Element> {
        self.scope().wait_for_with(by, options).await
    }
}

impl fmt::Debug for ShadowRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowRoot")
            .field("object_id", &self.object_id)
            .field("mode", &self.mode)
            .field("backend_node_id", &self.backend_node_id)
            .field("host", &self.host.object_id())
            .finish()
    }
}
