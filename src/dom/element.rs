//! DOM element handles.
//!
//! An [`Element`] is an object handle plus the [`RoutingContext`] it was
//! produced in. Every command on it, including geometry reads and pointer
//! input, goes through that context.
//!
//! # Example
//!
//! ```ignore
//! let host = page.find("#widget-host").await?;
//! let root = host.shadow_root().await?;
//! let button = root.find(".confirm").await?;
//! button.click().await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::{BackendNodeId, NodeRef, RemoteObjectId, SessionId};
use crate::protocol::{
    BoxModel, BoxModelResult, Command, DomCommand, EvaluateResult, InputCommand, MouseButton,
    MouseEventType, Node, OuterHtmlResult, Rect, RemoteObject, RuntimeCommand,
};
use crate::session::RoutingContext;
use crate::wait::{WaitOptions, poll_until};

use super::frame;
use super::resolve;
use super::scope::Scope;
use super::selector::By;
use super::shadow_root::ShadowRoot;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for an element.
struct ElementInner {
    /// Object handle in the context's session.
    object_id: RemoteObjectId,
    /// Routing inherited from the producing scope.
    context: RoutingContext,
    /// Backend reference, filled by the first describe.
    backend_node_id: OnceLock<BackendNodeId>,
}

// ============================================================================
// Element
// ============================================================================

/// A handle to a DOM element.
///
/// Cloning is cheap; clones share the cached backend reference.
#[derive(Clone)]
pub struct Element {
    inner: Arc<ElementInner>,
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("object_id", &self.inner.object_id)
            .field("session_id", self.inner.context.session_id())
            .finish_non_exhaustive()
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.inner.object_id == other.inner.object_id && self.inner.context == other.inner.context
    }
}

impl Eq for Element {}

// ============================================================================
// Element - Constructor & Accessors
// ============================================================================

impl Element {
    /// Creates an element handle in a context.
    pub(crate) fn new(object_id: RemoteObjectId, context: RoutingContext) -> Self {
        Self {
            inner: Arc::new(ElementInner {
                object_id,
                context,
                backend_node_id: OnceLock::new(),
            }),
        }
    }

    /// Returns the object handle.
    #[inline]
    #[must_use]
    pub fn object_id(&self) -> &RemoteObjectId {
        &self.inner.object_id
    }

    /// Returns the routing context.
    #[inline]
    #[must_use]
    pub fn context(&self) -> &RoutingContext {
        &self.inner.context
    }

    /// Returns the session this element lives in.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        self.inner.context.session_id()
    }

    /// Returns the handle as a node reference.
    #[inline]
    #[must_use]
    pub fn reference(&self) -> NodeRef {
        NodeRef::Object(self.inner.object_id.clone())
    }

    /// Returns a node scope over this element's subtree.
    #[inline]
    #[must_use]
    pub fn scope(&self) -> Scope {
        Scope::node(self.inner.context.clone(), self.inner.object_id.clone())
    }

    /// Sends a command naming this element; stale errors name the handle.
    async fn execute(&self, command: impl Into<Command>) -> Result<Value> {
        self.inner
            .context
            .execute(command)
            .await
            .map_err(|e| e.into_stale(&self.reference()))
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, command: impl Into<Command>) -> Result<T> {
        let value = self.execute(command).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Calls a function with `this` bound to the element.
    async fn call_function(&self, declaration: &str, return_by_value: bool) -> Result<RemoteObject> {
        let result: EvaluateResult = self
            .call(RuntimeCommand::CallFunctionOn {
                function_declaration: declaration.to_string(),
                object_id: self.inner.object_id.clone(),
                arguments: Vec::new(),
                return_by_value,
                await_promise: false,
            })
            .await?;

        match result.exception_details {
            Some(exception) => Err(Error::script(exception.message())),
            None => Ok(result.result),
        }
    }
}

// ============================================================================
// Element - Description
// ============================================================================

impl Element {
    /// Describes the element one level deep, piercing shadow roots.
    ///
    /// # Errors
    ///
    /// [`Error::StaleReference`] if the handle is gone.
    pub async fn describe(&self) -> Result<Node> {
        let node = resolve::describe_node(self.context(), &self.reference(), 1).await?;
        if let Some(backend_node_id) = node.backend_node_id {
            let _ = self.inner.backend_node_id.set(backend_node_id);
        }
        Ok(node)
    }

    /// Returns the backend reference, describing the element on first use.
    ///
    /// # Errors
    ///
    /// [`Error::StaleReference`] if the handle is gone, or
    /// [`Error::MalformedMessage`] if the description carries none.
    pub async fn backend_node_id(&self) -> Result<BackendNodeId> {
        if let Some(id) = self.inner.backend_node_id.get() {
            return Ok(*id);
        }
        self.describe().await?.backend_node_id.ok_or_else(|| {
            Error::malformed(format!("describeNode returned no backendNodeId for {}", self.reference()))
        })
    }

    /// Returns the lower-case tag name.
    pub async fn tag_name(&self) -> Result<String> {
        let node = self.describe().await?;
        let name = if node.local_name.is_empty() {
            node.node_name
        } else {
            node.local_name
        };
        Ok(name.to_lowercase())
    }

    /// Returns all attributes as `(name, value)` pairs.
    pub async fn attributes(&self) -> Result<Vec<(String, String)>> {
        Ok(self.describe().await?.attribute_pairs())
    }

    /// Returns one attribute value.
    pub async fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.describe().await?.attribute(name).map(str::to_string))
    }

    /// Returns `true` if the element owns a frame.
    pub async fn is_frame(&self) -> Result<bool> {
        Ok(self.describe().await?.is_frame_owner())
    }
}

// ============================================================================
// Element - Content
// ============================================================================

impl Element {
    /// Returns `textContent`.
    pub async fn text(&self) -> Result<String> {
        let object = self
            .call_function("function() { return this.textContent; }", true)
            .await?;
        Ok(object
            .value
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    /// Returns the element's markup.
    pub async fn outer_html(&self) -> Result<String> {
        let result: OuterHtmlResult = self
            .call(DomCommand::GetOuterHtml {
                object_id: Some(self.inner.object_id.clone()),
                backend_node_id: None,
            })
            .await?;
        Ok(result.outer_html)
    }
}

// ============================================================================
// Element - Geometry
// ============================================================================

impl Element {
    /// Returns the box model in the element's own viewport coordinates.
    pub async fn box_model(&self) -> Result<BoxModel> {
        let result: BoxModelResult = self
            .call(DomCommand::GetBoxModel {
                object_id: self.inner.object_id.clone(),
            })
            .await?;
        Ok(result.model)
    }

    /// Returns the border-box bounds.
    pub async fn bounding_box(&self) -> Result<Rect> {
        self.box_model()
            .await?
            .border
            .bounds()
            .ok_or_else(|| Error::malformed(format!("empty border quad for {}", self.reference())))
    }

    /// Scrolls the element into view if needed.
    pub async fn scroll_into_view(&self) -> Result<()> {
        self.execute(DomCommand::ScrollIntoViewIfNeeded {
            object_id: self.inner.object_id.clone(),
        })
        .await?;
        Ok(())
    }
}

// ============================================================================
// Element - Actions
// ============================================================================

impl Element {
    /// Clicks the element with the primary button.
    ///
    /// # Errors
    ///
    /// [`Error::StaleReference`] if the handle is gone, or any transport or
    /// protocol error.
    pub async fn click(&self) -> Result<()> {
        self.click_with(MouseButton::Left).await
    }

    /// Clicks the element at the centre of its content box.
    ///
    /// Geometry and input both go through the element's routing context,
    /// so coordinates always match the viewport they are dispatched to.
    pub async fn click_with(&self, button: MouseButton) -> Result<()> {
        self.scroll_into_view().await?;

        let (x, y) = self
            .box_model()
            .await?
            .content
            .center()
            .ok_or_else(|| Error::malformed(format!("empty content quad for {}", self.reference())))?;

        debug!(
            object_id = %self.inner.object_id,
            session_id = %self.session_id(),
            x,
            y,
            "Clicking element"
        );

        let sequence = [
            (MouseEventType::MouseMoved, MouseButton::None, 0),
            (MouseEventType::MousePressed, button, 1),
            (MouseEventType::MouseReleased, button, 1),
        ];
        for (event_type, button, click_count) in sequence {
            self.execute(InputCommand::DispatchMouseEvent {
                event_type,
                x,
                y,
                button,
                click_count,
            })
            .await?;
        }
        Ok(())
    }
}

// ============================================================================
// Element - Shadow Roots
// ============================================================================

impl Element {
    /// Returns every shadow root hosted by this element, in description order.
    ///
    /// Each root inherits this element's routing context.
    pub async fn shadow_roots(&self) -> Result<Vec<ShadowRoot>> {
        resolve::shadow_roots(self).await
    }

    /// Returns the first author-created shadow root.
    ///
    /// # Errors
    ///
    /// [`Error::ShadowRootNotFound`] if there is none.
    pub async fn shadow_root(&self) -> Result<ShadowRoot> {
        self.shadow_roots()
            .await?
            .into_iter()
            .find(|root| !root.is_user_agent())
            .ok_or_else(|| Error::shadow_root_not_found(self.reference()))
    }

    /// Returns the engine-internal shadow root.
    ///
    /// # Errors
    ///
    /// [`Error::ShadowRootNotFound`] if there is none.
    pub async fn user_agent_shadow_root(&self) -> Result<ShadowRoot> {
        self.shadow_roots()
            .await?
            .into_iter()
            .find(ShadowRoot::is_user_agent)
            .ok_or_else(|| Error::shadow_root_not_found(self.reference()))
    }

    /// Polls until an author-created shadow root is attached, using the
    /// context's wait defaults.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] when the deadline passes.
    pub async fn wait_for_shadow_root(&self) -> Result<ShadowRoot> {
        self.wait_for_shadow_root_with(self.inner.context.wait()).await
    }

    /// Polls until an author-created shadow root is attached.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] when the deadline passes.
    pub async fn wait_for_shadow_root_with(&self, options: WaitOptions) -> Result<ShadowRoot> {
        let operation = format!("wait for shadow root on {}", self.reference());
        poll_until(&operation, options, move || async move {
            match self.shadow_root().await {
                Ok(root) => Ok(Some(root)),
                Err(Error::ShadowRootNotFound { .. }) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
    }
}

// ============================================================================
// Element - Frames
// ============================================================================

impl Element {
    /// Returns the scope of the document inside this frame element.
    ///
    /// Out-of-process frames are attached and the scope carries the new
    /// session's context.
    ///
    /// # Errors
    ///
    /// [`Error::FrameNotFound`] if the element is not a reachable frame.
    pub async fn content_scope(&self) -> Result<Scope> {
        frame::content_scope(self).await
    }
}

// ============================================================================
// Element - Search
// ============================================================================

impl Element {
    /// Runs a query in this element's subtree.
    pub async fn query(&self, by: impl Into<By>, all: bool) -> Result<Vec<Element>> {
        self.scope().query(by, all).await
    }

    /// Finds the first matching descendant.
    pub async fn find(&self, by: impl Into<By>) -> Result<Element> {
        self.scope().find(by).await
    }

    /// Finds every matching descendant.
    pub async fn find_all(&self, by: impl Into<By>) -> Result<Vec<Element>> {
        self.scope().find_all(by).await
    }

    /// Polls until a descendant matches, using the context's wait defaults.
    pub async fn wait_for(&self, by: impl Into<By>) -> Result<Element> {
        self.scope().wait_for(by).await
    }

    /// Polls until a descendant matches.
    pub async fn wait_for_with(&self, by: impl Into<By>, options: WaitOptions) -> Result<Element> {
        self.scope().wait_for_with(by, options).await
    }
}
