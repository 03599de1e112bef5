//! Top-level document of a session.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{SessionId, TargetId};
use crate::protocol::{EvaluateResult, RuntimeCommand};
use crate::session::RoutingContext;
use crate::wait::WaitOptions;

use super::element::Element;
use super::scope::Scope;
use super::selector::By;

// ============================================================================
// Page
// ============================================================================

/// The document root of one session.
///
/// # Example
///
/// ```ignore
/// let page = client.page();
/// let rows = page.find_all("table tr").await?;
/// let title = page.evaluate("document.title").await?;
/// ```
#[derive(Clone)]
pub struct Page {
    context: RoutingContext,
    target_id: Option<TargetId>,
}

impl Page {
    /// Creates a page over a routing context.
    #[inline]
    #[must_use]
    pub fn new(context: RoutingContext, target_id: Option<TargetId>) -> Self {
        Self { context, target_id }
    }

    /// Returns the routing context.
    #[inline]
    #[must_use]
    pub fn context(&self) -> &RoutingContext {
        &self.context
    }

    /// Returns the session id.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        self.context.session_id()
    }

    /// Returns the target id, if the page was attached explicitly.
    #[inline]
    #[must_use]
    pub fn target_id(&self) -> Option<&TargetId> {
        self.target_id.as_ref()
    }

    /// Returns the document scope.
    #[inline]
    #[must_use]
    pub fn scope(&self) -> Scope {
        Scope::document(self.context.clone())
    }

    /// Evaluates an expression and returns its JSON value.
    ///
    /// Promises are awaited.
    ///
    /// # Errors
    ///
    /// [`Error::Script`] if the expression throws.
    pub async fn evaluate(&self, expression: impl Into<String>) -> Result<Value> {
        let result: EvaluateResult = self
            .context
            .call(RuntimeCommand::Evaluate {
                expression: expression.into(),
                return_by_value: true,
                await_promise: true,
            })
            .await?;

        if let Some(exception) = result.exception_details {
            return Err(Error::script(exception.message()));
        }
        Ok(result.result.value.unwrap_or(Value::Null))
    }

    /// Returns the `document` node as an element.
    ///
    /// # Errors
    ///
    /// [`Error::Script`] if the evaluation fails.
    pub async fn document(&self) -> Result<Element> {
        let result: EvaluateResult = self
            .context
            .call(RuntimeCommand::Evaluate {
                expression: "document".to_string(),
                return_by_value: false,
                await_promise: false,
            })
            .await?;

        if let Some(exception) = result.exception_details {
            return Err(Error::script(exception.message()));
        }
        result
            .result
            .object_id
            .map(|object_id| Element::new(object_id, self.context.clone()))
            .ok_or_else(|| Error::script("document evaluated to a primitive"))
    }

    /// Runs a query against the whole document.
    pub async fn query(&self, by: impl Into<By>, all: bool) -> Result<Vec<Element>> {
        self.scope().query(by, all).await
    }

    /// Finds the first matching element.
    pub async fn find(&self, by: impl Into<By>) -> Result<Element> {
        self.scope().find(by).await
    }

    /// Finds every matching element.
    pub async fn find_all(&self, by: impl Into<By>) -> Result<Vec<Element>> {
        self.scope().find_all(by).await
    }

    /// Polls until an element matches, using the context's wait defaults.
    pub async fn wait_for(&self, by: impl Into<By>) -> Result<Element> {
        self.scope().wait_for(by).await
    }

    /// Polls until an element matches.
    pub async fn wait_for_with(&self, by: impl Into<By>, options: WaitOptions) -> Result<Element> {
        self.scope().wait_for_with(by, options).await
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("session_id", self.session_id())
            .field("target_id", &self.target_id)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
