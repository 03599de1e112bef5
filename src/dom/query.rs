//! Scoped query engine.
//!
//! One implementation serves every [`Scope`] variant:
//!
//! | Scope | Command | Receiver |
//! |-------|---------|----------|
//! | Document | `Runtime.evaluate` | `document` global |
//! | Node | `Runtime.callFunctionOn` | the node handle |
//! | Shadow | `Runtime.callFunctionOn` | the shadow-root handle |
//!
//! Binding the call to the handle is what makes open, closed and
//! user-agent shadow roots behave the same.

// ============================================================================
// Imports
// ============================================================================

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::{NodeRef, RemoteObjectId};
use crate::protocol::{CallArgument, EvaluateResult, PropertiesResult, RemoteObject, RuntimeCommand};
use crate::session::RoutingContext;

use super::compiler::split_frame_segments;
use super::element::Element;
use super::frame;
use super::scope::{Scope, ScopeKind};
use super::selector::{By, Dialect, relative_xpath};

// ============================================================================
// Scripts
// ============================================================================

const BOUND_CSS_FIRST: &str = "function(selector) { return this.querySelector(selector); }";

const BOUND_CSS_ALL: &str =
    "function(selector) { return Array.from(this.querySelectorAll(selector)); }";

const BOUND_XPATH_FIRST: &str = "function(xpath) { \
    const doc = this.ownerDocument || this; \
    return doc.evaluate(xpath, this, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue; \
}";

const BOUND_XPATH_ALL: &str = "function(xpath) { \
    const doc = this.ownerDocument || this; \
    const snapshot = doc.evaluate(xpath, this, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
    const nodes = []; \
    for (let i = 0; i < snapshot.snapshotLength; i++) nodes.push(snapshot.snapshotItem(i)); \
    return nodes; \
}";

/// Builds a document-level expression with the selector inlined as a literal.
fn document_script(dialect: Dialect, all: bool, selector: &str) -> Result<String> {
    let literal = serde_json::to_string(selector)?;
    let script = match (dialect, all) {
        (Dialect::Css, false) => format!("document.querySelector({literal})"),
        (Dialect::Css, true) => format!("Array.from(document.querySelectorAll({literal}))"),
        (Dialect::XPath, false) => format!(
            "document.evaluate({literal}, document, null, \
             XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue"
        ),
        (Dialect::XPath, true) => format!(
            "(() => {{ \
             const snapshot = document.evaluate({literal}, document, null, \
             XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
             const nodes = []; \
             for (let i = 0; i < snapshot.snapshotLength; i++) nodes.push(snapshot.snapshotItem(i)); \
             return nodes; }})()"
        ),
    };
    Ok(script)
}

const fn bound_function(dialect: Dialect, all: bool) -> &'static str {
    match (dialect, all) {
        (Dialect::Css, false) => BOUND_CSS_FIRST,
        (Dialect::Css, true) => BOUND_CSS_ALL,
        (Dialect::XPath, false) => BOUND_XPATH_FIRST,
        (Dialect::XPath, true) => BOUND_XPATH_ALL,
    }
}

// ============================================================================
// Query
// ============================================================================

/// Evaluates `by` against `scope`.
///
/// Frame-crossing selectors resolve each frame with the first match of its
/// segment and continue inside that frame's content scope; `all` applies
/// to the final segment only. A frame segment that matches nothing yields
/// an empty result.
///
/// # Errors
///
/// - [`Error::Capability`] before anything is sent, if the scope cannot
///   evaluate the selector's dialect
/// - [`Error::StaleReference`] if a handle involved has gone stale
/// - [`Error::Script`] if the browser throws while matching
/// - [`Error::FrameNotFound`] if a frame's content cannot be reached
pub async fn query(scope: &Scope, by: &By, all: bool) -> Result<Vec<Element>> {
    scope.check(by.dialect())?;

    let segments = split_frame_segments(by);
    let Some((last, frames)) = segments.split_last() else {
        return Ok(Vec::new());
    };

    let mut current = scope.clone();
    for segment in frames {
        trace!(selector = %segment, scope = current.kind().name(), "Resolving frame segment");
        let Some(frame_element) = query_segment(&current, segment, false).await?.into_iter().next()
        else {
            debug!(selector = %segment, "Frame segment matched nothing");
            return Ok(Vec::new());
        };
        current = frame::content_scope(&frame_element).await?;
    }

    query_segment(&current, last, all).await
}

/// Evaluates one selector segment without frame splitting.
async fn query_segment(scope: &Scope, by: &By, all: bool) -> Result<Vec<Element>> {
    let dialect = by.dialect();
    scope.check(dialect)?;

    let context = scope.context();
    let expression = by.expression();

    let result: EvaluateResult = match scope.kind() {
        ScopeKind::Document => {
            context
                .call(RuntimeCommand::Evaluate {
                    expression: document_script(dialect, all, &expression)?,
                    return_by_value: false,
                    await_promise: false,
                })
                .await?
        }
        ScopeKind::Node { object_id } | ScopeKind::Shadow { object_id, .. } => {
            let selector = match (scope.kind(), dialect) {
                (ScopeKind::Node { .. }, Dialect::XPath) => relative_xpath(&expression).into_owned(),
                _ => expression.into_owned(),
            };

            context
                .call(RuntimeCommand::CallFunctionOn {
                    function_declaration: bound_function(dialect, all).to_string(),
                    object_id: object_id.clone(),
                    arguments: vec![CallArgument::value(selector)],
                    return_by_value: false,
                    await_promise: false,
                })
                .await
                .map_err(|e| e.into_stale(&NodeRef::Object(object_id.clone())))?
        }
    };

    if let Some(exception) = result.exception_details {
        return Err(Error::script(exception.message()));
    }

    let Some(object_id) = handle_of(result.result) else {
        trace!(selector = %by, all, "No match");
        return Ok(Vec::new());
    };

    if all {
        collect_array(context, object_id).await
    } else {
        Ok(vec![Element::new(object_id, context.clone())])
    }
}

fn handle_of(object: RemoteObject) -> Option<RemoteObjectId> {
    if object.is_nullish() {
        return None;
    }
    object.object_id
}

/// Extracts the elements of an array handle in index order, then releases it.
async fn collect_array(context: &RoutingContext, array_id: RemoteObjectId) -> Result<Vec<Element>> {
    let properties: PropertiesResult = context
        .call(RuntimeCommand::GetProperties {
            object_id: array_id.clone(),
            own_properties: true,
        })
        .await
        .map_err(|e| e.into_stale(&NodeRef::Object(array_id.clone())))?;

    let mut items: Vec<(usize, RemoteObjectId)> = properties
        .result
        .into_iter()
        .filter_map(|property| {
            let index = property.name.parse::<usize>().ok()?;
            let object_id = property.value.and_then(handle_of)?;
            Some((index, object_id))
        })
        .collect();
    items.sort_by_key(|(index, _)| *index);

    release(context, array_id).await;

    Ok(items
        .into_iter()
        .map(|(_, object_id)| Element::new(object_id, context.clone()))
        .collect())
}

async fn release(context: &RoutingContext, object_id: RemoteObjectId) {
    if let Err(e) = context
        .execute(RuntimeCommand::ReleaseObject {
            object_id: object_id.clone(),
        })
        .await
    {
        debug!(object_id = %object_id, error = %e, "Failed to release array handle");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::identifiers::SessionId;
    use crate::protocol::ShadowRootMode;
    use crate::session::SessionRouter;
    use crate::testing::{FakeBrowser, Reply};

    #[test]
    fn test_document_script_escapes_selector() {
        let script = document_script(Dialect::Css, false, "a[title=\"x\"]").expect("script");
        assert_eq!(script, r#"document.querySelector("a[title=\"x\"]")"#);

        let script = document_script(Dialect::XPath, true, "//li").expect("script");
        assert!(script.contains("ORDERED_NODE_SNAPSHOT_TYPE"));
        assert!(script.contains(r#""//li""#));
    }

    #[tokio::test]
    async fn test_document_scope_uses_evaluate() {
        let (browser, connection) = FakeBrowser::start(|_| {
            Reply::Result(json!({ "result": { "type": "object", "subtype": "node", "objectId": "el-1" } }))
        })
        .await;
        let context = RoutingContext::top_level(SessionRouter::new(connection));
        let scope = Scope::document(context.clone());

        let found = query(&scope, &By::id("submit"), false).await.expect("query");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].object_id().as_str(), "el-1");
        assert_eq!(found[0].context(), &context);

        let requests = browser.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "Runtime.evaluate");
        assert_eq!(requests[0].params["expression"], "document.querySelector(\"#submit\")");
    }

    #[tokio::test]
    async fn test_node_scope_binds_to_handle_and_relativizes_xpath() {
        let (browser, connection) = FakeBrowser::start(|_| {
            Reply::Result(json!({ "result": { "type": "object", "subtype": "null" } }))
        })
        .await;
        let context = RoutingContext::top_level(SessionRouter::new(connection));
        let scope = Scope::node(context, RemoteObjectId::new("host"));

        let found = query(&scope, &By::xpath("//span"), false).await.expect("query");
        assert!(found.is_empty());

        let request = &browser.requests_for("Runtime.callFunctionOn")[0];
        assert_eq!(request.params["objectId"], "host");
        assert_eq!(request.params["arguments"][0]["value"], ".//span");
    }

    #[tokio::test]
    async fn test_all_returns_index_order_and_releases_array() {
        let (browser, connection) = FakeBrowser::start(|request| match request.method.as_str() {
            "Runtime.callFunctionOn" => Reply::Result(json!({
                "result": { "type": "object", "subtype": "array", "objectId": "array-1" }
            })),
            "Runtime.getProperties" => Reply::Result(json!({ "result": [
                { "name": "length", "value": { "type": "number", "value": 3 } },
                { "name": "2", "value": { "type": "object", "objectId": "c" } },
                { "name": "0", "value": { "type": "object", "objectId": "a" } },
                { "name": "1", "value": { "type": "object", "objectId": "b" } },
                { "name": "__proto__", "value": { "type": "object", "objectId": "proto" } }
            ]})),
            _ => Reply::Result(json!({})),
        })
        .await;
        let context = RoutingContext::top_level(SessionRouter::new(connection));
        let scope = Scope::shadow(context, RemoteObjectId::new("root"), ShadowRootMode::Open);

        let found = query(&scope, &By::css("li"), true).await.expect("query");
        let ids: Vec<&str> = found.iter().map(|e| e.object_id().as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);

        let released = browser.requests_for("Runtime.releaseObject");
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].params["objectId"], "array-1");
    }

    #[tokio::test]
    async fn test_release_failure_is_ignored() {
        let (_browser, connection) = FakeBrowser::start(|request| match request.method.as_str() {
            "Runtime.evaluate" => Reply::Result(json!({
                "result": { "type": "object", "subtype": "array", "objectId": "array-1" }
            })),
            "Runtime.getProperties" => Reply::Result(json!({ "result": [
                { "name": "0", "value": { "type": "object", "objectId": "a" } }
            ]})),
            _ => Reply::stale_object(),
        })
        .await;
        let scope = Scope::document(RoutingContext::top_level(SessionRouter::new(connection)));

        let found = query(&scope, &By::css("li"), true).await.expect("query");
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_exception_becomes_script_error() {
        let (_browser, connection) = FakeBrowser::start(|_| {
            Reply::Result(json!({
                "result": { "type": "object", "subtype": "error" },
                "exceptionDetails": {
                    "text": "Uncaught",
                    "exception": { "type": "object", "description": "SyntaxError: '##' is not a valid selector" }
                }
            }))
        })
        .await;
        let scope = Scope::document(RoutingContext::top_level(SessionRouter::new(connection)));

        let err = query(&scope, &By::css("##"), false).await.unwrap_err();
        assert!(matches!(err, Error::Script { ref message } if message.contains("SyntaxError")));
    }

    #[tokio::test]
    async fn test_oopif_session_context_is_kept() {
        let (browser, connection) = FakeBrowser::start(|_| {
            Reply::Result(json!({ "result": { "type": "object", "objectId": "inner" } }))
        })
        .await;
        let context =
            RoutingContext::top_level(SessionRouter::new(connection)).for_session(SessionId::new("S2"));
        let scope = Scope::node(context.clone(), RemoteObjectId::new("doc"));

        let found = query(&scope, &By::css("p"), false).await.expect("query");
        assert_eq!(found[0].context(), &context);
        assert_eq!(browser.requests()[0].session_id.as_str(), "S2");
    }
}
