//! Frame boundaries and routing-context propagation.
//!
//! A same-process frame exposes its `contentDocument` in the owner's
//! description, so its content is resolved in the owner's session. An
//! out-of-process frame is a separate target: it is attached, and the
//! returned scope carries the new session's context. Everything found
//! below it inherits that context.

// ============================================================================
// Imports
// ============================================================================

use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::TargetId;
use crate::protocol::{EvaluateResult, RuntimeCommand};

use super::element::Element;
use super::resolve;
use super::scope::Scope;

/// Target type of out-of-process frames.
const IFRAME_TARGET_TYPE: &str = "iframe";

// ============================================================================
// Content Scope
// ============================================================================

/// Returns the scope of the document inside a frame element.
///
/// # Errors
///
/// - [`Error::FrameNotFound`] if the element owns no frame, or its frame is
///   neither in-process nor a known frame target
/// - [`Error::StaleReference`] if the element handle is gone
pub(crate) async fn content_scope(frame: &Element) -> Result<Scope> {
    let context = frame.context();
    let node = frame.describe().await?;

    if !node.is_frame_owner() {
        return Err(Error::frame_not_found(frame.reference(), node.frame_id));
    }

    // Same process: the content document is part of the owner's tree.
    if let Some(document) = node.content_document {
        let Some(backend_node_id) = document.backend_node_id else {
            return Err(Error::frame_not_found(frame.reference(), node.frame_id));
        };
        let object_id = resolve::resolve_node(context, backend_node_id).await?;

        debug!(
            frame = %frame.reference(),
            session_id = %context.session_id(),
            "Entered same-process frame"
        );
        return Ok(Scope::node(context.clone(), object_id));
    }

    let Some(frame_id) = node.frame_id else {
        return Err(Error::frame_not_found(frame.reference(), None));
    };
    let target_id = TargetId::from(&frame_id);
    let router = context.router();

    let session = match router.session_for_target(&target_id) {
        Some(session) => session,
        None => {
            let is_frame_target = router
                .targets()
                .await?
                .iter()
                .any(|t| t.target_id == target_id && t.target_type == IFRAME_TARGET_TYPE);
            if !is_frame_target {
                return Err(Error::frame_not_found(frame.reference(), Some(frame_id)));
            }
            router
                .attach_to_target_from(&target_id, context.session_id())
                .await?
        }
    };

    let child = context.for_session(session.id().clone());
    let result: EvaluateResult = child
        .call(RuntimeCommand::Evaluate {
            expression: "document".to_string(),
            return_by_value: false,
            await_promise: false,
        })
        .await?;

    if let Some(exception) = result.exception_details {
        return Err(Error::script(exception.message()));
    }
    let Some(object_id) = result.result.object_id else {
        return Err(Error::frame_not_found(frame.reference(), Some(frame_id)));
    };

    debug!(
        frame = %frame.reference(),
        %target_id,
        session_id = %child.session_id(),
        "Entered out-of-process frame"
    );
    Ok(Scope::node(child, object_id))
}
