//! Node resolution pipeline.
//!
//! `describeNode` (always with `pierce`) exposes shadow-root and frame
//! metadata; `resolveNode`, keyed by backend reference, turns a described
//! node into an object handle in a given session.

// ============================================================================
// Imports
// ============================================================================

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::{BackendNodeId, NodeRef, RemoteObjectId};
use crate::protocol::{DescribeNodeResult, DomCommand, Node, ResolveNodeResult, ShadowRootMode};
use crate::session::RoutingContext;

use super::element::Element;
use super::shadow_root::ShadowRoot;

// ============================================================================
// Pipeline Steps
// ============================================================================

/// Describes a node, piercing shadow roots and frames.
///
/// # Errors
///
/// [`Error::StaleReference`] naming `reference` if the browser no longer
/// knows it.
pub async fn describe_node(context: &RoutingContext, reference: &NodeRef, depth: i32) -> Result<Node> {
    let (object_id, backend_node_id) = match reference {
        NodeRef::Object(id) => (Some(id.clone()), None),
        NodeRef::Backend(id) => (None, Some(*id)),
    };

    let result: DescribeNodeResult = context
        .call(DomCommand::DescribeNode {
            object_id,
            backend_node_id,
            depth,
            pierce: true,
        })
        .await
        .map_err(|e| e.into_stale(reference))?;

    Ok(result.node)
}

/// Resolves a backend reference to an object handle in `context`'s session.
///
/// # Errors
///
/// [`Error::StaleReference`] naming the backend reference if the node is
/// gone or yields no handle.
pub async fn resolve_node(context: &RoutingContext, backend_node_id: BackendNodeId) -> Result<RemoteObjectId> {
    let reference = NodeRef::Backend(backend_node_id);

    let result: ResolveNodeResult = context
        .call(DomCommand::ResolveNode { backend_node_id })
        .await
        .map_err(|e| e.into_stale(&reference))?;

    result.object.object_id.ok_or_else(|| {
        Error::stale(
            reference,
            context.session_id().clone(),
            "resolveNode returned no object handle",
        )
    })
}

// ============================================================================
// Shadow Roots
// ============================================================================

/// Resolves every shadow root hosted by `host`, in description order.
///
/// Descriptors without a backend reference are skipped; a descriptor
/// without a mode tag is treated as open.
pub(crate) async fn shadow_roots(host: &Element) -> Result<Vec<ShadowRoot>> {
    let context = host.context();
    let node = describe_node(context, &host.reference(), 1).await?;

    let mut roots = Vec::with_capacity(node.shadow_roots.len());
    for descriptor in node.shadow_roots {
        let Some(backend_node_id) = descriptor.backend_node_id else {
            trace!(host = %host.reference(), "Skipping shadow root without backend reference");
            continue;
        };
        let mode = descriptor.shadow_root_type.unwrap_or(ShadowRootMode::Open);
        let object_id = resolve_node(context, backend_node_id).await?;

        roots.push(ShadowRoot::new(object_id, mode, backend_node_id, host.clone()));
    }

    debug!(
        host = %host.reference(),
        session_id = %context.session_id(),
        count = roots.len(),
        "Resolved shadow roots"
    );
    Ok(roots)
}

// ============================================================================
// Tests
// ============================================================================
