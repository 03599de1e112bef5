//! Typed result payloads.
//!
//! Only the fields the client reads are modelled; unknown fields are
//! ignored on deserialization.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::identifiers::{BackendNodeId, FrameId, RemoteObjectId, SessionId, TargetId};

// ============================================================================
// Node
// ============================================================================

/// A DOM node description as returned by `DOM.describeNode`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Tracking-domain id (zero unless the DOM domain is enabled).
    #[serde(default)]
    pub node_id: i64,
    /// Stable backend reference.
    pub backend_node_id: Option<BackendNodeId>,
    /// DOM node type.
    #[serde(default)]
    pub node_type: i64,
    /// Node name (upper-case for HTML elements).
    #[serde(default)]
    pub node_name: String,
    /// Local name.
    #[serde(default)]
    pub local_name: String,
    /// Flattened `[name, value, name, value, ...]` attribute list.
    #[serde(default)]
    pub attributes: Vec<String>,
    /// Shadow roots hosted by this node, in description order.
    #[serde(default)]
    pub shadow_roots: Vec<Node>,
    /// Mode tag when this node is itself a shadow root.
    pub shadow_root_type: Option<ShadowRootMode>,
    /// Frame id when this node is a frame owner.
    pub frame_id: Option<FrameId>,
    /// Content document of a same-process frame.
    pub content_document: Option<Box<Node>>,
    /// Described children.
    #[serde(default)]
    pub children: Vec<Node>,
    /// Document URL for document nodes.
    #[serde(rename = "documentURL")]
    pub document_url: Option<String>,
}

impl Node {
    /// Returns an attribute value by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .chunks_exact(2)
            .find(|pair| pair[0] == name)
            .map(|pair| pair[1].as_str())
    }

    /// Returns attributes as `(name, value)` pairs.
    #[must_use]
    pub fn attribute_pairs(&self) -> Vec<(String, String)> {
        self.attributes
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect()
    }

    /// Returns `true` for `<iframe>` and `<frame>` elements.
    #[inline]
    #[must_use]
    pub fn is_frame_owner(&self) -> bool {
        self.node_name.eq_ignore_ascii_case("iframe") || self.node_name.eq_ignore_ascii_case("frame")
    }
}

// ============================================================================
// ShadowRootMode
// ============================================================================

/// Access mode of a shadow root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum ShadowRootMode {
    /// Script-accessible through `element.shadowRoot`.
    #[serde(rename = "open")]
    Open,
    /// Hidden from page script.
    #[serde(rename = "closed")]
    Closed,
    /// Engine-internal root (form controls, media elements).
    #[serde(rename = "user-agent")]
    UserAgent,
}

impl ShadowRootMode {
    /// Returns the wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::UserAgent => "user-agent",
        }
    }
}

impl fmt::Display for ShadowRootMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Runtime Payloads
// ============================================================================

/// Mirror of a script value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    /// Value type (`object`, `string`, `undefined`, ...).
    #[serde(rename = "type", default)]
    pub object_type: String,
    /// Object subtype (`node`, `null`, `array`, ...).
    pub subtype: Option<String>,
    /// Constructor name.
    pub class_name: Option<String>,
    /// Value for primitives or by-value results.
    pub value: Option<Value>,
    /// Handle for non-primitive values.
    pub object_id: Option<RemoteObjectId>,
    /// String representation.
    pub description: Option<String>,
}

impl RemoteObject {
    /// Returns `true` for `null` and `undefined`.
    #[inline]
    #[must_use]
    pub fn is_nullish(&self) -> bool {
        self.object_type == "undefined" || self.subtype.as_deref() == Some("null")
    }
}

/// Result of `Runtime.evaluate` and `Runtime.callFunctionOn`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResult {
    /// Evaluation result.
    #[serde(default)]
    pub result: RemoteObject,
    /// Present when the script threw.
    pub exception_details: Option<ExceptionDetails>,
}

/// Details of a thrown exception.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    /// Short message.
    #[serde(default)]
    pub text: String,
    /// Thrown value.
    pub exception: Option<RemoteObject>,
    /// Line of the throw site.
    #[serde(default)]
    pub line_number: i64,
    /// Column of the throw site.
    #[serde(default)]
    pub column_number: i64,
}

impl ExceptionDetails {
    /// Returns the most descriptive message available.
    #[must_use]
    pub fn message(&self) -> String {
        self.exception
            .as_ref()
            .and_then(|e| e.description.clone())
            .unwrap_or_else(|| self.text.clone())
    }
}

/// Result of `Runtime.getProperties`.
#[derive(Debug, Clone, Deserialize)]
pub struct PropertiesResult {
    /// Property descriptors.
    #[serde(default)]
    pub result: Vec<PropertyDescriptor>,
}

/// One object property.
#[derive(Debug, Clone, Deserialize)]
pub struct PropertyDescriptor {
    /// Property name.
    pub name: String,
    /// Property value.
    pub value: Option<RemoteObject>,
    /// Whether the property is enumerable.
    #[serde(default)]
    pub enumerable: bool,
}

// ============================================================================
// DOM Payloads
// ============================================================================

/// Result of `DOM.describeNode`.
#[derive(Debug, Clone, Deserialize)]
pub struct DescribeNodeResult {
    /// Described node.
    pub node: Node,
}

/// Result of `DOM.resolveNode`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolveNodeResult {
    /// Handle to the node.
    pub object: RemoteObject,
}

/// Result of `DOM.getOuterHTML`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OuterHtmlResult {
    /// Serialized markup.
    pub outer_html: String,
}

/// Result of `DOM.getBoxModel`.
#[derive(Debug, Clone, Deserialize)]
pub struct BoxModelResult {
    /// Box model.
    pub model: BoxModel,
}

/// CSS box model of a node, in its own viewport's coordinates.
#[derive(Debug, Clone, Deserialize)]
pub struct BoxModel {
    /// Content box.
    pub content: Quad,
    /// Padding box.
    pub padding: Quad,
    /// Border box.
    pub border: Quad,
    /// Margin box.
    pub margin: Quad,
    /// Node width.
    pub width: f64,
    /// Node height.
    pub height: f64,
}

/// Four points `[x1, y1, x2, y2, x3, y3, x4, y4]`, clockwise.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Quad(pub Vec<f64>);

impl Quad {
    /// Returns the centre point.
    #[must_use]
    pub fn center(&self) -> Option<(f64, f64)> {
        if self.0.len() < 8 {
            return None;
        }
        let xs = self.0.iter().step_by(2);
        let ys = self.0.iter().skip(1).step_by(2);
        Some((xs.sum::<f64>() / 4.0, ys.sum::<f64>() / 4.0))
    }

    /// Returns the axis-aligned bounding rectangle.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        if self.0.len() < 8 {
            return None;
        }
        let xs: Vec<f64> = self.0.iter().step_by(2).copied().collect();
        let ys: Vec<f64> = self.0.iter().skip(1).step_by(2).copied().collect();
        let min_x = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let max_x = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min_y = ys.iter().copied().fold(f64::INFINITY, f64::min);
        let max_y = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Rect {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        })
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

// ============================================================================
// Target Payloads
// ============================================================================

/// Description of a browser target.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetInfo {
    /// Target id.
    pub target_id: TargetId,
    /// Target type (`page`, `iframe`, `worker`, ...).
    #[serde(rename = "type")]
    pub target_type: String,
    /// Title.
    pub title: String,
    /// URL.
    pub url: String,
    /// Whether a client is attached.
    pub attached: bool,
    /// Opener target.
    pub opener_id: Option<TargetId>,
}

/// Result of `Target.getTargets`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfosResult {
    /// Known targets.
    #[serde(default)]
    pub target_infos: Vec<TargetInfo>,
}

/// Result of `Target.attachToTarget`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachResult {
    /// New flattened session.
    pub session_id: SessionId,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_with_shadow_roots() {
        let json_str = r##"{
            "nodeId": 0,
            "backendNodeId": 10,
            "nodeType": 1,
            "nodeName": "DIV",
            "localName": "div",
            "attributes": ["id", "host", "class", "a b"],
            "shadowRoots": [
                { "backendNodeId": 11, "nodeType": 11, "nodeName": "#document-fragment", "shadowRootType": "user-agent" },
                { "backendNodeId": 12, "nodeType": 11, "nodeName": "#document-fragment", "shadowRootType": "closed" }
            ]
        }"##;

        let node: Node = serde_json::from_str(json_str).expect("parse");
        assert_eq!(node.backend_node_id, Some(BackendNodeId::new(10)));
        assert_eq!(node.attribute("class"), Some("a b"));
        assert_eq!(node.attribute("missing"), None);
        assert_eq!(node.shadow_roots.len(), 2);
        assert_eq!(node.shadow_roots[0].shadow_root_type, Some(ShadowRootMode::UserAgent));
        assert_eq!(node.shadow_roots[1].shadow_root_type, Some(ShadowRootMode::Closed));
    }

    #[test]
    fn test_frame_owner_detection() {
        let node: Node = serde_json::from_str(
            r#"{ "backendNodeId": 5, "nodeName": "IFRAME", "frameId": "F1" }"#,
        )
        .expect("parse");
        assert!(node.is_frame_owner());
        assert!(node.content_document.is_none());
        assert_eq!(node.frame_id, Some(FrameId::new("F1")));
    }

    #[test]
    fn test_quad_center_and_bounds() {
        let quad = Quad(vec![10.0, 20.0, 30.0, 20.0, 30.0, 60.0, 10.0, 60.0]);
        assert_eq!(quad.center(), Some((20.0, 40.0)));

        let rect = quad.bounds().expect("bounds");
        assert_eq!(rect.x, 10.0);
        assert_eq!(rect.height, 40.0);

        assert_eq!(Quad(vec![1.0, 2.0]).center(), None);
    }

    #[test]
    fn test_nullish_remote_object() {
        let null: RemoteObject =
            serde_json::from_str(r#"{ "type": "object", "subtype": "null", "value": null }"#)
                .expect("parse");
        assert!(null.is_nullish());

        let node: RemoteObject = serde_json::from_str(
            r#"{ "type": "object", "subtype": "node", "objectId": "o-1", "className": "HTMLDivElement" }"#,
        )
        .expect("parse");
        assert!(!node.is_nullish());
        assert_eq!(node.object_id, Some(RemoteObjectId::new("o-1")));
    }

    #[test]
    fn test_target_info_defaults() {
        let info: TargetInfo =
            serde_json::from_str(r#"{ "targetId": "T1", "type": "page" }"#).expect("parse");
        assert_eq!(info.target_type, "page");
        assert!(info.url.is_empty());
        assert!(!info.attached);
    }
}
