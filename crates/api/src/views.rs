#![forbid(unsafe_code)]

use ct_core::{AnnotationId, CardTree, CardTreeAnnotation, CardTreeNode, NodeId, TreeId};
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub(crate) fn ts_ms_to_rfc3339(ts_ms: i64) -> String {
    let nanos = i128::from(ts_ms) * 1_000_000;
    let dt = OffsetDateTime::from_unix_timestamp_nanos(nanos).unwrap_or(OffsetDateTime::UNIX_EPOCH);
    dt.format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[derive(Debug, Serialize)]
pub struct TreeView {
    pub id: TreeId,
    pub scope_type: &'static str,
    pub scope_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
    pub is_primary: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<NodeView>,
}

#[derive(Debug, Serialize)]
pub struct NodeView {
    pub id: NodeId,
    pub tree_id: TreeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    pub card_name: String,
    pub position: i64,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
    pub depth: usize,
    pub indent: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<AnnotationView>,
}

#[derive(Debug, Serialize)]
pub struct AnnotationView {
    pub id: AnnotationId,
    pub node_id: NodeId,
    pub kind: String,
    pub body: String,
    pub label: Option<String>,
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_post_id: Option<i64>,
    pub created_by: String,
    pub created_at: String,
}

impl From<CardTree> for TreeView {
    fn from(tree: CardTree) -> Self {
        Self {
            id: tree.id,
            scope_type: tree.scope_type.as_str(),
            scope_id: tree.scope_id,
            title: tree.title,
            description: tree.description,
            created_by: tree.created_by,
            created_at: ts_ms_to_rfc3339(tree.created_at_ms),
            updated_at: ts_ms_to_rfc3339(tree.updated_at_ms),
            is_primary: tree.is_primary,
            nodes: tree.nodes.into_iter().map(NodeView::from).collect(),
        }
    }
}

impl From<CardTreeNode> for NodeView {
    fn from(node: CardTreeNode) -> Self {
        Self {
            id: node.id,
            tree_id: node.tree_id,
            parent_id: node.parent_id,
            card_name: node.card_name,
            position: node.position,
            created_by: node.created_by,
            created_at: ts_ms_to_rfc3339(node.created_at_ms),
            updated_at: ts_ms_to_rfc3339(node.updated_at_ms),
            depth: node.depth,
            indent: node.indent,
            annotations: node
                .annotations
                .into_iter()
                .map(AnnotationView::from)
                .collect(),
        }
    }
}

impl From<CardTreeAnnotation> for AnnotationView {
    fn from(annotation: CardTreeAnnotation) -> Self {
        Self {
            id: annotation.id,
            node_id: annotation.node_id,
            kind: annotation.kind,
            body: annotation.body,
            label: annotation.label,
            tags: annotation.tags,
            source_post_id: annotation.source_post_id,
            created_by: annotation.created_by,
            created_at: ts_ms_to_rfc3339(annotation.created_at_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millisecond_timestamps_render_as_rfc3339() {
        assert_eq!(ts_ms_to_rfc3339(0), "1970-01-01T00:00:00Z");
        assert_eq!(ts_ms_to_rfc3339(1_700_000_000_123), "2023-11-14T22:13:20.123Z");
    }
}
