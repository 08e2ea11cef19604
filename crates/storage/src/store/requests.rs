#![forbid(unsafe_code)]

use ct_core::payload::TreePayload;
use ct_core::{NodeId, ScopeType, TreeId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateTreeRequest {
    pub scope_type: ScopeType,
    pub scope_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_by: String,
    pub is_primary: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListTreesRequest {
    pub scope_type: ScopeType,
    pub scope_id: i64,
    pub include_nodes: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateNodeRequest {
    pub tree_id: TreeId,
    pub parent_id: Option<NodeId>,
    pub card_name: String,
    pub position: i64,
    pub created_by: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateNodeRequest {
    pub node_id: NodeId,
    pub parent_id: Option<NodeId>,
    pub card_name: String,
    pub position: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateAnnotationRequest {
    pub node_id: NodeId,
    pub kind: Option<String>,
    pub body: String,
    pub label: Option<String>,
    pub tags: Option<String>,
    pub source_post_id: Option<i64>,
    pub created_by: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplyTreePayloadRequest {
    pub scope_type: ScopeType,
    pub scope_id: i64,
    /// Stamped on every annotation the batch creates.
    pub source_post_id: Option<i64>,
    pub created_by: String,
    pub payload: TreePayload,
}
