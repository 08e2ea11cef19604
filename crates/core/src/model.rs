#![forbid(unsafe_code)]

use crate::ids::{AnnotationId, NodeId, TreeId};

pub const DEFAULT_ANNOTATION_KIND: &str = "note";

/// Owner of a card tree. Scope ids are opaque here; the forum owns them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScopeType {
    Board,
    Thread,
    Post,
}

impl ScopeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ScopeType::Board => "board",
            ScopeType::Thread => "thread",
            ScopeType::Post => "post",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown scope type {0:?}")]
pub struct UnknownScopeType(pub String);

impl std::str::FromStr for ScopeType {
    type Err = UnknownScopeType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "board" => Ok(Self::Board),
            "thread" => Ok(Self::Thread),
            "post" => Ok(Self::Post),
            other => Err(UnknownScopeType(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardTree {
    pub id: TreeId,
    pub scope_type: ScopeType,
    pub scope_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_by: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    /// Advisory only: several primary trees may share a scope.
    pub is_primary: bool,
    pub nodes: Vec<CardTreeNode>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardTreeNode {
    pub id: NodeId,
    pub tree_id: TreeId,
    pub parent_id: Option<NodeId>,
    pub card_name: String,
    pub position: i64,
    pub created_by: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    /// Filled in by the assembler; zero on freshly loaded rows.
    pub depth: usize,
    pub indent: usize,
    pub annotations: Vec<CardTreeAnnotation>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardTreeAnnotation {
    pub id: AnnotationId,
    pub node_id: NodeId,
    pub kind: String,
    pub body: String,
    pub label: Option<String>,
    pub tags: Option<String>,
    pub source_post_id: Option<i64>,
    pub created_by: String,
    pub created_at_ms: i64,
}

/// Trims `value` and maps an empty result to `None`.
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Annotation kinds are free-form; blank falls back to [`DEFAULT_ANNOTATION_KIND`].
pub fn normalize_kind(value: Option<&str>) -> String {
    normalize_optional(value).unwrap_or_else(|| DEFAULT_ANNOTATION_KIND.to_string())
}
