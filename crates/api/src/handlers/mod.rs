#![forbid(unsafe_code)]

pub(crate) mod annotations;
pub(crate) mod nodes;
pub(crate) mod posts;
pub(crate) mod trees;

use crate::error::ApiError;
use axum::Json;
use axum::body::Bytes;
use ct_core::{Deadline, NodeId, TreeId};
use ct_storage::{SqliteStore, StoreError};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

pub(crate) async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) fn parse_id<T: From<i64>>(raw: &str, what: &'static str) -> Result<T, ApiError> {
    raw.trim()
        .parse::<i64>()
        .map(T::from)
        .map_err(|_| ApiError::Validation(format!("invalid {what} id")))
}

pub(crate) fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|err| ApiError::Validation(format!("invalid request body: {err}")))
}

/// Path-addressed node must live in the path's tree.
pub(crate) fn ensure_node_in_tree(
    store: &SqliteStore,
    deadline: &Deadline,
    tree_id: TreeId,
    node_id: NodeId,
) -> Result<(), ApiError> {
    let owner = store.node_tree_id(deadline, node_id)?;
    if owner != tree_id {
        return Err(ApiError::CrossTree("node does not belong to tree"));
    }
    Ok(())
}

/// Checks a requested parent for a node of `tree_id`: it must exist and live
/// in the same tree.
pub(crate) fn ensure_parent_in_tree(
    store: &SqliteStore,
    deadline: &Deadline,
    tree_id: TreeId,
    parent_id: NodeId,
) -> Result<(), ApiError> {
    let owner = store
        .node_tree_id(deadline, parent_id)
        .map_err(|err| match err {
            StoreError::UnknownNode => ApiError::NotFound("parent node not found"),
            other => other.into(),
        })?;
    if owner != tree_id {
        return Err(ApiError::CrossTree("parent node belongs to another tree"));
    }
    Ok(())
}
