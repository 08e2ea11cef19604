#![forbid(unsafe_code)]

use super::{ensure_node_in_tree, ensure_parent_in_tree, parse_body, parse_id};
use crate::auth::ActingUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::views::NodeView;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use ct_core::{NodeId, TreeId};
use ct_storage::{CreateNodeRequest, StoreError, UpdateNodeRequest};
use serde::Deserialize;

/// Shared by create and update; both replace every field.
#[derive(Debug, Deserialize)]
pub(crate) struct NodeBody {
    #[serde(default)]
    parent_id: Option<NodeId>,
    #[serde(default)]
    card_name: String,
    #[serde(default)]
    position: i64,
}

impl NodeBody {
    fn validate(&self) -> Result<(), ApiError> {
        if self.card_name.trim().is_empty() {
            return Err(ApiError::Validation("card name is required".to_string()));
        }
        Ok(())
    }
}

pub(crate) async fn create_node(
    State(state): State<AppState>,
    Path(raw_tree_id): Path<String>,
    ActingUser(user): ActingUser,
    body: Bytes,
) -> Result<(StatusCode, Json<NodeView>), ApiError> {
    let tree_id: TreeId = parse_id(&raw_tree_id, "tree")?;
    let body: NodeBody = parse_body(&body)?;
    body.validate()?;

    let node = state
        .with_store(move |store, deadline| {
            if let Some(parent_id) = body.parent_id {
                // Report the missing tree before judging the parent.
                if !store.tree_exists(deadline, tree_id)? {
                    return Err(StoreError::UnknownTree.into());
                }
                ensure_parent_in_tree(store, deadline, tree_id, parent_id)?;
            }
            Ok(store.create_node(
                deadline,
                CreateNodeRequest {
                    tree_id,
                    parent_id: body.parent_id,
                    card_name: body.card_name,
                    position: body.position,
                    created_by: user,
                },
            )?)
        })
        .await?;

    Ok((StatusCode::CREATED, Json(NodeView::from(node))))
}

pub(crate) async fn update_node(
    State(state): State<AppState>,
    Path((raw_tree_id, raw_node_id)): Path<(String, String)>,
    ActingUser(user): ActingUser,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let tree_id: TreeId = parse_id(&raw_tree_id, "tree")?;
    let node_id: NodeId = parse_id(&raw_node_id, "node")?;
    let body: NodeBody = parse_body(&body)?;
    body.validate()?;

    state
        .with_store(move |store, deadline| {
            ensure_node_in_tree(store, deadline, tree_id, node_id)?;
            if let Some(parent_id) = body.parent_id {
                if parent_id == node_id {
                    return Err(ApiError::Validation(
                        "node cannot be its own parent".to_string(),
                    ));
                }
                ensure_parent_in_tree(store, deadline, tree_id, parent_id)?;
                if store.node_ancestors(deadline, parent_id)?.contains(&node_id) {
                    return Err(ApiError::Validation(
                        "parent must not be a descendant of the node".to_string(),
                    ));
                }
            }
            store.update_node(
                deadline,
                UpdateNodeRequest {
                    node_id,
                    parent_id: body.parent_id,
                    card_name: body.card_name,
                    position: body.position,
                },
            )?;
            Ok(())
        })
        .await?;

    tracing::info!(tree_id = %tree_id, node_id = %node_id, user = user.as_str(), "card tree node updated");
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn delete_node(
    State(state): State<AppState>,
    Path((raw_tree_id, raw_node_id)): Path<(String, String)>,
    ActingUser(_user): ActingUser,
) -> Result<StatusCode, ApiError> {
    let tree_id: TreeId = parse_id(&raw_tree_id, "tree")?;
    let node_id: NodeId = parse_id(&raw_node_id, "node")?;

    state
        .with_store(move |store, deadline| {
            ensure_node_in_tree(store, deadline, tree_id, node_id)?;
            Ok(store.delete_node(deadline, node_id)?)
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
