#![forbid(unsafe_code)]

use super::{ensure_node_in_tree, parse_body, parse_id};
use crate::auth::ActingUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::views::AnnotationView;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use ct_core::{AnnotationId, NodeId, TreeId};
use ct_storage::CreateAnnotationRequest;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct AnnotationBody {
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    body: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    tags: Option<String>,
    #[serde(default)]
    source_post_id: Option<i64>,
}

pub(crate) async fn create_annotation(
    State(state): State<AppState>,
    Path((raw_tree_id, raw_node_id)): Path<(String, String)>,
    ActingUser(user): ActingUser,
    body: Bytes,
) -> Result<(StatusCode, Json<AnnotationView>), ApiError> {
    let tree_id: TreeId = parse_id(&raw_tree_id, "tree")?;
    let node_id: NodeId = parse_id(&raw_node_id, "node")?;
    let body: AnnotationBody = parse_body(&body)?;
    if body.body.trim().is_empty() {
        return Err(ApiError::Validation("body is required".to_string()));
    }

    let annotation = state
        .with_store(move |store, deadline| {
            ensure_node_in_tree(store, deadline, tree_id, node_id)?;
            Ok(store.create_annotation(
                deadline,
                CreateAnnotationRequest {
                    node_id,
                    kind: body.kind,
                    body: body.body,
                    label: body.label,
                    tags: body.tags,
                    source_post_id: body.source_post_id,
                    created_by: user,
                },
            )?)
        })
        .await?;

    Ok((StatusCode::CREATED, Json(AnnotationView::from(annotation))))
}

pub(crate) async fn delete_annotation(
    State(state): State<AppState>,
    Path((raw_tree_id, raw_node_id, raw_annotation_id)): Path<(String, String, String)>,
    ActingUser(_user): ActingUser,
) -> Result<StatusCode, ApiError> {
    let tree_id: TreeId = parse_id(&raw_tree_id, "tree")?;
    let node_id: NodeId = parse_id(&raw_node_id, "node")?;
    let annotation_id: AnnotationId = parse_id(&raw_annotation_id, "annotation")?;

    state
        .with_store(move |store, deadline| {
            ensure_node_in_tree(store, deadline, tree_id, node_id)?;
            if store.annotation_node_id(deadline, annotation_id)? != node_id {
                return Err(ApiError::CrossTree("annotation does not belong to node"));
            }
            Ok(store.delete_annotation(deadline, annotation_id)?)
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
