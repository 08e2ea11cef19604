#![forbid(unsafe_code)]

use super::parse_id;
use crate::auth::ActingUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::views::TreeView;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use ct_core::payload::{PayloadError, TreePayload, parse_tree_payload};
use ct_core::{ScopeType, assemble_tree};
use ct_storage::{ApplyTreePayloadRequest, ListTreesRequest};
use serde_json::Value;

/// Accepts the batch document itself or the form-field flavour where the
/// document arrives as a JSON string.
fn decode_post_payload(body: &[u8]) -> Result<Option<TreePayload>, ApiError> {
    let raw = std::str::from_utf8(body)
        .map_err(|_| ApiError::Validation("request body must be UTF-8".to_string()))?;
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(raw)
        .map_err(|err| ApiError::from(PayloadError::Malformed(err.to_string())))?;
    let payload = match value {
        Value::Null => None,
        Value::String(inner) => parse_tree_payload(&inner)?,
        _ => parse_tree_payload(raw)?,
    };
    Ok(payload)
}

pub(crate) async fn apply_post_payload(
    State(state): State<AppState>,
    Path(raw_post_id): Path<String>,
    ActingUser(user): ActingUser,
    body: Bytes,
) -> Result<(StatusCode, Json<Vec<TreeView>>), ApiError> {
    let post_id: i64 = parse_id(&raw_post_id, "post")?;
    let Some(payload) = decode_post_payload(&body)? else {
        return Ok((StatusCode::OK, Json(Vec::new())));
    };

    let trees = state
        .with_store(move |store, deadline| {
            Ok(store.apply_tree_payload(
                deadline,
                ApplyTreePayloadRequest {
                    scope_type: ScopeType::Post,
                    scope_id: post_id,
                    source_post_id: Some(post_id),
                    created_by: user,
                    payload,
                },
            )?)
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(
            trees
                .into_iter()
                .map(|tree| TreeView::from(assemble_tree(tree)))
                .collect(),
        ),
    ))
}

pub(crate) async fn list_post_trees(
    State(state): State<AppState>,
    Path(raw_post_id): Path<String>,
) -> Result<Json<Vec<TreeView>>, ApiError> {
    let post_id: i64 = parse_id(&raw_post_id, "post")?;
    let trees = state
        .with_store(move |store, deadline| {
            Ok(store.list_trees(
                deadline,
                ListTreesRequest {
                    scope_type: ScopeType::Post,
                    scope_id: post_id,
                    include_nodes: true,
                },
            )?)
        })
        .await?;

    Ok(Json(
        trees
            .into_iter()
            .map(|tree| TreeView::from(assemble_tree(tree)))
            .collect(),
    ))
}
