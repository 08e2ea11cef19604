#![forbid(unsafe_code)]

use super::{parse_body, parse_id};
use crate::auth::ActingUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::views::TreeView;
use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use ct_core::{ScopeType, TreeId, assemble_tree};
use ct_storage::{CreateTreeRequest, ListTreesRequest};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct TreeCreateBody {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    is_primary: bool,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListTreesQuery {
    #[serde(default)]
    include_nodes: bool,
}

pub(crate) async fn list_board_trees(
    state: State<AppState>,
    path: Path<String>,
    query: Result<Query<ListTreesQuery>, QueryRejection>,
) -> Result<Json<Vec<TreeView>>, ApiError> {
    list_scope_trees(state, ScopeType::Board, path, query).await
}

pub(crate) async fn create_board_tree(
    state: State<AppState>,
    path: Path<String>,
    user: ActingUser,
    body: Bytes,
) -> Result<(StatusCode, Json<TreeView>), ApiError> {
    create_scope_tree(state, ScopeType::Board, path, user, body).await
}

pub(crate) async fn list_thread_trees(
    state: State<AppState>,
    path: Path<String>,
    query: Result<Query<ListTreesQuery>, QueryRejection>,
) -> Result<Json<Vec<TreeView>>, ApiError> {
    list_scope_trees(state, ScopeType::Thread, path, query).await
}

pub(crate) async fn create_thread_tree(
    state: State<AppState>,
    path: Path<String>,
    user: ActingUser,
    body: Bytes,
) -> Result<(StatusCode, Json<TreeView>), ApiError> {
    create_scope_tree(state, ScopeType::Thread, path, user, body).await
}

async fn list_scope_trees(
    State(state): State<AppState>,
    scope_type: ScopeType,
    Path(raw_scope_id): Path<String>,
    query: Result<Query<ListTreesQuery>, QueryRejection>,
) -> Result<Json<Vec<TreeView>>, ApiError> {
    let scope_id: i64 = parse_id(&raw_scope_id, scope_type.as_str())?;
    let Query(query) =
        query.map_err(|err| ApiError::Validation(format!("invalid query: {err}")))?;

    let trees = state
        .with_store(move |store, deadline| {
            Ok(store.list_trees(
                deadline,
                ListTreesRequest {
                    scope_type,
                    scope_id,
                    include_nodes: query.include_nodes,
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

async fn create_scope_tree(
    State(state): State<AppState>,
    scope_type: ScopeType,
    Path(raw_scope_id): Path<String>,
    ActingUser(user): ActingUser,
    body: Bytes,
) -> Result<(StatusCode, Json<TreeView>), ApiError> {
    let scope_id: i64 = parse_id(&raw_scope_id, scope_type.as_str())?;
    let body: TreeCreateBody = parse_body(&body)?;
    if body.title.trim().is_empty() {
        return Err(ApiError::Validation("title is required".to_string()));
    }

    let tree = state
        .with_store(move |store, deadline| {
            Ok(store.create_tree(
                deadline,
                CreateTreeRequest {
                    scope_type,
                    scope_id,
                    title: body.title,
                    description: body.description,
                    created_by: user,
                    is_primary: body.is_primary,
                },
            )?)
        })
        .await?;

    Ok((StatusCode::CREATED, Json(TreeView::from(tree))))
}

pub(crate) async fn get_tree(
    State(state): State<AppState>,
    Path(raw_tree_id): Path<String>,
) -> Result<Json<TreeView>, ApiError> {
    let tree_id: TreeId = parse_id(&raw_tree_id, "tree")?;
    let tree = state
        .with_store(move |store, deadline| Ok(store.get_tree(deadline, tree_id)?))
        .await?;
    Ok(Json(TreeView::from(assemble_tree(tree))))
}
