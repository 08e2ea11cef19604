#![forbid(unsafe_code)]

//! HTTP surface for card trees: routing, acting-user extraction, JSON views
//! and the mapping from store failures to client-facing errors.

pub mod auth;
pub mod config;
pub mod error;
mod handlers;
pub mod state;
pub mod views;

pub use config::ServerConfig;
pub use error::ApiError;
pub use state::AppState;

use axum::Router;
use axum::routing::{delete, get, patch, post};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub const DEFAULT_LOG_FILTER: &str = "ct_api=info,ct_storage=info,tower_http=info";

pub fn create_router(state: AppState) -> Router {
    let request_timeout = state.config().request_timeout;

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/boards/:board_id/trees",
            get(handlers::trees::list_board_trees).post(handlers::trees::create_board_tree),
        )
        .route(
            "/threads/:thread_id/trees",
            get(handlers::trees::list_thread_trees).post(handlers::trees::create_thread_tree),
        )
        .route(
            "/posts/:post_id/trees",
            get(handlers::posts::list_post_trees).post(handlers::posts::apply_post_payload),
        )
        .route("/trees/:tree_id", get(handlers::trees::get_tree))
        .route("/trees/:tree_id/nodes", post(handlers::nodes::create_node))
        .route(
            "/trees/:tree_id/nodes/:node_id",
            patch(handlers::nodes::update_node).delete(handlers::nodes::delete_node),
        )
        .route(
            "/trees/:tree_id/nodes/:node_id/annotations",
            post(handlers::annotations::create_annotation),
        )
        .route(
            "/trees/:tree_id/nodes/:node_id/annotations/:annotation_id",
            delete(handlers::annotations::delete_annotation),
        )
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
