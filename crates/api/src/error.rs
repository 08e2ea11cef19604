#![forbid(unsafe_code)]

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ct_core::payload::{PayloadError, ResolutionError};
use ct_storage::StoreError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    CrossTree(&'static str),
    #[error(transparent)]
    Resolution(ResolutionError),
    #[error("authentication required")]
    Unauthenticated,
    #[error("request deadline exceeded")]
    Timeout,
    #[error("storage failure: {0}")]
    Storage(#[source] StoreError),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::CrossTree(_) => StatusCode::CONFLICT,
            Self::Resolution(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::CrossTree(_) => "cross_tree",
            Self::Resolution(_) => "resolution_error",
            Self::Unauthenticated => "unauthenticated",
            Self::Timeout => "timeout",
            Self::Storage(_) => "storage_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidInput(message) => Self::Validation(message.to_string()),
            StoreError::UnknownTree => Self::NotFound("tree not found"),
            StoreError::UnknownNode => Self::NotFound("node not found"),
            StoreError::UnknownAnnotation => Self::NotFound("annotation not found"),
            StoreError::Payload(err) => err.into(),
            StoreError::DeadlineExceeded => Self::Timeout,
            other @ (StoreError::Io(_) | StoreError::Sql(_)) => Self::Storage(other),
        }
    }
}

impl From<PayloadError> for ApiError {
    fn from(err: PayloadError) -> Self {
        match err {
            PayloadError::Resolution(err) => Self::Resolution(err),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Storage(err) => {
                tracing::error!(error = %err, "card tree storage failure");
                "storage failure".to_string()
            }
            Self::Internal(detail) => {
                tracing::error!(detail = detail.as_str(), "card tree request failed");
                "internal failure".to_string()
            }
            Self::Resolution(err) => {
                tracing::warn!(tree = err.tree(), error = %err, "tree payload rejected");
                self.to_string()
            }
            _ => self.to_string(),
        };
        let body = json!({
            "error": {
                "code": self.code(),
                "message": message,
            }
        });
        (self.status(), Json(body)).into_response()
    }
}
