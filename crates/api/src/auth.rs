#![forbid(unsafe_code)]

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Username verified upstream and forwarded in the configured header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActingUser(pub String);

#[axum::async_trait]
impl FromRequestParts<AppState> for ActingUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(&state.config().user_header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|user| !user.is_empty())
            .map(|user| Self(user.to_string()))
            .ok_or(ApiError::Unauthenticated)
    }
}
