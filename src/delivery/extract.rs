use axum::http::{header, HeaderMap};
use tracing::debug;

use crate::core::auth::TokenStatus;
use crate::core::error::ApiError;
use crate::core::redact::redact_session_token;
use crate::core::types::Viewer;
use crate::storage::ContentStore;

use super::router::AppState;

// ---------------------------------------------------------------------------
// Auth helpers
// ---------------------------------------------------------------------------

/// The token of an `Authorization: Bearer <token>` header, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve the signed-in viewer, treating anything unrecognised as anonymous.
pub fn optional_viewer<S: ContentStore>(state: &AppState<S>, headers: &HeaderMap) -> Option<Viewer> {
    let token = bearer_token(headers)?;
    let viewer = state
        .auth
        .resolve_viewer(token)
        .and_then(|id| state.catalog.viewers.get(id));
    if viewer.is_none() {
        debug!(
            token = %redact_session_token(token),
            "unrecognised session token, continuing anonymously"
        );
    }
    viewer
}

/// Resolve the signed-in viewer or fail with 401.
pub fn require_viewer<S: ContentStore>(
    state: &AppState<S>,
    headers: &HeaderMap,
) -> Result<Viewer, ApiError> {
    let Some(token) = bearer_token(headers) else {
        return Err(ApiError::auth_required("Not authorized, no token"));
    };
    state
        .auth
        .resolve_viewer(token)
        .and_then(|id| state.catalog.viewers.get(id))
        .ok_or_else(|| {
            debug!(token = %redact_session_token(token), "viewer auth failed");
            ApiError::auth_required("Not authorized, token failed")
        })
}

/// Authenticate admin requests: missing token is 401, wrong token is 403.
pub fn require_admin<S: ContentStore>(
    state: &AppState<S>,
    headers: &HeaderMap,
) -> Result<(), ApiError> {
    match state.auth.check_admin_token(bearer_token(headers)) {
        TokenStatus::Valid => Ok(()),
        TokenStatus::Missing => Err(ApiError::auth_required(
            "Missing or invalid Authorization header.",
        )),
        TokenStatus::Forbidden => Err(ApiError::Forbidden {
            message: "Invalid bearer token.".to_string(),
            ppv_price: None,
        }),
    }
}
