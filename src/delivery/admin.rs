//! Admin endpoints for the catalog, the ad pool and viewer accounts.
//!
//! Every handler authenticates first, so a bad token is reported before a
//! bad body.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use bytes::Bytes;
use serde_json::json;
use tracing::info;

use crate::catalog::ads::{AdPatch, NewAd};
use crate::catalog::videos::{NewVideo, VideoPatch};
use crate::catalog::viewers::ViewerPatch;
use crate::control::lifecycle;
use crate::core::error::{ApiError, CatalogError};
use crate::core::security::validate_title;
use crate::core::types::{AdId, ViewerId};
use crate::storage::ContentStore;

use super::extract::require_admin;
use super::response::{parse_json, parse_video_id};
use super::router::AppState;

// ---------------------------------------------------------------------------
// Videos
// ---------------------------------------------------------------------------

/// `POST /videos`
///
/// The content location must already exist in the content store.
pub async fn create_video<S: ContentStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    require_admin(&state, &headers)?;
    let req: NewVideo = parse_json(&body)?;
    req.validate().map_err(ApiError::invalid)?;
    if !state.store.exists(&req.content_location).await {
        return Err(ApiError::invalid(format!(
            "No video file at content location '{}'",
            req.content_location
        )));
    }

    let video = state.catalog.videos.insert(req.into_video());
    info!(video_id = %video.id, title = %video.title, "video created");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "video": video })),
    )
        .into_response())
}

/// `PUT /videos/{id}`
pub async fn update_video<S: ContentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    require_admin(&state, &headers)?;
    let video_id = parse_video_id(&id)?;
    let patch: VideoPatch = parse_json(&body)?;
    patch.validate().map_err(ApiError::invalid)?;
    if let Some(location) = &patch.content_location {
        if !state.store.exists(location).await {
            return Err(ApiError::invalid(format!(
                "No video file at content location '{location}'"
            )));
        }
    }

    let video = state.catalog.videos.update(video_id, patch)?;
    info!(%video_id, "video updated");
    Ok(Json(json!({ "success": true, "video": video })).into_response())
}

/// `DELETE /videos/{id}`
pub async fn delete_video<S: ContentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    require_admin(&state, &headers)?;
    let video_id = parse_video_id(&id)?;
    lifecycle::delete_video(&state.catalog, state.store.as_ref(), video_id).await?;
    Ok(Json(json!({ "success": true, "message": "Video deleted successfully" })).into_response())
}

/// `PATCH /videos/{id}/publish`
pub async fn toggle_publish<S: ContentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    require_admin(&state, &headers)?;
    let video = state.catalog.videos.toggle_publish(parse_video_id(&id)?)?;
    info!(video_id = %video.id, published = video.is_published, "publish state toggled");

    let message = if video.is_published {
        "Video published"
    } else {
        "Video unpublished"
    };
    Ok(Json(json!({ "success": true, "message": message, "video": video })).into_response())
}

// ---------------------------------------------------------------------------
// Ads
// ---------------------------------------------------------------------------

fn parse_ad_id(raw: &str) -> Result<AdId, ApiError> {
    raw.parse().map_err(|_| ApiError::not_found("Ad not found"))
}

/// `GET /ads`
pub async fn list_ads<S: ContentStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    require_admin(&state, &headers)?;
    let ads = state.catalog.ads.list();
    Ok(Json(json!({ "success": true, "count": ads.len(), "ads": ads })).into_response())
}

/// `POST /ads`
pub async fn create_ad<S: ContentStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    require_admin(&state, &headers)?;
    let req: NewAd = parse_json(&body)?;
    req.validate().map_err(ApiError::invalid)?;
    validate_title(&req.title).map_err(ApiError::invalid)?;

    let ad = state.catalog.ads.insert(req.into_ad());
    info!(ad_id = %ad.id, placement = %ad.placement, "ad created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "ad": ad })),
    )
        .into_response())
}

/// `PUT /ads/{id}`
pub async fn update_ad<S: ContentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    require_admin(&state, &headers)?;
    let ad_id = parse_ad_id(&id)?;
    let patch: AdPatch = parse_json(&body)?;
    if let Some(title) = &patch.title {
        validate_title(title).map_err(ApiError::invalid)?;
    }

    let ad = state.catalog.ads.update(ad_id, patch)?;
    Ok(Json(json!({ "success": true, "ad": ad })).into_response())
}

/// `DELETE /ads/{id}`
pub async fn delete_ad<S: ContentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    require_admin(&state, &headers)?;
    let ad = state.catalog.ads.remove(parse_ad_id(&id)?)?;
    info!(ad_id = %ad.id, "ad deleted");
    Ok(Json(json!({ "success": true, "message": "Ad deleted successfully" })).into_response())
}

// ---------------------------------------------------------------------------
// Viewer accounts
// ---------------------------------------------------------------------------

fn parse_viewer_id(raw: &str) -> Result<ViewerId, ApiError> {
    raw.parse().map_err(|_| ApiError::not_found("User not found"))
}

/// A missing account is a 404 here, not the 401 a stale session gets.
fn user_error(e: CatalogError) -> ApiError {
    match e {
        CatalogError::ViewerNotFound { .. } => ApiError::not_found("User not found"),
        other => other.into(),
    }
}

/// `GET /users`
pub async fn list_users<S: ContentStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    require_admin(&state, &headers)?;
    let users = state.catalog.viewers.list();
    Ok(Json(json!({ "success": true, "count": users.len(), "users": users })).into_response())
}

/// `GET /users/{id}`
pub async fn get_user<S: ContentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    require_admin(&state, &headers)?;
    let user = state
        .catalog
        .viewers
        .get(parse_viewer_id(&id)?)
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(json!({ "success": true, "user": user })).into_response())
}

/// `PUT /users/{id}`
pub async fn update_user<S: ContentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    require_admin(&state, &headers)?;
    let viewer_id = parse_viewer_id(&id)?;
    let patch: ViewerPatch = parse_json(&body)?;
    patch.validate().map_err(ApiError::invalid)?;

    let user = state
        .catalog
        .viewers
        .update(viewer_id, patch)
        .map_err(user_error)?;
    info!(%viewer_id, subscription = %user.subscription, "viewer updated");
    Ok(Json(json!({ "success": true, "user": user })).into_response())
}

/// `DELETE /users/{id}`
///
/// Watch history and sessions go with the account; purchases are kept.
pub async fn delete_user<S: ContentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    require_admin(&state, &headers)?;
    lifecycle::delete_viewer(&state.catalog, &state.auth, parse_viewer_id(&id)?)
        .map_err(user_error)?;
    Ok(Json(json!({ "success": true, "message": "User deleted successfully" })).into_response())
}
