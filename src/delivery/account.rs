//! Viewer-scoped endpoints: pay-per-view, likes, my list, preferences and
//! watch history.
//!
//! All of these require a signed-in viewer.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Json, Response};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::access::entitlement::EntitlementGate;
use crate::catalog::videos::PublicVideo;
use crate::catalog::viewers::PreferencesPatch;
use crate::core::error::ApiError;
use crate::core::types::{VideoId, WatchHistoryEntry};
use crate::storage::ContentStore;

use super::extract::require_viewer;
use super::response::{parse_json, parse_video_id};
use super::router::AppState;

// ---------------------------------------------------------------------------
// Pay-per-view
// ---------------------------------------------------------------------------

/// `POST /ppv/{video_id}/purchase`
pub async fn purchase_ppv<S: ContentStore>(
    State(state): State<AppState<S>>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let viewer = require_viewer(&state, &headers)?;
    let video_id = parse_video_id(&video_id)?;
    let video = state
        .catalog
        .videos
        .get(video_id)
        .ok_or_else(|| ApiError::not_found("Video not found"))?;

    let record = EntitlementGate::new(&state.catalog.purchases).purchase(&viewer, &video)?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Successfully purchased access to \"{}\"", video.title),
        "price": record.price,
    }))
    .into_response())
}

/// `GET /ppv/{video_id}/access`
pub async fn check_ppv_access<S: ContentStore>(
    State(state): State<AppState<S>>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let viewer = require_viewer(&state, &headers)?;
    let video = state
        .catalog
        .videos
        .get_published(parse_video_id(&video_id)?)?;
    let has_access = EntitlementGate::new(&state.catalog.purchases)
        .check(Some(&viewer), &video)
        .is_granted();

    Ok(Json(json!({ "success": true, "hasAccess": has_access })).into_response())
}

/// `GET /ppv/purchases`
pub async fn list_purchases<S: ContentStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let viewer = require_viewer(&state, &headers)?;
    let purchases: Vec<serde_json::Value> = state
        .catalog
        .purchases
        .list_for_viewer(viewer.id)
        .into_iter()
        .map(|record| {
            let video = state.catalog.videos.get(record.video_id).map(|v| {
                json!({
                    "id": v.id,
                    "title": v.title,
                    "thumbnail": v.thumbnail,
                    "durationSecs": v.duration_secs,
                    "releaseYear": v.release_year,
                })
            });
            json!({
                "videoId": record.video_id,
                "video": video,
                "purchasedAt": record.purchased_at,
                "price": record.price,
            })
        })
        .collect();

    Ok(Json(json!({ "success": true, "purchases": purchases })).into_response())
}

// ---------------------------------------------------------------------------
// Likes and my list
// ---------------------------------------------------------------------------

/// `POST /videos/{id}/like`
pub async fn like_video<S: ContentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    require_viewer(&state, &headers)?;
    let likes = state.catalog.videos.like(parse_video_id(&id)?)?;
    Ok(Json(json!({ "success": true, "likes": likes })).into_response())
}

/// `POST /videos/{id}/add-to-list`
pub async fn add_to_list<S: ContentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let viewer = require_viewer(&state, &headers)?;
    let video = state.catalog.videos.get_published(parse_video_id(&id)?)?;
    state.catalog.viewers.add_to_list(viewer.id, video.id)?;
    Ok(Json(json!({ "success": true, "message": "Video added to your list" })).into_response())
}

/// `DELETE /videos/{id}/remove-from-list`
pub async fn remove_from_list<S: ContentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let viewer = require_viewer(&state, &headers)?;
    state
        .catalog
        .viewers
        .remove_from_list(viewer.id, parse_video_id(&id)?)?;
    Ok(Json(json!({ "success": true, "message": "Video removed from your list" })).into_response())
}

/// `GET /users/my-list`
///
/// Entries whose video was unpublished since being added are skipped.
pub async fn my_list<S: ContentStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let viewer = require_viewer(&state, &headers)?;
    let videos: Vec<_> = state
        .catalog
        .viewers
        .my_list(viewer.id)?
        .into_iter()
        .filter_map(|id| state.catalog.videos.get_published(id).ok())
        .collect();
    let public: Vec<PublicVideo<'_>> = videos.iter().map(PublicVideo::from).collect();

    Ok(Json(json!({ "success": true, "count": public.len(), "videos": public })).into_response())
}

/// `PUT /users/preferences`
pub async fn update_preferences<S: ContentStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let viewer = require_viewer(&state, &headers)?;
    let patch: PreferencesPatch = parse_json(&body)?;
    let preferences = state
        .catalog
        .viewers
        .update_preferences(viewer.id, patch)?;
    Ok(Json(json!({ "success": true, "preferences": preferences })).into_response())
}

// ---------------------------------------------------------------------------
// Watch history
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordProgressRequest {
    pub video_id: VideoId,
    #[serde(default)]
    pub progress: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProgressRequest {
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub completed: bool,
}

/// An entry joined with its (still published) video.
fn history_json<S: ContentStore>(
    state: &AppState<S>,
    entries: Vec<WatchHistoryEntry>,
) -> Vec<serde_json::Value> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let video = state.catalog.videos.get_published(entry.video_id).ok()?;
            Some(json!({
                "videoId": entry.video_id,
                "progress": entry.progress_secs,
                "completed": entry.completed,
                "lastWatched": entry.last_watched,
                "video": PublicVideo::from(&video),
            }))
        })
        .collect()
}

fn entry_json(entry: &WatchHistoryEntry) -> serde_json::Value {
    json!({
        "videoId": entry.video_id,
        "progress": entry.progress_secs,
        "completed": entry.completed,
        "lastWatched": entry.last_watched,
    })
}

/// `GET /watch-history`
pub async fn get_history<S: ContentStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let viewer = require_viewer(&state, &headers)?;
    let history = history_json(&state, state.catalog.history.list(viewer.id));
    Ok(Json(json!({ "success": true, "count": history.len(), "history": history })).into_response())
}

/// `POST /watch-history`
pub async fn record_progress<S: ContentStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let viewer = require_viewer(&state, &headers)?;
    let req: RecordProgressRequest = parse_json(&body)?;
    state.catalog.videos.get_published(req.video_id)?;

    let entry = state
        .catalog
        .history
        .upsert(viewer.id, req.video_id, req.progress, None);
    Ok(Json(json!({ "success": true, "history": entry_json(&entry) })).into_response())
}

/// `PUT /watch-history/{video_id}`
pub async fn update_progress<S: ContentStore>(
    State(state): State<AppState<S>>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let viewer = require_viewer(&state, &headers)?;
    let video_id = parse_video_id(&video_id)?;
    let req: UpdateProgressRequest = parse_json(&body)?;
    state.catalog.videos.get_published(video_id)?;

    let entry = state.catalog.history.upsert(
        viewer.id,
        video_id,
        req.progress,
        Some(req.completed),
    );
    Ok(Json(json!({ "success": true, "history": entry_json(&entry) })).into_response())
}

/// `DELETE /watch-history/{video_id}`
pub async fn remove_history_entry<S: ContentStore>(
    State(state): State<AppState<S>>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let viewer = require_viewer(&state, &headers)?;
    state
        .catalog
        .history
        .remove(viewer.id, parse_video_id(&video_id)?);
    Ok(Json(json!({ "success": true, "message": "Removed from watch history" })).into_response())
}

/// `DELETE /watch-history`
pub async fn clear_history<S: ContentStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let viewer = require_viewer(&state, &headers)?;
    let removed = state.catalog.history.clear(viewer.id);
    info!(viewer_id = %viewer.id, removed, "watch history cleared");
    Ok(Json(json!({ "success": true, "message": "Watch history cleared" })).into_response())
}

/// `GET /watch-history/continue-watching`
pub async fn continue_watching<S: ContentStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let viewer = require_viewer(&state, &headers)?;
    let history = history_json(&state, state.catalog.history.continue_watching(viewer.id));
    Ok(Json(json!({ "success": true, "count": history.len(), "history": history })).into_response())
}
