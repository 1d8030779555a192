use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use crate::access::ads::{select_ad, shows_ads};
use crate::access::entitlement::{Entitlement, EntitlementGate};
use crate::catalog::search::{self, SearchFilter, SearchSort};
use crate::catalog::videos::{public_list, PublicVideo};
use crate::core::error::ApiError;
use crate::core::security::{clamp_limit, MAX_SEARCH_QUERY_LENGTH};
use crate::core::types::{AdPlacement, Rating};
use crate::observability::metrics as obs;
use crate::storage::ContentStore;

use super::extract::optional_viewer;
use super::range::{self, ResponsePlan};
use super::response::parse_video_id;
use super::router::AppState;
use super::stream::{open_planned, status_class};

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

/// `GET /videos/{id}/stream`
///
/// Gate, resolve, plan, count, stream. Every deny decision is made before the
/// content store is touched, and no body bytes follow an error status.
pub async fn stream_video<S: ContentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let response = match serve_stream(&state, &id, &headers).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };

    let kind = match response.status() {
        StatusCode::OK => "full",
        StatusCode::PARTIAL_CONTENT => "partial",
        StatusCode::RANGE_NOT_SATISFIABLE => "unsatisfiable",
        s if s.is_client_error() => "denied",
        _ => "error",
    };
    obs::inc_delivery_request(status_class(response.status()), kind);
    obs::record_delivery_request_duration(kind, started.elapsed().as_secs_f64());
    response
}

async fn serve_stream<S: ContentStore>(
    state: &AppState<S>,
    id: &str,
    headers: &HeaderMap,
) -> Result<Response, ApiError> {
    let video_id = parse_video_id(id)?;
    let video = state
        .catalog
        .videos
        .get(video_id)
        .ok_or_else(|| ApiError::not_found("Video not found"))?;

    let viewer = optional_viewer(state, headers);
    if let Entitlement::Denied(reason) =
        EntitlementGate::new(&state.catalog.purchases).check(viewer.as_ref(), &video)
    {
        return Err(reason.into());
    }

    let meta = state
        .store
        .resolve(&video.content_location)
        .await
        .map_err(|e| {
            if e.is_not_found() {
                debug!(%video_id, location = %video.content_location, "backing file missing");
            } else {
                obs::inc_storage_error("resolve");
                error!(%video_id, error = %e, "failed to resolve video content");
            }
            ApiError::from(e)
        })?;

    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let plan = range::plan(range_header, meta.content_length);
    if let ResponsePlan::Unsatisfiable { content_length } = plan {
        obs::inc_range_unsatisfiable();
        debug!(%video_id, range = ?range_header, content_length, "range not satisfiable");
        return Err(ApiError::RangeNotSatisfiable { content_length });
    }

    state.views.increment(video_id);

    let delivery = &state.config.delivery;
    let response = open_planned(
        state.store.as_ref(),
        &video.content_location,
        &meta,
        plan,
        &delivery.cache_control,
        delivery.stream_chunk_bytes,
    )
    .await?;

    obs::add_delivery_bytes_planned(plan.body_len());
    debug!(
        %video_id,
        status = plan.status().as_u16(),
        offset = plan.offset(),
        len = plan.body_len(),
        "streaming video"
    );
    Ok(response)
}

// ---------------------------------------------------------------------------
// Catalog browsing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ListVideosQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub genre: Option<String>,
}

/// `GET /videos`
pub async fn list_videos<S: ContentStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<ListVideosQuery>,
) -> Response {
    let genre = query.genre.as_deref().filter(|g| !g.trim().is_empty());
    let page = state.catalog.videos.list_published(
        genre,
        query.page.unwrap_or(1),
        clamp_limit(query.limit),
    );

    Json(json!({
        "success": true,
        "count": page.items.len(),
        "total": page.total,
        "totalPages": page.total_pages(),
        "currentPage": page.page,
        "videos": public_list(&page.items),
    }))
    .into_response()
}

/// `GET /videos/featured`
pub async fn featured_videos<S: ContentStore>(State(state): State<AppState<S>>) -> Response {
    let videos = state.catalog.videos.featured();
    video_list_json(&videos)
}

/// `GET /videos/trending`
pub async fn trending_videos<S: ContentStore>(State(state): State<AppState<S>>) -> Response {
    let videos = state.catalog.videos.trending();
    video_list_json(&videos)
}

/// `GET /videos/by-genre/{genre}`
pub async fn videos_by_genre<S: ContentStore>(
    State(state): State<AppState<S>>,
    Path(genre): Path<String>,
) -> Response {
    let videos = state.catalog.videos.by_genre(&genre);
    video_list_json(&videos)
}

/// `GET /videos/by-category/{category}`
pub async fn videos_by_category<S: ContentStore>(
    State(state): State<AppState<S>>,
    Path(category): Path<String>,
) -> Response {
    let videos = state.catalog.videos.by_category(&category);
    video_list_json(&videos)
}

/// `GET /videos/{id}`
pub async fn get_video<S: ContentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let video = state.catalog.videos.get_published(parse_video_id(&id)?)?;
    Ok(Json(json!({
        "success": true,
        "video": PublicVideo::from(&video),
    }))
    .into_response())
}

fn video_list_json(videos: &[crate::core::types::Video]) -> Response {
    Json(json!({
        "success": true,
        "count": videos.len(),
        "videos": public_list(videos),
    }))
    .into_response()
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub genre: Option<String>,
    pub year: Option<u16>,
    pub rating: Option<Rating>,
    pub sort: Option<SearchSort>,
}

/// `GET /search`
pub async fn search_videos<S: ContentStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, ApiError> {
    let q = query.q.as_deref().map(str::trim).unwrap_or_default();
    if q.is_empty() {
        return Err(ApiError::invalid("Please provide a search query"));
    }
    if q.len() > MAX_SEARCH_QUERY_LENGTH {
        return Err(ApiError::invalid(format!(
            "Search query exceeds {} characters",
            MAX_SEARCH_QUERY_LENGTH
        )));
    }

    let filter = SearchFilter {
        genre: query.genre.clone().filter(|g| !g.trim().is_empty()),
        year: query.year,
        rating: query.rating,
        sort: query.sort.unwrap_or_default(),
    };
    let videos = search::search(&state.catalog.videos, q, &filter);

    Ok(Json(json!({
        "success": true,
        "count": videos.len(),
        "query": q,
        "videos": public_list(&videos),
    }))
    .into_response())
}

#[derive(Debug, Deserialize)]
pub struct AutocompleteQuery {
    pub q: Option<String>,
}

/// `GET /search/autocomplete`
pub async fn autocomplete<S: ContentStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<AutocompleteQuery>,
) -> Response {
    let q = query.q.unwrap_or_default();
    let suggestions = if q.len() > MAX_SEARCH_QUERY_LENGTH {
        Vec::new()
    } else {
        search::autocomplete(&state.catalog.videos, &q)
    };
    Json(json!({ "success": true, "suggestions": suggestions })).into_response()
}

// ---------------------------------------------------------------------------
// Ads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AdQuery {
    #[serde(rename = "type")]
    pub placement: Option<String>,
}

/// `GET /ads/for-video/{video_id}?type=pre-roll`
///
/// PPV events and videos without ad support always get `ad: null`.
pub async fn ad_for_video<S: ContentStore>(
    State(state): State<AppState<S>>,
    Path(video_id): Path<String>,
    Query(query): Query<AdQuery>,
) -> Result<Response, ApiError> {
    let placement: AdPlacement = match query.placement.as_deref() {
        None | Some("") => AdPlacement::default(),
        Some(raw) => raw.parse().map_err(ApiError::invalid)?,
    };
    let video = state
        .catalog
        .videos
        .get_published(parse_video_id(&video_id)?)?;

    if !shows_ads(&video) {
        obs::inc_ad_served(placement.as_str(), "not_eligible");
        return Ok(Json(json!({ "success": true, "ad": null })).into_response());
    }

    let pool = state.catalog.ads.active_for(placement);
    let ad = select_ad(placement, &pool, &mut rand::thread_rng());
    obs::inc_ad_served(
        placement.as_str(),
        if ad.is_some() { "served" } else { "empty" },
    );

    Ok(Json(json!({ "success": true, "ad": ad })).into_response())
}

// ---------------------------------------------------------------------------
// Health endpoints
// ---------------------------------------------------------------------------

/// `GET /metrics`
pub async fn metrics_handler<S: ContentStore>(State(state): State<AppState<S>>) -> Response {
    if !state.config.observability.metrics_enabled {
        return ApiError::not_found("Metrics are disabled").into_response();
    }
    let metrics = state.metrics_handle.render();
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
        .into_response()
}

/// `GET /healthz`
pub async fn healthz<S: ContentStore>(State(state): State<AppState<S>>) -> Json<serde_json::Value> {
    let uptime = state.start_time.elapsed().as_secs();
    Json(json!({
        "status": "healthy",
        "uptime_secs": uptime,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `GET /readyz`: the media root must be reachable.
pub async fn readyz<S: ContentStore>(State(state): State<AppState<S>>) -> Response {
    let mut checks = serde_json::Map::new();
    let mut all_ok = true;

    match state.store.health_check().await {
        Ok(()) => {
            checks.insert("storage".to_string(), json!({"status": "ok"}));
        }
        Err(e) => {
            all_ok = false;
            checks.insert(
                "storage".to_string(),
                json!({"status": "error", "error": e.to_string()}),
            );
        }
    }
    checks.insert(
        "catalog".to_string(),
        json!({"status": "ok", "videos": state.catalog.videos.len()}),
    );

    let (status, http_status) = if all_ok {
        ("ready", StatusCode::OK)
    } else {
        ("not_ready", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        http_status,
        Json(json!({
            "status": status,
            "checks": checks,
            "auth_open_mode": state.auth.is_open_mode(),
        })),
    )
        .into_response()
}
