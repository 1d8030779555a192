use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use tokio_util::io::ReaderStream;

use crate::core::error::ApiError;
use crate::storage::{ContentMeta, ContentStore};

use super::range::ResponsePlan;

// ---------------------------------------------------------------------------
// Streaming response construction
// ---------------------------------------------------------------------------

/// Open the planned window of `location` and wrap it as a streamed response.
///
/// The body pulls `chunk_bytes` at a time from the reader as hyper polls it,
/// so memory stays bounded regardless of object size. When the client goes
/// away hyper drops the body, which drops the reader and closes the handle.
pub async fn open_planned<S: ContentStore>(
    store: &S,
    location: &str,
    meta: &ContentMeta,
    plan: ResponsePlan,
    cache_control: &str,
    chunk_bytes: usize,
) -> Result<Response, ApiError> {
    if let ResponsePlan::Unsatisfiable { content_length } = plan {
        return Err(ApiError::RangeNotSatisfiable { content_length });
    }

    let reader = store
        .open_range(location, plan.offset(), plan.body_len())
        .await
        .map_err(|e| {
            if !e.is_not_found() {
                tracing::error!(location, error = %e, "failed to open content for streaming");
            }
            ApiError::from(e)
        })?;

    let stream = ReaderStream::with_capacity(reader, chunk_bytes.max(1));
    Ok(build_response(
        plan,
        meta,
        Body::from_stream(stream),
        cache_control,
    ))
}

/// Build the 200/206 response with its headers around an already-built body.
pub fn build_response(
    plan: ResponsePlan,
    meta: &ContentMeta,
    body: Body,
    cache_control: &str,
) -> Response {
    let mut response = (plan.status(), body).into_response();
    let headers = response.headers_mut();

    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(plan.body_len()));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    if let Ok(v) = HeaderValue::from_str(&meta.content_type) {
        headers.insert(header::CONTENT_TYPE, v);
    }
    if let Ok(v) = HeaderValue::from_str(cache_control) {
        headers.insert(header::CACHE_CONTROL, v);
    }
    if let Some(v) = plan
        .content_range()
        .and_then(|r| HeaderValue::from_str(&r).ok())
    {
        headers.insert(header::CONTENT_RANGE, v);
    }
    if let Some(v) = meta
        .etag
        .as_deref()
        .and_then(|e| HeaderValue::from_str(e).ok())
    {
        headers.insert(header::ETAG, v);
    }
    if let Some(v) = meta
        .last_modified
        .map(http_date)
        .and_then(|d| HeaderValue::from_str(&d).ok())
    {
        headers.insert(header::LAST_MODIFIED, v);
    }

    response
}

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date(ts: DateTime<Utc>) -> String {
    ts.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Status class label for delivery metrics.
pub fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        200..=299 => "2xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}
