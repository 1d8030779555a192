use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::error::ApiError;
use crate::core::types::{Price, VideoId};

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse<'a> {
    success: bool,
    error: &'a str,
    message: String,
    status: u16,
    #[serde(rename = "isPPV", skip_serializing_if = "Option::is_none")]
    is_ppv: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ppv_price: Option<Price>,
}

pub fn error_json(status: StatusCode, error: &str, message: &str) -> Response {
    let body = ErrorResponse {
        success: false,
        error,
        message: message.to_string(),
        status: status.as_u16(),
        is_ppv: None,
        ppv_price: None,
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let ppv_price = match &self {
            ApiError::Forbidden { ppv_price, .. } => *ppv_price,
            _ => None,
        };
        let body = ErrorResponse {
            success: false,
            error: self.error_code(),
            message: self.to_string(),
            status: status.as_u16(),
            is_ppv: ppv_price.map(|_| true),
            ppv_price,
        };
        let mut response = (status, Json(body)).into_response();

        if let ApiError::RangeNotSatisfiable { content_length } = self {
            if let Ok(v) = HeaderValue::from_str(&format!("bytes */{}", content_length)) {
                response.headers_mut().insert(header::CONTENT_RANGE, v);
            }
            response
                .headers_mut()
                .insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        }
        response
    }
}

// ---------------------------------------------------------------------------
// Request parsing helpers
// ---------------------------------------------------------------------------

/// Parse a JSON request body into `T`, reporting failures as 400.
pub fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::invalid(format!("Invalid request body: {e}")))
}

/// Parse a video id path segment. A malformed id names no video, so it is a 404.
pub fn parse_video_id(raw: &str) -> Result<VideoId, ApiError> {
    raw.parse().map_err(|_| ApiError::not_found("Video not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_purchase_required_body() {
        let resp = ApiError::Forbidden {
            message: "Purchase required".to_string(),
            ppv_price: Some(Price::from_cents(999)),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let json = body_json(resp).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "purchase_required");
        assert_eq!(json["ppvPrice"], 9.99);
        assert_eq!(json["isPPV"], true);
        assert_eq!(json["status"], 403);
    }

    #[tokio::test]
    async fn test_range_not_satisfiable_sets_content_range() {
        let resp = ApiError::RangeNotSatisfiable {
            content_length: 1000,
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(resp.headers()[header::CONTENT_RANGE], "bytes */1000");
        let json = body_json(resp).await;
        assert!(json.get("ppvPrice").is_none());
        assert!(json.get("isPPV").is_none());
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_video_id("nope").unwrap_err().status_code(), 404);
        let err = parse_json::<serde_json::Map<String, serde_json::Value>>(&Bytes::from_static(
            b"not json",
        ))
        .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
