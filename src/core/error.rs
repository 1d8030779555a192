use thiserror::Error;

use super::types::{AdId, Price, VideoId, ViewerId};

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

/// Errors originating from a content store backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("content not found: {location}")]
    NotFound { location: String },

    #[error("invalid content location: {location}")]
    InvalidLocation { location: String },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::NotFound { .. } | StorageError::InvalidLocation { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Catalog errors
// ---------------------------------------------------------------------------

/// Errors raised by the in-process document store.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("video not found: {video_id}")]
    VideoNotFound { video_id: VideoId },

    #[error("viewer not found: {viewer_id}")]
    ViewerNotFound { viewer_id: ViewerId },

    #[error("advertisement not found: {ad_id}")]
    AdNotFound { ad_id: AdId },

    #[error("video {video_id} is already in the list")]
    AlreadyInList { video_id: VideoId },

    #[error("failed to load catalog seed: {reason}")]
    Seed { reason: String },
}

// ---------------------------------------------------------------------------
// Purchase errors
// ---------------------------------------------------------------------------

/// Errors from a pay-per-view purchase attempt.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PurchaseError {
    #[error("video not found: {video_id}")]
    VideoNotFound { video_id: VideoId },

    #[error("video {video_id} is not a pay-per-view event")]
    NotPpv { video_id: VideoId },

    #[error("video {video_id} has already been purchased")]
    AlreadyPurchased { video_id: VideoId },
}

// ---------------------------------------------------------------------------
// API errors
// ---------------------------------------------------------------------------

/// Errors surfaced to HTTP clients.
///
/// Every variant short-circuits the request; no body bytes are produced
/// after one of these has been decided.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    AuthRequired { message: String },

    #[error("{message}")]
    Forbidden {
        message: String,
        ppv_price: Option<Price>,
    },

    #[error("{message}")]
    InvalidRequest { message: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("requested range not satisfiable for {content_length} bytes")]
    RangeNotSatisfiable { content_length: u64 },

    #[error("{message}")]
    Storage { message: String },
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound {
            message: message.into(),
        }
    }

    pub fn auth_required(message: impl Into<String>) -> Self {
        ApiError::AuthRequired {
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::InvalidRequest {
            message: message.into(),
        }
    }

    /// Map an ApiError to its HTTP status code.
    ///
    /// Conflicts are reported as 400 to match the published purchase and
    /// list endpoints.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound { .. } => 404,
            ApiError::AuthRequired { .. } => 401,
            ApiError::Forbidden { .. } => 403,
            ApiError::InvalidRequest { .. } => 400,
            ApiError::Conflict { .. } => 400,
            ApiError::RangeNotSatisfiable { .. } => 416,
            ApiError::Storage { .. } => 500,
        }
    }

    /// Return the error code string for JSON responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } => "not_found",
            ApiError::AuthRequired { .. } => "auth_required",
            ApiError::Forbidden {
                ppv_price: Some(_), ..
            } => "purchase_required",
            ApiError::Forbidden { .. } => "forbidden",
            ApiError::InvalidRequest { .. } => "invalid_request",
            ApiError::Conflict { .. } => "conflict",
            ApiError::RangeNotSatisfiable { .. } => "range_not_satisfiable",
            ApiError::Storage { .. } => "storage_error",
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound { .. } | StorageError::InvalidLocation { .. } => {
                ApiError::not_found("Video file not found")
            }
            StorageError::Io(_) => ApiError::Storage {
                message: "Failed to read video content".to_string(),
            },
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::VideoNotFound { .. } => ApiError::not_found("Video not found"),
            CatalogError::ViewerNotFound { .. } => {
                ApiError::auth_required("Viewer account no longer exists")
            }
            CatalogError::AdNotFound { .. } => ApiError::not_found("Ad not found"),
            CatalogError::AlreadyInList { .. } => ApiError::Conflict {
                message: "Video already in your list".to_string(),
            },
            CatalogError::Seed { reason } => ApiError::Storage { message: reason },
        }
    }
}

impl From<PurchaseError> for ApiError {
    fn from(e: PurchaseError) -> Self {
        match e {
            PurchaseError::VideoNotFound { .. } => ApiError::not_found("Video not found"),
            PurchaseError::NotPpv { .. } => {
                ApiError::invalid("This video is not a pay-per-view event")
            }
            PurchaseError::AlreadyPurchased { .. } => ApiError::Conflict {
                message: "You have already purchased access to this event".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::not_found("x").status_code(), 404);
        assert_eq!(ApiError::auth_required("x").status_code(), 401);
        assert_eq!(
            ApiError::RangeNotSatisfiable { content_length: 10 }.status_code(),
            416
        );
        let e: ApiError = PurchaseError::AlreadyPurchased {
            video_id: VideoId::new(),
        }
        .into();
        assert_eq!(e.status_code(), 400);
        assert_eq!(e.error_code(), "conflict");
    }

    #[test]
    fn test_missing_file_maps_to_not_found() {
        let e: ApiError = StorageError::NotFound {
            location: "a.mp4".to_string(),
        }
        .into();
        assert_eq!(e.status_code(), 404);

        let e: ApiError = StorageError::Io(std::io::Error::other("disk")).into();
        assert_eq!(e.status_code(), 500);
    }

    #[test]
    fn test_purchase_required_code() {
        let e = ApiError::Forbidden {
            message: "buy".to_string(),
            ppv_price: Some(Price::from_cents(999)),
        };
        assert_eq!(e.error_code(), "purchase_required");
        assert_eq!(e.status_code(), 403);
    }
}
