pub mod fs;
pub mod memory;

use std::pin::Pin;

use chrono::{DateTime, Utc};
use tokio::io::AsyncRead;

use crate::core::error::StorageError;

// ---------------------------------------------------------------------------
// ContentStore trait
// ---------------------------------------------------------------------------

/// A readable window of a content object. Dropping it releases the
/// underlying handle.
pub type ContentReader = Pin<Box<dyn AsyncRead + Send>>;

/// Trait-based abstraction over where video bytes live.
///
/// The production implementation (`FsContentStore`) reads from a media root
/// on local disk. `InMemoryContentStore` backs unit and router tests.
pub trait ContentStore: Send + Sync + 'static {
    /// Resolve a content location to its length and MIME type.
    fn resolve(
        &self,
        location: &str,
    ) -> impl std::future::Future<Output = Result<ContentMeta, StorageError>> + Send;

    /// Open a reader positioned at `start` that yields at most `len` bytes.
    fn open_range(
        &self,
        location: &str,
        start: u64,
        len: u64,
    ) -> impl std::future::Future<Output = Result<ContentReader, StorageError>> + Send;

    /// Check whether a content object exists.
    fn exists(&self, location: &str) -> impl std::future::Future<Output = bool> + Send;

    /// Delete a content object. Deleting a missing object is not an error.
    fn delete(
        &self,
        location: &str,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Verify the backend is reachable (used by readiness checks).
    fn health_check(&self) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;
}

// ---------------------------------------------------------------------------
// Storage types
// ---------------------------------------------------------------------------

/// Metadata of a resolved content object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentMeta {
    pub content_length: u64,
    pub content_type: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
}

// ---------------------------------------------------------------------------
// Content type helpers
// ---------------------------------------------------------------------------

/// Determine content type from file extension.
pub fn content_type_for_path(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        "ogv" | "ogg" => "video/ogg",
        "ts" => "video/mp2t",
        _ => "application/octet-stream",
    }
}

/// Weak validator derived from size and modification time.
pub fn etag_for(content_length: u64, last_modified: Option<DateTime<Utc>>) -> String {
    match last_modified {
        Some(ts) => format!("\"{:x}-{:x}\"", content_length, ts.timestamp()),
        None => format!("\"{:x}\"", content_length),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for_path() {
        assert_eq!(content_type_for_path("videos/a.mp4"), "video/mp4");
        assert_eq!(content_type_for_path("videos/A.MP4"), "video/mp4");
        assert_eq!(content_type_for_path("b.webm"), "video/webm");
        assert_eq!(content_type_for_path("noext"), "application/octet-stream");
    }

    #[test]
    fn test_etag_for() {
        assert_eq!(etag_for(255, None), "\"ff\"");
        let ts = DateTime::from_timestamp(16, 0).unwrap();
        assert_eq!(etag_for(255, Some(ts)), "\"ff-10\"");
    }
}
