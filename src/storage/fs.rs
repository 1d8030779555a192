use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, trace};

use crate::core::error::StorageError;
use crate::core::security::validate_content_location;

use super::{content_type_for_path, etag_for, ContentMeta, ContentReader, ContentStore};

// ---------------------------------------------------------------------------
// FsContentStore
// ---------------------------------------------------------------------------

/// Filesystem content backend rooted at the configured media directory.
///
/// Every range read opens its own handle and seeks, so concurrent ranges of
/// the same file never share a cursor.
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, location: &str) -> Result<PathBuf, StorageError> {
        validate_content_location(location).map_err(|_| StorageError::InvalidLocation {
            location: location.to_string(),
        })?;
        Ok(self.root.join(location))
    }
}

fn map_io(location: &str, e: std::io::Error) -> StorageError {
    if e.kind() == ErrorKind::NotFound {
        StorageError::NotFound {
            location: location.to_string(),
        }
    } else {
        StorageError::Io(e)
    }
}

impl ContentStore for FsContentStore {
    async fn resolve(&self, location: &str) -> Result<ContentMeta, StorageError> {
        let path = self.path_for(location)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| map_io(location, e))?;
        if !meta.is_file() {
            return Err(StorageError::NotFound {
                location: location.to_string(),
            });
        }

        let last_modified = meta.modified().ok().map(DateTime::<Utc>::from);
        trace!(location, size = meta.len(), "content resolved");
        Ok(ContentMeta {
            content_length: meta.len(),
            content_type: content_type_for_path(location).to_string(),
            last_modified,
            etag: Some(etag_for(meta.len(), last_modified)),
        })
    }

    async fn open_range(
        &self,
        location: &str,
        start: u64,
        len: u64,
    ) -> Result<ContentReader, StorageError> {
        let path = self.path_for(location)?;
        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| map_io(location, e))?;
        if start > 0 {
            file.seek(SeekFrom::Start(start)).await?;
        }
        Ok(Box::pin(file.take(len)))
    }

    async fn exists(&self, location: &str) -> bool {
        match self.path_for(location) {
            Ok(path) => tokio::fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn delete(&self, location: &str) -> Result<(), StorageError> {
        let path = self.path_for(location)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(location, "content already absent on delete");
                Ok(())
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        let meta = tokio::fs::metadata(&self.root).await?;
        if meta.is_dir() {
            Ok(())
        } else {
            Err(StorageError::Io(std::io::Error::other(format!(
                "media root {} is not a directory",
                self.root.display()
            ))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(name: &str, data: &[u8]) -> (tempfile::TempDir, FsContentStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, data).unwrap();
        let store = FsContentStore::new(dir.path());
        (dir, store)
    }

    async fn read_all(mut reader: ContentReader) -> Vec<u8> {
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn test_resolve_reports_length_and_type() {
        let (_dir, store) = store_with("videos/clip.mp4", &[7u8; 1000]);
        let meta = store.resolve("videos/clip.mp4").await.unwrap();
        assert_eq!(meta.content_length, 1000);
        assert_eq!(meta.content_type, "video/mp4");
        assert!(meta.etag.is_some());
    }

    #[tokio::test]
    async fn test_resolve_missing_file_is_not_found() {
        let (_dir, store) = store_with("a.mp4", b"x");
        let err = store.resolve("missing.mp4").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_resolve_directory_is_not_found() {
        let (_dir, store) = store_with("videos/a.mp4", b"x");
        let err = store.resolve("videos").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_traversal_is_rejected() {
        let (_dir, store) = store_with("a.mp4", b"x");
        let err = store.resolve("../a.mp4").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidLocation { .. }));
        assert!(!store.exists("../a.mp4").await);
    }

    #[tokio::test]
    async fn test_open_range_reads_window() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let (_dir, store) = store_with("a.mp4", &data);

        let reader = store.open_range("a.mp4", 100, 100).await.unwrap();
        assert_eq!(read_all(reader).await, data[100..200].to_vec());

        let reader = store.open_range("a.mp4", 0, 1000).await.unwrap();
        assert_eq!(read_all(reader).await, data);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_dir, store) = store_with("a.mp4", b"abc");
        assert!(store.exists("a.mp4").await);
        store.delete("a.mp4").await.unwrap();
        assert!(!store.exists("a.mp4").await);
        store.delete("a.mp4").await.unwrap();
    }

    #[tokio::test]
    async fn test_health_check() {
        let (dir, store) = store_with("a.mp4", b"abc");
        assert!(store.health_check().await.is_ok());
        let missing = FsContentStore::new(dir.path().join("nope"));
        assert!(missing.health_check().await.is_err());
    }
}
