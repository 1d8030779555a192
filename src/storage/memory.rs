use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::core::error::StorageError;

use super::{content_type_for_path, etag_for, ContentMeta, ContentReader, ContentStore};

// ---------------------------------------------------------------------------
// InMemoryContentStore
// ---------------------------------------------------------------------------

/// In-memory content backend for unit and router tests.
///
/// Stores all objects in a `HashMap<String, StoredObject>` behind a `RwLock`.
#[derive(Clone, Default)]
pub struct InMemoryContentStore {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    created_at: DateTime<Utc>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an object. Content type is derived from the location.
    pub async fn put(&self, location: &str, data: impl Into<Bytes>) {
        let mut objects = self.objects.write().await;
        objects.insert(
            location.to_string(),
            StoredObject {
                data: data.into(),
                content_type: content_type_for_path(location).to_string(),
                created_at: Utc::now(),
            },
        );
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    fn not_found(location: &str) -> StorageError {
        StorageError::NotFound {
            location: location.to_string(),
        }
    }
}

impl ContentStore for InMemoryContentStore {
    async fn resolve(&self, location: &str) -> Result<ContentMeta, StorageError> {
        let objects = self.objects.read().await;
        let obj = objects.get(location).ok_or_else(|| Self::not_found(location))?;
        let len = obj.data.len() as u64;
        Ok(ContentMeta {
            content_length: len,
            content_type: obj.content_type.clone(),
            last_modified: Some(obj.created_at),
            etag: Some(etag_for(len, Some(obj.created_at))),
        })
    }

    async fn open_range(
        &self,
        location: &str,
        start: u64,
        len: u64,
    ) -> Result<ContentReader, StorageError> {
        let objects = self.objects.read().await;
        let obj = objects.get(location).ok_or_else(|| Self::not_found(location))?;

        let total = obj.data.len();
        let start = (start as usize).min(total);
        let end = start.saturating_add(len as usize).min(total);
        let window = obj.data.slice(start..end);
        Ok(Box::pin(Cursor::new(window)))
    }

    async fn exists(&self, location: &str) -> bool {
        self.objects.read().await.contains_key(location)
    }

    async fn delete(&self, location: &str) -> Result<(), StorageError> {
        let mut objects = self.objects.write().await;
        objects.remove(location);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_put_and_resolve() {
        let store = InMemoryContentStore::new();
        store.put("v/a.mp4", vec![0xAA; 1000]).await;

        let meta = store.resolve("v/a.mp4").await.unwrap();
        assert_eq!(meta.content_length, 1000);
        assert_eq!(meta.content_type, "video/mp4");
    }

    #[tokio::test]
    async fn test_resolve_nonexistent_returns_not_found() {
        let store = InMemoryContentStore::new();
        let err = store.resolve("nope.mp4").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_open_range() {
        let store = InMemoryContentStore::new();
        store
            .put("a.mp4", vec![0u8, 1, 2, 3, 4, 5, 6, 7, 8, 9])
            .await;

        let mut reader = store.open_range("a.mp4", 2, 4).await.unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, vec![2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryContentStore::new();
        store.put("a.mp4", Bytes::from_static(b"data")).await;
        assert!(store.exists("a.mp4").await);
        store.delete("a.mp4").await.unwrap();
        assert!(!store.exists("a.mp4").await);
        assert_eq!(store.object_count().await, 0);
    }
}
