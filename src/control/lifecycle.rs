use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::core::auth::AuthProvider;
use crate::core::error::CatalogError;
use crate::core::types::{Video, VideoId, Viewer, ViewerId};
use crate::observability::metrics as obs;
use crate::storage::ContentStore;

/// Delete a video: metadata first, then its backing file.
///
/// Once the metadata is gone the video is unreachable, so a failed file
/// delete only leaves an orphan on disk. That is logged with its location
/// and counted; the deletion itself still succeeds. Purchase records are
/// kept.
pub async fn delete_video<S: ContentStore>(
    catalog: &Catalog,
    store: &S,
    video_id: VideoId,
) -> Result<Video, CatalogError> {
    let video = catalog
        .videos
        .remove(video_id)
        .ok_or(CatalogError::VideoNotFound { video_id })?;
    catalog.viewers.forget_video(video_id);
    catalog.history.forget_video(video_id);

    match store.delete(&video.content_location).await {
        Ok(()) => {
            info!(%video_id, location = %video.content_location, "video deleted");
        }
        Err(e) => {
            obs::inc_storage_error("delete");
            obs::inc_storage_orphan();
            warn!(
                %video_id,
                location = %video.content_location,
                error = %e,
                "video metadata deleted but backing file remains; remove it manually"
            );
        }
    }

    Ok(video)
}

/// Delete a viewer account, its watch history and its sessions.
///
/// Purchase records stay in the ledger as the record of payment.
pub fn delete_viewer(
    catalog: &Catalog,
    auth: &AuthProvider,
    viewer_id: ViewerId,
) -> Result<Viewer, CatalogError> {
    let viewer = catalog
        .viewers
        .remove(viewer_id)
        .ok_or(CatalogError::ViewerNotFound { viewer_id })?;
    let history = catalog.history.clear(viewer_id);
    let sessions = auth.revoke_viewer_sessions(viewer_id);
    info!(%viewer_id, history, sessions, "viewer deleted");
    Ok(viewer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::videos::tests::sample_video;
    use crate::core::config::AuthConfig;
    use crate::core::types::{Price, SubscriptionPlan};
    use crate::storage::fs::FsContentStore;
    use crate::storage::memory::InMemoryContentStore;

    #[tokio::test]
    async fn test_delete_removes_metadata_and_file() {
        let catalog = Catalog::new();
        let store = InMemoryContentStore::new();
        let video = catalog.videos.insert(sample_video("Gone"));
        store.put(&video.content_location, vec![1u8; 10]).await;

        let viewer_id = ViewerId::new();
        catalog.viewers.insert(Viewer {
            id: viewer_id,
            username: "v".to_string(),
            subscription: SubscriptionPlan::Free,
            my_list: vec![video.id],
            preferences: Default::default(),
        });
        catalog.history.upsert(viewer_id, video.id, 30, None);

        delete_video(&catalog, &store, video.id).await.unwrap();

        assert!(catalog.videos.get(video.id).is_none());
        assert!(!store.exists(&video.content_location).await);
        assert!(catalog.viewers.my_list(viewer_id).unwrap().is_empty());
        assert!(catalog.history.list(viewer_id).is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_video() {
        let catalog = Catalog::new();
        let store = InMemoryContentStore::new();
        assert!(matches!(
            delete_video(&catalog, &store, VideoId::new()).await,
            Err(CatalogError::VideoNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_file_delete_failure_still_removes_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::new(dir.path());
        let catalog = Catalog::new();

        // A directory at the content location cannot be removed with remove_file.
        let mut video = sample_video("Stuck");
        video.content_location = "stuck".to_string();
        std::fs::create_dir(dir.path().join("stuck")).unwrap();
        let video = catalog.videos.insert(video);

        delete_video(&catalog, &store, video.id).await.unwrap();
        assert!(catalog.videos.get(video.id).is_none());
        assert!(dir.path().join("stuck").exists());
    }

    #[test]
    fn test_delete_viewer_keeps_purchases() {
        let catalog = Catalog::new();
        let auth = AuthProvider::new(&AuthConfig {
            admin_bearer_tokens: vec![],
            viewer_tokens: vec![],
        });
        let viewer_id = ViewerId::new();
        catalog.viewers.insert(Viewer {
            id: viewer_id,
            username: "leaving".to_string(),
            subscription: SubscriptionPlan::Free,
            my_list: vec![],
            preferences: Default::default(),
        });
        auth.insert_viewer_session("leaving-session", viewer_id);
        let video = catalog.videos.insert(sample_video("Bought"));
        catalog.history.upsert(viewer_id, video.id, 30, None);
        catalog
            .purchases
            .insert_unique(viewer_id, video.id, Price::from_cents(499))
            .unwrap();

        let removed = delete_viewer(&catalog, &auth, viewer_id).unwrap();
        assert_eq!(removed.username, "leaving");
        assert!(catalog.viewers.get(viewer_id).is_none());
        assert!(catalog.history.list(viewer_id).is_empty());
        assert_eq!(auth.resolve_viewer("leaving-session"), None);
        assert!(catalog.purchases.has_purchase(viewer_id, video.id));

        assert!(matches!(
            delete_viewer(&catalog, &auth, viewer_id),
            Err(CatalogError::ViewerNotFound { .. })
        ));
    }
}
