use dashmap::DashMap;
use serde::Deserialize;
use tracing::debug;

use crate::core::error::CatalogError;
use crate::core::security::MAX_TITLE_LENGTH;
use crate::core::types::{Quality, SubscriptionPlan, Viewer, ViewerPreferences, VideoId, ViewerId};

/// Viewer accounts keyed by id, as provisioned by the external auth layer.
#[derive(Default)]
pub struct ViewerDirectory {
    viewers: DashMap<ViewerId, Viewer>,
}

impl ViewerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, viewer: Viewer) {
        debug!(viewer_id = %viewer.id, plan = %viewer.subscription, "viewer stored");
        self.viewers.insert(viewer.id, viewer);
    }

    pub fn get(&self, id: ViewerId) -> Option<Viewer> {
        self.viewers.get(&id).map(|v| v.clone())
    }

    /// All viewers, ordered by username.
    pub fn list(&self) -> Vec<Viewer> {
        let mut viewers: Vec<Viewer> = self.viewers.iter().map(|v| v.value().clone()).collect();
        viewers.sort_by(|a, b| a.username.cmp(&b.username).then(a.id.cmp(&b.id)));
        viewers
    }

    /// Admin update of account fields. My list and preferences are left alone.
    pub fn update(&self, viewer_id: ViewerId, patch: ViewerPatch) -> Result<Viewer, CatalogError> {
        let mut viewer = self
            .viewers
            .get_mut(&viewer_id)
            .ok_or(CatalogError::ViewerNotFound { viewer_id })?;
        if let Some(username) = patch.username {
            viewer.username = username.trim().to_string();
        }
        if let Some(plan) = patch.subscription {
            viewer.subscription = plan;
        }
        debug!(%viewer_id, plan = %viewer.subscription, "viewer updated");
        Ok(viewer.clone())
    }

    pub fn update_preferences(
        &self,
        viewer_id: ViewerId,
        patch: PreferencesPatch,
    ) -> Result<ViewerPreferences, CatalogError> {
        let mut viewer = self
            .viewers
            .get_mut(&viewer_id)
            .ok_or(CatalogError::ViewerNotFound { viewer_id })?;
        let prefs = &mut viewer.preferences;
        if let Some(genres) = patch.favorite_genres {
            prefs.favorite_genres = genres;
        }
        if let Some(quality) = patch.preferred_quality {
            prefs.preferred_quality = Some(quality);
        }
        if let Some(autoplay) = patch.autoplay {
            prefs.autoplay = autoplay;
        }
        Ok(prefs.clone())
    }

    pub fn remove(&self, viewer_id: ViewerId) -> Option<Viewer> {
        self.viewers.remove(&viewer_id).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.viewers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.viewers.is_empty()
    }

    /// Append a video to the viewer's list. The list keeps insertion order
    /// and never holds duplicates.
    pub fn add_to_list(&self, viewer_id: ViewerId, video_id: VideoId) -> Result<(), CatalogError> {
        let mut viewer = self
            .viewers
            .get_mut(&viewer_id)
            .ok_or(CatalogError::ViewerNotFound { viewer_id })?;
        if viewer.my_list.contains(&video_id) {
            return Err(CatalogError::AlreadyInList { video_id });
        }
        viewer.my_list.push(video_id);
        Ok(())
    }

    /// Remove a video from the viewer's list. Removing an absent entry is a no-op.
    pub fn remove_from_list(
        &self,
        viewer_id: ViewerId,
        video_id: VideoId,
    ) -> Result<(), CatalogError> {
        let mut viewer = self
            .viewers
            .get_mut(&viewer_id)
            .ok_or(CatalogError::ViewerNotFound { viewer_id })?;
        viewer.my_list.retain(|id| *id != video_id);
        Ok(())
    }

    pub fn my_list(&self, viewer_id: ViewerId) -> Result<Vec<VideoId>, CatalogError> {
        self.viewers
            .get(&viewer_id)
            .map(|v| v.my_list.clone())
            .ok_or(CatalogError::ViewerNotFound { viewer_id })
    }

    /// Drop a deleted video from every list that holds it.
    pub fn forget_video(&self, video_id: VideoId) {
        for mut viewer in self.viewers.iter_mut() {
            viewer.my_list.retain(|id| *id != video_id);
        }
    }
}

/// Body of `PUT /users/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerPatch {
    pub username: Option<String>,
    pub subscription: Option<SubscriptionPlan>,
}

impl ViewerPatch {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(username) = &self.username {
            if username.trim().is_empty() {
                return Err("username must not be empty".to_string());
            }
            if username.chars().count() > MAX_TITLE_LENGTH {
                return Err(format!(
                    "username exceeds max length {} chars",
                    MAX_TITLE_LENGTH
                ));
            }
        }
        Ok(())
    }
}

/// Body of `PUT /users/preferences`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    pub favorite_genres: Option<Vec<String>>,
    pub preferred_quality: Option<Quality>,
    pub autoplay: Option<bool>,
}
