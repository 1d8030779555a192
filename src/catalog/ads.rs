use chrono::Utc;
use dashmap::DashMap;
use serde::Deserialize;
use tracing::info;

use crate::core::error::CatalogError;
use crate::core::types::{AdId, AdPlacement, Advertisement};

/// The ad pool.
#[derive(Default)]
pub struct AdStore {
    ads: DashMap<AdId, Advertisement>,
}

impl AdStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, ad: Advertisement) -> Advertisement {
        self.ads.insert(ad.id, ad.clone());
        ad
    }

    pub fn get(&self, id: AdId) -> Option<Advertisement> {
        self.ads.get(&id).map(|a| a.clone())
    }

    /// Every ad, newest first.
    pub fn list(&self) -> Vec<Advertisement> {
        let mut ads: Vec<Advertisement> = self.ads.iter().map(|a| a.clone()).collect();
        ads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        ads
    }

    /// Active ads for one placement slot, in no particular order.
    pub fn active_for(&self, placement: AdPlacement) -> Vec<Advertisement> {
        self.ads
            .iter()
            .filter(|a| a.is_active && a.placement == placement)
            .map(|a| a.clone())
            .collect()
    }

    pub fn update(&self, id: AdId, patch: AdPatch) -> Result<Advertisement, CatalogError> {
        let mut ad = self
            .ads
            .get_mut(&id)
            .ok_or(CatalogError::AdNotFound { ad_id: id })?;
        patch.apply(&mut ad);
        ad.updated_at = Utc::now();
        let updated = ad.clone();
        drop(ad);

        info!(ad_id = %id, "advertisement updated");
        Ok(updated)
    }

    pub fn remove(&self, id: AdId) -> Result<Advertisement, CatalogError> {
        self.ads
            .remove(&id)
            .map(|(_, ad)| ad)
            .ok_or(CatalogError::AdNotFound { ad_id: id })
    }

    pub fn len(&self) -> usize {
        self.ads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ads.is_empty()
    }
}

/// Body of `POST /ads`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAd {
    pub title: String,
    pub video_url: String,
    #[serde(default)]
    pub click_through_url: String,
    pub duration_secs: u32,
    #[serde(default, rename = "type")]
    pub placement: AdPlacement,
    #[serde(default = "default_skip_after")]
    pub skip_after: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_skip_after() -> u32 {
    5
}

fn default_active() -> bool {
    true
}

impl NewAd {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("ad title must not be empty".to_string());
        }
        if self.video_url.trim().is_empty() {
            return Err("ad videoUrl must not be empty".to_string());
        }
        Ok(())
    }

    pub fn into_ad(self) -> Advertisement {
        let now = Utc::now();
        Advertisement {
            id: AdId::new(),
            title: self.title.trim().to_string(),
            video_url: self.video_url,
            click_through_url: self.click_through_url,
            duration_secs: self.duration_secs,
            placement: self.placement,
            skip_after: self.skip_after,
            is_active: self.is_active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Body of `PUT /ads/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdPatch {
    pub title: Option<String>,
    pub video_url: Option<String>,
    pub click_through_url: Option<String>,
    pub duration_secs: Option<u32>,
    #[serde(rename = "type")]
    pub placement: Option<AdPlacement>,
    pub skip_after: Option<u32>,
    pub is_active: Option<bool>,
}

impl AdPatch {
    fn apply(self, ad: &mut Advertisement) {
        if let Some(v) = self.title {
            ad.title = v.trim().to_string();
        }
        if let Some(v) = self.video_url {
            ad.video_url = v;
        }
        if let Some(v) = self.click_through_url {
            ad.click_through_url = v;
        }
        if let Some(v) = self.duration_secs {
            ad.duration_secs = v;
        }
        if let Some(v) = self.placement {
            ad.placement = v;
        }
        if let Some(v) = self.skip_after {
            ad.skip_after = v;
        }
        if let Some(v) = self.is_active {
            ad.is_active = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_ad(json: &str) -> Advertisement {
        serde_json::from_str::<NewAd>(json).unwrap().into_ad()
    }

    #[test]
    fn test_new_ad_defaults() {
        let ad = new_ad(r#"{"title":"Soda","videoUrl":"ads/soda.mp4","durationSecs":15}"#);
        assert_eq!(ad.placement, AdPlacement::PreRoll);
        assert_eq!(ad.skip_after, 5);
        assert!(ad.is_active);
        assert_eq!(ad.click_through_url, "");
    }

    #[test]
    fn test_active_for_filters_placement_and_state() {
        let store = AdStore::new();
        store.insert(new_ad(
            r#"{"title":"A","videoUrl":"a.mp4","durationSecs":5,"type":"pre-roll"}"#,
        ));
        store.insert(new_ad(
            r#"{"title":"B","videoUrl":"b.mp4","durationSecs":5,"type":"pre-roll","isActive":false}"#,
        ));
        store.insert(new_ad(
            r#"{"title":"C","videoUrl":"c.mp4","durationSecs":5,"type":"mid-roll"}"#,
        ));

        let pre = store.active_for(AdPlacement::PreRoll);
        assert_eq!(pre.len(), 1);
        assert_eq!(pre[0].title, "A");
        assert!(store.active_for(AdPlacement::PostRoll).is_empty());
    }

    #[test]
    fn test_update_and_remove() {
        let store = AdStore::new();
        let ad = store.insert(new_ad(
            r#"{"title":"A","videoUrl":"a.mp4","durationSecs":5}"#,
        ));
        let patch: AdPatch = serde_json::from_str(r#"{"isActive":false,"type":"post-roll"}"#).unwrap();
        let updated = store.update(ad.id, patch).unwrap();
        assert!(!updated.is_active);
        assert_eq!(updated.placement, AdPlacement::PostRoll);

        store.remove(ad.id).unwrap();
        assert!(matches!(
            store.remove(ad.id),
            Err(CatalogError::AdNotFound { .. })
        ));
    }

    #[test]
    fn test_unknown_placement_is_rejected() {
        assert!(serde_json::from_str::<NewAd>(
            r#"{"title":"A","videoUrl":"a.mp4","durationSecs":5,"type":"banner"}"#
        )
        .is_err());
    }
}
