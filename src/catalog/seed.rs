use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::core::error::CatalogError;
use crate::core::types::{AdId, VideoId, Viewer};

use super::ads::NewAd;
use super::videos::NewVideo;
use super::Catalog;

/// Startup seed document: `{"videos": [...], "viewers": [...], "ads": [...]}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CatalogSeed {
    pub videos: Vec<SeedVideo>,
    pub viewers: Vec<Viewer>,
    pub ads: Vec<SeedAd>,
}

/// A seeded video; ids and counters may be pinned so links stay stable.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedVideo {
    #[serde(default)]
    pub id: Option<VideoId>,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(flatten)]
    pub video: NewVideo,
}

#[derive(Debug, Deserialize)]
pub struct SeedAd {
    #[serde(default)]
    pub id: Option<AdId>,
    #[serde(flatten)]
    pub ad: NewAd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub videos: usize,
    pub viewers: usize,
    pub ads: usize,
}

/// Read and apply a JSON seed file.
pub async fn load_seed_file(path: &Path, catalog: &Catalog) -> Result<SeedSummary, CatalogError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CatalogError::Seed {
            reason: format!("cannot read {}: {e}", path.display()),
        })?;
    let seed: CatalogSeed = serde_json::from_str(&raw).map_err(|e| CatalogError::Seed {
        reason: format!("invalid seed {}: {e}", path.display()),
    })?;

    let summary = apply_seed(seed, catalog)?;
    info!(
        path = %path.display(),
        videos = summary.videos,
        viewers = summary.viewers,
        ads = summary.ads,
        "catalog seed loaded"
    );
    Ok(summary)
}

/// Validate every document, then insert them all.
///
/// Nothing is inserted if any document is invalid.
pub fn apply_seed(seed: CatalogSeed, catalog: &Catalog) -> Result<SeedSummary, CatalogError> {
    for (i, entry) in seed.videos.iter().enumerate() {
        entry.video.validate().map_err(|reason| CatalogError::Seed {
            reason: format!("video #{i} ({}): {reason}", entry.video.title),
        })?;
    }
    for (i, entry) in seed.ads.iter().enumerate() {
        entry.ad.validate().map_err(|reason| CatalogError::Seed {
            reason: format!("ad #{i}: {reason}"),
        })?;
    }

    let summary = SeedSummary {
        videos: seed.videos.len(),
        viewers: seed.viewers.len(),
        ads: seed.ads.len(),
    };

    for entry in seed.videos {
        let mut video = entry.video.into_video();
        if let Some(id) = entry.id {
            video.id = id;
        }
        video.views = entry.views;
        video.likes = entry.likes;
        catalog.videos.insert(video);
    }
    for viewer in seed.viewers {
        catalog.viewers.insert(viewer);
    }
    for entry in seed.ads {
        let mut ad = entry.ad.into_ad();
        if let Some(id) = entry.id {
            ad.id = id;
        }
        catalog.ads.insert(ad);
    }

    Ok(summary)
}
