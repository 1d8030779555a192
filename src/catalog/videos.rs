use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::error::CatalogError;
use crate::core::security::{
    validate_content_location, validate_description, validate_imdb_rating, validate_title,
    FEATURED_LIMIT, TRENDING_LIMIT,
};
use crate::core::types::{
    CastMember, Price, Quality, QualityVariant, Rating, Video, VideoId,
};
use crate::observability::metrics as obs;

// ---------------------------------------------------------------------------
// VideoCatalog
// ---------------------------------------------------------------------------

/// Video documents keyed by id.
///
/// Backed by `DashMap`; every mutation happens under the entry's shard lock,
/// so concurrent likes and view increments never lose updates.
#[derive(Default)]
pub struct VideoCatalog {
    videos: DashMap<VideoId, Video>,
}

/// One page of a listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.limit.max(1))
    }
}

impl VideoCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    /// Insert or replace a video document.
    pub fn insert(&self, video: Video) -> Video {
        let id = video.id;
        self.videos.insert(id, video.clone());
        obs::set_catalog_videos(self.videos.len() as f64);
        debug!(video_id = %id, "video stored");
        video
    }

    /// Fetch a video regardless of publication state.
    pub fn get(&self, id: VideoId) -> Option<Video> {
        self.videos.get(&id).map(|v| v.clone())
    }

    /// Fetch a video only if it is published.
    pub fn get_published(&self, id: VideoId) -> Result<Video, CatalogError> {
        self.videos
            .get(&id)
            .filter(|v| v.is_published)
            .map(|v| v.clone())
            .ok_or(CatalogError::VideoNotFound { video_id: id })
    }

    /// All published videos, in no particular order.
    pub fn published(&self) -> Vec<Video> {
        self.videos
            .iter()
            .filter(|v| v.is_published)
            .map(|v| v.clone())
            .collect()
    }

    /// Published videos, newest first, optionally restricted to one genre.
    ///
    /// `page` is 1-based; a page past the end is empty.
    pub fn list_published(&self, genre: Option<&str>, page: usize, limit: usize) -> Page<Video> {
        let mut matching: Vec<Video> = self
            .videos
            .iter()
            .filter(|v| v.is_published && genre.map_or(true, |g| has_genre(v, g)))
            .map(|v| v.clone())
            .collect();
        sort_newest_first(&mut matching);

        let page = page.max(1);
        let limit = limit.max(1);
        let total = matching.len();
        let items = matching
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .collect();

        Page {
            items,
            total,
            page,
            limit,
        }
    }

    pub fn featured(&self) -> Vec<Video> {
        let mut videos: Vec<Video> = self
            .videos
            .iter()
            .filter(|v| v.is_published && v.featured)
            .map(|v| v.clone())
            .collect();
        sort_newest_first(&mut videos);
        videos.truncate(FEATURED_LIMIT);
        videos
    }

    /// Trending published videos, most viewed first.
    pub fn trending(&self) -> Vec<Video> {
        let mut videos: Vec<Video> = self
            .videos
            .iter()
            .filter(|v| v.is_published && v.trending)
            .map(|v| v.clone())
            .collect();
        videos.sort_by(|a, b| b.views.cmp(&a.views));
        videos.truncate(TRENDING_LIMIT);
        videos
    }

    pub fn by_genre(&self, genre: &str) -> Vec<Video> {
        let mut videos: Vec<Video> = self
            .videos
            .iter()
            .filter(|v| v.is_published && has_genre(v, genre))
            .map(|v| v.clone())
            .collect();
        sort_newest_first(&mut videos);
        videos
    }

    /// Published videos in `category` (case-insensitive), newest first.
    pub fn by_category(&self, category: &str) -> Vec<Video> {
        let mut videos: Vec<Video> = self
            .videos
            .iter()
            .filter(|v| {
                v.is_published
                    && v
                        .category
                        .as_deref()
                        .is_some_and(|c| c.eq_ignore_ascii_case(category.trim()))
            })
            .map(|v| v.clone())
            .collect();
        sort_newest_first(&mut videos);
        videos
    }

    /// Apply a partial metadata update.
    pub fn update(&self, id: VideoId, patch: VideoPatch) -> Result<Video, CatalogError> {
        let mut entry = self
            .videos
            .get_mut(&id)
            .ok_or(CatalogError::VideoNotFound { video_id: id })?;
        patch.apply(&mut entry);
        entry.updated_at = Utc::now();
        let updated = entry.clone();
        drop(entry);

        info!(video_id = %id, "video metadata updated");
        Ok(updated)
    }

    /// Flip `is_published` and return the updated document.
    pub fn toggle_publish(&self, id: VideoId) -> Result<Video, CatalogError> {
        let mut entry = self
            .videos
            .get_mut(&id)
            .ok_or(CatalogError::VideoNotFound { video_id: id })?;
        entry.is_published = !entry.is_published;
        entry.updated_at = Utc::now();
        let updated = entry.clone();
        drop(entry);

        info!(video_id = %id, published = updated.is_published, "video publish toggled");
        Ok(updated)
    }

    /// Add one like to a published video and return the new count.
    pub fn like(&self, id: VideoId) -> Result<u64, CatalogError> {
        let mut entry = self
            .videos
            .get_mut(&id)
            .filter(|v| v.is_published)
            .ok_or(CatalogError::VideoNotFound { video_id: id })?;
        entry.likes = entry.likes.saturating_add(1);
        Ok(entry.likes)
    }

    /// Add one view. Returns false if the video no longer exists.
    pub fn increment_views(&self, id: VideoId) -> bool {
        match self.videos.get_mut(&id) {
            Some(mut entry) => {
                entry.views = entry.views.saturating_add(1);
                true
            }
            None => false,
        }
    }

    /// Remove a video document and return it.
    pub fn remove(&self, id: VideoId) -> Option<Video> {
        let removed = self.videos.remove(&id).map(|(_, v)| v);
        obs::set_catalog_videos(self.videos.len() as f64);
        removed
    }
}

fn has_genre(video: &Video, genre: &str) -> bool {
    video.genres.iter().any(|g| g.eq_ignore_ascii_case(genre))
}

fn sort_newest_first(videos: &mut [Video]) {
    videos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

// ---------------------------------------------------------------------------
// Admin input documents
// ---------------------------------------------------------------------------

/// Body of `POST /videos`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVideo {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub thumbnail: String,
    pub content_location: String,
    #[serde(default)]
    pub qualities: Vec<QualityVariant>,
    #[serde(default)]
    pub duration_secs: u32,
    #[serde(default)]
    pub release_year: u16,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub rating: Rating,
    #[serde(default)]
    pub imdb_rating: Option<f32>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub trending: bool,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub is_ppv: bool,
    #[serde(default)]
    pub ppv_price: Price,
    #[serde(default = "default_ad_supported")]
    pub is_ad_supported: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_ad_supported() -> bool {
    true
}

fn default_language() -> String {
    "English".to_string()
}

impl NewVideo {
    pub fn validate(&self) -> Result<(), String> {
        validate_title(&self.title)?;
        validate_description(&self.description)?;
        validate_imdb_rating(self.imdb_rating)?;
        validate_content_location(&self.content_location)?;
        if self.is_ppv && self.ppv_price == Price::ZERO {
            return Err("pay-per-view videos need a non-zero ppvPrice".to_string());
        }
        Ok(())
    }

    pub fn into_video(self) -> Video {
        let now = Utc::now();
        Video {
            id: VideoId::new(),
            title: self.title.trim().to_string(),
            description: self.description,
            thumbnail: self.thumbnail,
            content_location: self.content_location,
            qualities: self.qualities,
            duration_secs: self.duration_secs,
            release_year: self.release_year,
            genres: self.genres,
            category: self.category,
            cast: self.cast,
            director: self.director,
            rating: self.rating,
            imdb_rating: self.imdb_rating,
            views: 0,
            likes: 0,
            featured: self.featured,
            trending: self.trending,
            is_published: self.is_published,
            is_ppv: self.is_ppv,
            ppv_price: self.ppv_price,
            is_ad_supported: self.is_ad_supported,
            tags: self.tags,
            language: self.language,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Body of `PUT /videos/{id}`. Absent fields are left unchanged.
///
/// Counters (`views`, `likes`) and identity are not editable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub content_location: Option<String>,
    pub qualities: Option<Vec<QualityVariant>>,
    pub duration_secs: Option<u32>,
    pub release_year: Option<u16>,
    pub genres: Option<Vec<String>>,
    pub category: Option<String>,
    pub cast: Option<Vec<CastMember>>,
    pub director: Option<String>,
    pub rating: Option<Rating>,
    pub imdb_rating: Option<f32>,
    pub featured: Option<bool>,
    pub trending: Option<bool>,
    pub is_published: Option<bool>,
    pub is_ppv: Option<bool>,
    pub ppv_price: Option<Price>,
    pub is_ad_supported: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub language: Option<String>,
}

impl VideoPatch {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        validate_imdb_rating(self.imdb_rating)?;
        if let Some(location) = &self.content_location {
            validate_content_location(location)?;
        }
        Ok(())
    }

    fn apply(self, video: &mut Video) {
        if let Some(title) = self.title {
            video.title = title.trim().to_string();
        }
        replace(&mut video.description, self.description);
        replace(&mut video.thumbnail, self.thumbnail);
        replace(&mut video.content_location, self.content_location);
        replace(&mut video.qualities, self.qualities);
        replace(&mut video.duration_secs, self.duration_secs);
        replace(&mut video.release_year, self.release_year);
        replace(&mut video.genres, self.genres);
        replace(&mut video.cast, self.cast);
        replace(&mut video.rating, self.rating);
        replace(&mut video.featured, self.featured);
        replace(&mut video.trending, self.trending);
        replace(&mut video.is_published, self.is_published);
        replace(&mut video.is_ppv, self.is_ppv);
        replace(&mut video.ppv_price, self.ppv_price);
        replace(&mut video.is_ad_supported, self.is_ad_supported);
        replace(&mut video.tags, self.tags);
        replace(&mut video.language, self.language);
        if self.category.is_some() {
            video.category = self.category;
        }
        if self.director.is_some() {
            video.director = self.director;
        }
        if self.imdb_rating.is_some() {
            video.imdb_rating = self.imdb_rating;
        }
    }
}

fn replace<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

// ---------------------------------------------------------------------------
// Public view
// ---------------------------------------------------------------------------

/// A video as shown to clients: the backing file location is withheld.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicVideo<'a> {
    pub id: VideoId,
    pub title: &'a str,
    pub description: &'a str,
    pub thumbnail: &'a str,
    pub qualities: Vec<Quality>,
    pub duration_secs: u32,
    pub release_year: u16,
    pub genres: &'a [String],
    pub category: Option<&'a str>,
    pub cast: &'a [CastMember],
    pub director: Option<&'a str>,
    pub rating: Rating,
    pub imdb_rating: Option<f32>,
    pub views: u64,
    pub likes: u64,
    pub featured: bool,
    pub trending: bool,
    pub is_ppv: bool,
    pub ppv_price: Price,
    pub is_ad_supported: bool,
    pub tags: &'a [String],
    pub language: &'a str,
    pub created_at: chrono::DateTime<Utc>,
}

impl<'a> From<&'a Video> for PublicVideo<'a> {
    fn from(v: &'a Video) -> Self {
        PublicVideo {
            id: v.id,
            title: &v.title,
            description: &v.description,
            thumbnail: &v.thumbnail,
            qualities: v.qualities.iter().map(|q| q.quality).collect(),
            duration_secs: v.duration_secs,
            release_year: v.release_year,
            genres: &v.genres,
            category: v.category.as_deref(),
            cast: &v.cast,
            director: v.director.as_deref(),
            rating: v.rating,
            imdb_rating: v.imdb_rating,
            views: v.views,
            likes: v.likes,
            featured: v.featured,
            trending: v.trending,
            is_ppv: v.is_ppv,
            ppv_price: v.ppv_price,
            is_ad_supported: v.is_ad_supported,
            tags: &v.tags,
            language: &v.language,
            created_at: v.created_at,
        }
    }
}

pub fn public_list(videos: &[Video]) -> Vec<PublicVideo<'_>> {
    videos.iter().map(PublicVideo::from).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) fn sample_video(title: &str) -> Video {
        NewVideo {
            title: title.to_string(),
            description: format!("{title} description"),
            thumbnail: String::new(),
            content_location: format!("{}.mp4", title.to_lowercase().replace(' ', "_")),
            qualities: Vec::new(),
            duration_secs: 60,
            release_year: 2024,
            genres: vec!["Drama".to_string()],
            category: None,
            cast: Vec::new(),
            director: None,
            rating: Rating::default(),
            imdb_rating: None,
            featured: false,
            trending: false,
            is_published: true,
            is_ppv: false,
            ppv_price: Price::ZERO,
            is_ad_supported: true,
            tags: Vec::new(),
            language: default_language(),
        }
        .into_video()
    }

    #[test]
    fn test_get_published_hides_drafts() {
        let catalog = VideoCatalog::new();
        let mut draft = sample_video("Draft");
        draft.is_published = false;
        let draft = catalog.insert(draft);

        assert!(catalog.get(draft.id).is_some());
        assert!(matches!(
            catalog.get_published(draft.id),
            Err(CatalogError::VideoNotFound { .. })
        ));
    }

    #[test]
    fn test_list_pagination_newest_first() {
        let catalog = VideoCatalog::new();
        let base = Utc::now();
        for i in 0..5 {
            let mut v = sample_video(&format!("Video {i}"));
            v.created_at = base + Duration::seconds(i);
            catalog.insert(v);
        }
        let mut hidden = sample_video("Hidden");
        hidden.is_published = false;
        catalog.insert(hidden);

        let page = catalog.list_published(None, 1, 2);
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages(), 3);
        assert_eq!(page.items[0].title, "Video 4");
        assert_eq!(page.items[1].title, "Video 3");

        let last = catalog.list_published(None, 3, 2);
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].title, "Video 0");

        assert!(catalog.list_published(None, 9, 2).items.is_empty());
    }

    #[test]
    fn test_genre_filter_is_case_insensitive() {
        let catalog = VideoCatalog::new();
        let mut action = sample_video("Action");
        action.genres = vec!["Action".to_string()];
        catalog.insert(action);
        catalog.insert(sample_video("Drama"));

        assert_eq!(catalog.by_genre("action").len(), 1);
        assert_eq!(catalog.list_published(Some("ACTION"), 1, 20).total, 1);
    }

    #[test]
    fn test_by_category_published_newest_first() {
        let catalog = VideoCatalog::new();
        let mut older = sample_video("Older Doc");
        older.category = Some("Documentary".to_string());
        older.created_at -= Duration::days(1);
        let mut newer = sample_video("Newer Doc");
        newer.category = Some("Documentary".to_string());
        let mut draft = sample_video("Draft Doc");
        draft.category = Some("Documentary".to_string());
        draft.is_published = false;
        catalog.insert(older);
        catalog.insert(newer);
        catalog.insert(draft);
        catalog.insert(sample_video("Uncategorised"));

        let titles: Vec<String> = catalog
            .by_category("documentary")
            .into_iter()
            .map(|v| v.title)
            .collect();
        assert_eq!(titles, vec!["Newer Doc", "Older Doc"]);
        assert!(catalog.by_category("Sports").is_empty());
    }

    #[test]
    fn test_trending_sorted_by_views() {
        let catalog = VideoCatalog::new();
        for (title, views) in [("A", 5), ("B", 50), ("C", 10)] {
            let mut v = sample_video(title);
            v.trending = true;
            v.views = views;
            catalog.insert(v);
        }
        let titles: Vec<String> = catalog.trending().into_iter().map(|v| v.title).collect();
        assert_eq!(titles, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_featured_is_capped() {
        let catalog = VideoCatalog::new();
        for i in 0..15 {
            let mut v = sample_video(&format!("F{i}"));
            v.featured = true;
            catalog.insert(v);
        }
        assert_eq!(catalog.featured().len(), FEATURED_LIMIT);
    }

    #[test]
    fn test_update_applies_only_present_fields() {
        let catalog = VideoCatalog::new();
        let v = catalog.insert(sample_video("Original"));
        let patch: VideoPatch =
            serde_json::from_str(r#"{"title":"  Renamed ","isPpv":true,"ppvPrice":4.5}"#)
                .unwrap();
        let updated = catalog.update(v.id, patch).unwrap();
        assert_eq!(updated.title, "Renamed");
        assert!(updated.is_ppv);
        assert_eq!(updated.ppv_price, Price::from_cents(450));
        assert_eq!(updated.description, v.description);
    }

    #[test]
    fn test_toggle_publish() {
        let catalog = VideoCatalog::new();
        let v = catalog.insert(sample_video("Toggle"));
        assert!(!catalog.toggle_publish(v.id).unwrap().is_published);
        assert!(catalog.toggle_publish(v.id).unwrap().is_published);
    }

    #[test]
    fn test_like_and_views_are_counters() {
        let catalog = VideoCatalog::new();
        let v = catalog.insert(sample_video("Counted"));
        assert_eq!(catalog.like(v.id).unwrap(), 1);
        assert_eq!(catalog.like(v.id).unwrap(), 2);
        assert!(catalog.increment_views(v.id));
        assert_eq!(catalog.get(v.id).unwrap().views, 1);
        assert!(!catalog.increment_views(VideoId::new()));
    }

    #[test]
    fn test_new_video_validation() {
        let mut input: NewVideo = serde_json::from_str(
            r#"{"title":"T","description":"D","contentLocation":"a.mp4","isPpv":true}"#,
        )
        .unwrap();
        assert!(input.is_ad_supported);
        assert_eq!(input.language, "English");
        assert!(input.validate().is_err());

        input.ppv_price = Price::from_cents(999);
        assert!(input.validate().is_ok());

        input.content_location = "../etc/passwd".to_string();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_public_view_withholds_location() {
        let v = sample_video("Secret Path");
        let json = serde_json::to_value(PublicVideo::from(&v)).unwrap();
        assert!(json.get("contentLocation").is_none());
        assert_eq!(json["title"], "Secret Path");
        assert_eq!(json["ppvPrice"], 0.0);
    }
}
