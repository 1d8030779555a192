//! Catalog search and title autocomplete.
//!
//! Matching is a case-insensitive literal substring test; the query is never
//! interpreted as a pattern.

use std::cmp::Ordering;

use serde::Deserialize;

use crate::core::security::{MAX_AUTOCOMPLETE_RESULTS, MAX_SEARCH_RESULTS};
use crate::core::types::{Rating, Video};

use super::videos::VideoCatalog;

/// Result ordering for `GET /search`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSort {
    /// Most viewed first.
    #[default]
    Views,
    Newest,
    Oldest,
    /// Highest IMDb rating first; unrated last.
    Rating,
}

#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub genre: Option<String>,
    pub year: Option<u16>,
    pub rating: Option<Rating>,
    pub sort: SearchSort,
}

/// Published videos matching `query`, at most [`MAX_SEARCH_RESULTS`].
///
/// `query` must already be trimmed and non-empty.
pub fn search(catalog: &VideoCatalog, query: &str, filter: &SearchFilter) -> Vec<Video> {
    let needle = query.to_lowercase();
    let mut hits: Vec<Video> = catalog
        .published()
        .into_iter()
        .filter(|v| matches_text(v, &needle) && matches_filter(v, filter))
        .collect();

    hits.sort_by(|a, b| compare(a, b, filter.sort));
    hits.truncate(MAX_SEARCH_RESULTS);
    hits
}

/// Titles of published videos containing `query`. A blank query yields nothing.
pub fn autocomplete(catalog: &VideoCatalog, query: &str) -> Vec<String> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<Video> = catalog
        .published()
        .into_iter()
        .filter(|v| v.title.to_lowercase().contains(&needle))
        .collect();
    hits.sort_by(|a, b| b.views.cmp(&a.views).then_with(|| a.title.cmp(&b.title)));
    hits.into_iter()
        .take(MAX_AUTOCOMPLETE_RESULTS)
        .map(|v| v.title)
        .collect()
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn matches_text(video: &Video, needle: &str) -> bool {
    contains(&video.title, needle)
        || contains(&video.description, needle)
        || video.tags.iter().any(|t| contains(t, needle))
        || video.cast.iter().any(|c| contains(&c.name, needle))
        || video.director.as_deref().is_some_and(|d| contains(d, needle))
}

fn matches_filter(video: &Video, filter: &SearchFilter) -> bool {
    if let Some(genre) = &filter.genre {
        if !video.genres.iter().any(|g| g.eq_ignore_ascii_case(genre)) {
            return false;
        }
    }
    if filter.year.is_some_and(|y| video.release_year != y) {
        return false;
    }
    if filter.rating.is_some_and(|r| video.rating != r) {
        return false;
    }
    true
}

fn compare(a: &Video, b: &Video, sort: SearchSort) -> Ordering {
    let primary = match sort {
        SearchSort::Views => b.views.cmp(&a.views),
        SearchSort::Newest => b.created_at.cmp(&a.created_at),
        SearchSort::Oldest => a.created_at.cmp(&b.created_at),
        SearchSort::Rating => {
            let ra = a.imdb_rating.unwrap_or(f32::NEG_INFINITY);
            let rb = b.imdb_rating.unwrap_or(f32::NEG_INFINITY);
            rb.total_cmp(&ra)
        }
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::videos::tests::sample_video;
    use crate::core::types::CastMember;

    fn catalog() -> VideoCatalog {
        let catalog = VideoCatalog::new();

        let mut a = sample_video("The Long Night");
        a.views = 10;
        a.imdb_rating = Some(7.5);
        a.release_year = 2020;
        a.cast = vec![CastMember {
            name: "Ada Stone".to_string(),
            role: None,
        }];
        catalog.insert(a);

        let mut b = sample_video("Night Shift");
        b.views = 100;
        b.imdb_rating = Some(6.0);
        b.rating = Rating::R;
        b.genres = vec!["Thriller".to_string()];
        catalog.insert(b);

        let mut c = sample_video("Sunrise");
        c.tags = vec!["night-owl".to_string()];
        c.director = Some("Jo Nightingale".to_string());
        c.views = 50;
        catalog.insert(c);

        let mut hidden = sample_video("Night Draft");
        hidden.is_published = false;
        catalog.insert(hidden);

        catalog
    }

    fn titles(videos: Vec<Video>) -> Vec<String> {
        videos.into_iter().map(|v| v.title).collect()
    }

    #[test]
    fn test_search_matches_all_text_fields_sorted_by_views() {
        let hits = search(&catalog(), "night", &SearchFilter::default());
        assert_eq!(
            titles(hits),
            vec!["Night Shift", "Sunrise", "The Long Night"]
        );
    }

    #[test]
    fn test_search_matches_cast() {
        let hits = search(&catalog(), "ada", &SearchFilter::default());
        assert_eq!(titles(hits), vec!["The Long Night"]);
    }

    #[test]
    fn test_search_is_literal() {
        assert!(search(&catalog(), ".*", &SearchFilter::default()).is_empty());
    }

    #[test]
    fn test_search_filters() {
        let by_genre = SearchFilter {
            genre: Some("thriller".to_string()),
            ..Default::default()
        };
        assert_eq!(titles(search(&catalog(), "night", &by_genre)), vec!["Night Shift"]);

        let by_year = SearchFilter {
            year: Some(2020),
            ..Default::default()
        };
        assert_eq!(
            titles(search(&catalog(), "night", &by_year)),
            vec!["The Long Night"]
        );

        let by_rating = SearchFilter {
            rating: Some(Rating::R),
            ..Default::default()
        };
        assert_eq!(
            titles(search(&catalog(), "night", &by_rating)),
            vec!["Night Shift"]
        );
    }

    #[test]
    fn test_search_sort_by_rating_puts_unrated_last() {
        let filter = SearchFilter {
            sort: SearchSort::Rating,
            ..Default::default()
        };
        assert_eq!(
            titles(search(&catalog(), "night", &filter)),
            vec!["The Long Night", "Night Shift", "Sunrise"]
        );
    }

    #[test]
    fn test_autocomplete() {
        let c = catalog();
        assert_eq!(autocomplete(&c, "NIGHT"), vec!["Night Shift", "The Long Night"]);
        assert!(autocomplete(&c, "   ").is_empty());
    }
}
