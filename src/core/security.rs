// ---------------------------------------------------------------------------
// Request validation limits
// ---------------------------------------------------------------------------

/// Default page size for catalog listings.
pub const DEFAULT_PAGE_LIMIT: usize = 20;

/// Maximum `limit` query parameter value for list endpoints.
pub const MAX_PAGE_LIMIT: usize = 100;

/// Maximum results returned by a search.
pub const MAX_SEARCH_RESULTS: usize = 50;

/// Maximum autocomplete suggestions.
pub const MAX_AUTOCOMPLETE_RESULTS: usize = 10;

/// Maximum search query length in characters.
pub const MAX_SEARCH_QUERY_LENGTH: usize = 200;

/// Maximum title length in characters (videos and ads).
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum video description length in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;

/// Featured row size.
pub const FEATURED_LIMIT: usize = 10;

/// Trending row size.
pub const TRENDING_LIMIT: usize = 20;

/// Continue-watching row size.
pub const CONTINUE_WATCHING_LIMIT: usize = 10;

/// Validate a title: non-blank, within length.
pub fn validate_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("title must not be empty".to_string());
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(format!(
            "title exceeds max length {} chars",
            MAX_TITLE_LENGTH
        ));
    }
    Ok(())
}

/// Validate a video description length.
pub fn validate_description(description: &str) -> Result<(), String> {
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(format!(
            "description exceeds max length {} chars",
            MAX_DESCRIPTION_LENGTH
        ));
    }
    Ok(())
}

/// Validate an IMDb-style rating in [0, 10].
pub fn validate_imdb_rating(rating: Option<f32>) -> Result<(), String> {
    match rating {
        Some(r) if !(0.0..=10.0).contains(&r) => {
            Err(format!("imdbRating {} is outside 0-10", r))
        }
        _ => Ok(()),
    }
}

/// Validate a content location: relative, no parent or root components.
pub fn validate_content_location(location: &str) -> Result<(), String> {
    use std::path::{Component, Path};

    if location.is_empty() {
        return Err("content location must not be empty".to_string());
    }
    let safe = Path::new(location)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !safe {
        return Err(format!(
            "content location '{}' must be a relative path inside the media root",
            location
        ));
    }
    Ok(())
}

/// Clamp a user-supplied page limit.
pub fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_title() {
        assert!(validate_title("Night Drive").is_ok());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"t".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_imdb_rating() {
        assert!(validate_imdb_rating(None).is_ok());
        assert!(validate_imdb_rating(Some(7.5)).is_ok());
        assert!(validate_imdb_rating(Some(10.5)).is_err());
        assert!(validate_imdb_rating(Some(-0.1)).is_err());
    }

    #[test]
    fn test_validate_content_location() {
        assert!(validate_content_location("videos/a.mp4").is_ok());
        assert!(validate_content_location("./a.mp4").is_ok());
        assert!(validate_content_location("../etc/passwd").is_err());
        assert!(validate_content_location("/etc/passwd").is_err());
        assert!(validate_content_location("").is_err());
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), DEFAULT_PAGE_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(1000)), MAX_PAGE_LIMIT);
    }
}
