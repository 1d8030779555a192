use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a catalog video (UUIDv7 for time-sortability).
    VideoId
);
uuid_id!(
    /// Unique identifier for a viewer account.
    ViewerId
);
uuid_id!(
    /// Unique identifier for an advertisement.
    AdId
);

// ---------------------------------------------------------------------------
// Money
// ---------------------------------------------------------------------------

/// A non-negative amount of money held as integer cents.
///
/// On the wire it is a plain decimal number (`9.99`), which is what the
/// front end renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price {
    cents: u64,
}

impl Price {
    pub const ZERO: Price = Price { cents: 0 };

    pub fn from_cents(cents: u64) -> Self {
        Self { cents }
    }

    pub fn cents(&self) -> u64 {
        self.cents
    }

    pub fn as_decimal(&self) -> f64 {
        self.cents as f64 / 100.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_decimal())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() || value < 0.0 {
            return Err(serde::de::Error::custom(format!(
                "price must be a non-negative number, got {value}"
            )));
        }
        Ok(Price::from_cents((value * 100.0).round() as u64))
    }
}

// ---------------------------------------------------------------------------
// Closed enumerations
// ---------------------------------------------------------------------------

/// Viewer subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    #[default]
    Free,
    Premium,
}

impl fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionPlan::Free => write!(f, "free"),
            SubscriptionPlan::Premium => write!(f, "premium"),
        }
    }
}

/// Ad placement slot relative to content playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdPlacement {
    #[default]
    PreRoll,
    MidRoll,
    PostRoll,
}

impl AdPlacement {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdPlacement::PreRoll => "pre-roll",
            AdPlacement::MidRoll => "mid-roll",
            AdPlacement::PostRoll => "post-roll",
        }
    }
}

impl fmt::Display for AdPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdPlacement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre-roll" => Ok(AdPlacement::PreRoll),
            "mid-roll" => Ok(AdPlacement::MidRoll),
            "post-roll" => Ok(AdPlacement::PostRoll),
            other => Err(format!(
                "invalid ad type '{other}', expected pre-roll, mid-roll or post-roll"
            )),
        }
    }
}

/// Content rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rating {
    #[serde(rename = "G")]
    G,
    #[serde(rename = "PG")]
    Pg,
    #[default]
    #[serde(rename = "PG-13")]
    Pg13,
    #[serde(rename = "R")]
    R,
    #[serde(rename = "NC-17")]
    Nc17,
    #[serde(rename = "TV-Y")]
    TvY,
    #[serde(rename = "TV-Y7")]
    TvY7,
    #[serde(rename = "TV-G")]
    TvG,
    #[serde(rename = "TV-PG")]
    TvPg,
    #[serde(rename = "TV-14")]
    Tv14,
    #[serde(rename = "TV-MA")]
    TvMa,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::G => "G",
            Rating::Pg => "PG",
            Rating::Pg13 => "PG-13",
            Rating::R => "R",
            Rating::Nc17 => "NC-17",
            Rating::TvY => "TV-Y",
            Rating::TvY7 => "TV-Y7",
            Rating::TvG => "TV-G",
            Rating::TvPg => "TV-PG",
            Rating::Tv14 => "TV-14",
            Rating::TvMa => "TV-MA",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoded rendition quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "360")]
    P360,
    #[serde(rename = "480")]
    P480,
    #[serde(rename = "720")]
    P720,
    #[serde(rename = "1080")]
    P1080,
    #[serde(rename = "4k")]
    Uhd4k,
}

// ---------------------------------------------------------------------------
// Catalog documents
// ---------------------------------------------------------------------------

/// An alternative rendition of a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityVariant {
    pub quality: Quality,
    pub location: String,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// A catalog video.
///
/// `content_location` is the path of the backing file relative to the
/// media root. Content length is never stored; it is read from the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: VideoId,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub content_location: String,
    pub qualities: Vec<QualityVariant>,
    pub duration_secs: u32,
    pub release_year: u16,
    pub genres: Vec<String>,
    pub category: Option<String>,
    pub cast: Vec<CastMember>,
    pub director: Option<String>,
    pub rating: Rating,
    pub imdb_rating: Option<f32>,
    pub views: u64,
    pub likes: u64,
    pub featured: bool,
    pub trending: bool,
    pub is_published: bool,
    pub is_ppv: bool,
    pub ppv_price: Price,
    pub is_ad_supported: bool,
    pub tags: Vec<String>,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A viewer account as seen by the access layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewer {
    pub id: ViewerId,
    pub username: String,
    #[serde(default)]
    pub subscription: SubscriptionPlan,
    #[serde(default)]
    pub my_list: Vec<VideoId>,
    #[serde(default)]
    pub preferences: ViewerPreferences,
}

/// Player settings a viewer chooses for themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerPreferences {
    #[serde(default)]
    pub favorite_genres: Vec<String>,
    #[serde(default)]
    pub preferred_quality: Option<Quality>,
    #[serde(default = "default_autoplay")]
    pub autoplay: bool,
}

fn default_autoplay() -> bool {
    true
}

impl Default for ViewerPreferences {
    fn default() -> Self {
        Self {
            favorite_genres: Vec::new(),
            preferred_quality: None,
            autoplay: true,
        }
    }
}

impl Viewer {
    pub fn is_premium(&self) -> bool {
        self.subscription == SubscriptionPlan::Premium
    }
}

/// A pay-per-view purchase. Created once per (viewer, video), never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    pub viewer_id: ViewerId,
    pub video_id: VideoId,
    pub purchased_at: DateTime<Utc>,
    pub price: Price,
}

/// An advertisement in the ad pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advertisement {
    pub id: AdId,
    pub title: String,
    pub video_url: String,
    pub click_through_url: String,
    pub duration_secs: u32,
    #[serde(rename = "type")]
    pub placement: AdPlacement,
    /// Seconds before the viewer may skip; 0 means non-skippable.
    pub skip_after: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Playback progress of one viewer on one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchHistoryEntry {
    pub viewer_id: ViewerId,
    pub video_id: VideoId,
    pub progress_secs: u32,
    pub completed: bool,
    pub last_watched: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_wire_format() {
        let price: Price = serde_json::from_str("9.99").unwrap();
        assert_eq!(price.cents(), 999);
        assert_eq!(serde_json::to_string(&price).unwrap(), "9.99");
        assert_eq!(price.to_string(), "9.99");
    }

    #[test]
    fn test_price_rejects_negative() {
        assert!(serde_json::from_str::<Price>("-1.0").is_err());
    }

    #[test]
    fn test_placement_kebab_case() {
        let p: AdPlacement = serde_json::from_str("\"mid-roll\"").unwrap();
        assert_eq!(p, AdPlacement::MidRoll);
        assert!(serde_json::from_str::<AdPlacement>("\"midroll\"").is_err());
        assert_eq!("post-roll".parse::<AdPlacement>(), Ok(AdPlacement::PostRoll));
        assert!("banner".parse::<AdPlacement>().is_err());
    }

    #[test]
    fn test_rating_names() {
        let r: Rating = serde_json::from_str("\"TV-MA\"").unwrap();
        assert_eq!(r, Rating::TvMa);
        assert_eq!(serde_json::to_string(&Rating::Pg13).unwrap(), "\"PG-13\"");
    }

    #[test]
    fn test_viewer_preferences_default_on_missing() {
        let v: Viewer = serde_json::from_str(&format!(
            r#"{{"id":"{}","username":"bob"}}"#,
            ViewerId::new()
        ))
        .unwrap();
        assert!(v.preferences.autoplay);
        assert_eq!(v.preferences.preferred_quality, None);
        assert_eq!(v.subscription, SubscriptionPlan::Free);
    }

    #[test]
    fn test_id_parse_roundtrip() {
        let id = VideoId::new();
        let parsed: VideoId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<VideoId>().is_err());
    }
}
