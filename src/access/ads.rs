use rand::seq::IteratorRandom;
use rand::Rng;

use crate::core::types::{AdPlacement, Advertisement, Video};

/// Pick one active ad for `placement`, uniformly at random.
///
/// Single pass over the pool (reservoir sampling); no session affinity.
pub fn select_ad<'a, R, I>(placement: AdPlacement, pool: I, rng: &mut R) -> Option<&'a Advertisement>
where
    R: Rng + ?Sized,
    I: IntoIterator<Item = &'a Advertisement>,
{
    pool.into_iter()
        .filter(|ad| ad.is_active && ad.placement == placement)
        .choose(rng)
}

/// Whether a video shows ads at all. PPV events never do.
pub fn shows_ads(video: &Video) -> bool {
    video.is_ad_supported && !video.is_ppv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::videos::tests::sample_video;
    use crate::core::types::AdId;
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn ad(title: &str, placement: AdPlacement, active: bool) -> Advertisement {
        Advertisement {
            id: AdId::new(),
            title: title.to_string(),
            video_url: format!("ads/{title}.mp4"),
            click_through_url: String::new(),
            duration_secs: 15,
            placement,
            skip_after: 5,
            is_active: active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_pool_yields_none() {
        let mut rng = StdRng::seed_from_u64(7);
        let pool: Vec<Advertisement> = Vec::new();
        assert!(select_ad(AdPlacement::PreRoll, &pool, &mut rng).is_none());
    }

    #[test]
    fn test_only_active_matching_ads_are_chosen() {
        let pool = vec![
            ad("active", AdPlacement::PreRoll, true),
            ad("inactive", AdPlacement::PreRoll, false),
            ad("mid", AdPlacement::MidRoll, true),
        ];
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let chosen = select_ad(AdPlacement::PreRoll, &pool, &mut rng).unwrap();
            assert_eq!(chosen.title, "active");
        }
        assert!(select_ad(AdPlacement::PostRoll, &pool, &mut rng).is_none());
    }

    #[test]
    fn test_every_candidate_is_reachable() {
        let pool: Vec<Advertisement> = (0..4)
            .map(|i| ad(&format!("ad{i}"), AdPlacement::MidRoll, true))
            .collect();
        let mut rng = StdRng::seed_from_u64(1);
        let seen: HashSet<&str> = (0..400)
            .filter_map(|_| select_ad(AdPlacement::MidRoll, &pool, &mut rng))
            .map(|a| a.title.as_str())
            .collect();
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_shows_ads() {
        let mut v = sample_video("Free");
        assert!(shows_ads(&v));
        v.is_ppv = true;
        assert!(!shows_ads(&v));
        v.is_ppv = false;
        v.is_ad_supported = false;
        assert!(!shows_ads(&v));
    }
}
