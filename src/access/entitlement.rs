//! Pay-per-view entitlement decisions and purchases.

use tracing::{debug, info};

use crate::catalog::purchases::PurchaseLedger;
use crate::core::error::{ApiError, PurchaseError};
use crate::core::types::{Price, PurchaseRecord, Video, Viewer};
use crate::observability::metrics as obs;

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entitlement {
    Granted,
    Denied(DenyReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The video is not visible to anyone.
    NotFound,
    /// PPV content needs a signed-in viewer.
    AuthRequired,
    /// The viewer must buy the event first.
    PurchaseRequired { price: Price },
}

impl Entitlement {
    pub fn is_granted(&self) -> bool {
        matches!(self, Entitlement::Granted)
    }

    fn outcome(&self) -> &'static str {
        match self {
            Entitlement::Granted => "granted",
            Entitlement::Denied(DenyReason::NotFound) => "not_found",
            Entitlement::Denied(DenyReason::AuthRequired) => "auth_required",
            Entitlement::Denied(DenyReason::PurchaseRequired { .. }) => "purchase_required",
        }
    }
}

impl From<DenyReason> for ApiError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::NotFound => ApiError::not_found("Video not found"),
            DenyReason::AuthRequired => {
                ApiError::auth_required("Please log in to watch this pay-per-view event")
            }
            DenyReason::PurchaseRequired { price } => ApiError::Forbidden {
                message: "Purchase required to watch this pay-per-view event".to_string(),
                ppv_price: Some(price),
            },
        }
    }
}

/// Decides who may watch what, reading purchase records only.
pub struct EntitlementGate<'a> {
    ledger: &'a PurchaseLedger,
}

impl<'a> EntitlementGate<'a> {
    pub fn new(ledger: &'a PurchaseLedger) -> Self {
        Self { ledger }
    }

    /// Decide whether `viewer` (None = anonymous) may receive bytes of `video`.
    ///
    /// Evaluated against the ledger at call time; no caching.
    pub fn check(&self, viewer: Option<&Viewer>, video: &Video) -> Entitlement {
        let decision = self.decide(viewer, video);
        obs::inc_entitlement_decision(decision.outcome());
        debug!(
            video_id = %video.id,
            viewer_id = ?viewer.map(|v| v.id),
            outcome = decision.outcome(),
            "entitlement decided"
        );
        decision
    }

    fn decide(&self, viewer: Option<&Viewer>, video: &Video) -> Entitlement {
        if !video.is_published {
            return Entitlement::Denied(DenyReason::NotFound);
        }
        if !video.is_ppv {
            return Entitlement::Granted;
        }
        let Some(viewer) = viewer else {
            return Entitlement::Denied(DenyReason::AuthRequired);
        };
        if viewer.is_premium() || self.ledger.has_purchase(viewer.id, video.id) {
            return Entitlement::Granted;
        }
        Entitlement::Denied(DenyReason::PurchaseRequired {
            price: video.ppv_price,
        })
    }

    /// Buy access to a PPV video at its current price.
    pub fn purchase(&self, viewer: &Viewer, video: &Video) -> Result<PurchaseRecord, PurchaseError> {
        let result = if !video.is_published {
            Err(PurchaseError::VideoNotFound { video_id: video.id })
        } else if !video.is_ppv {
            Err(PurchaseError::NotPpv { video_id: video.id })
        } else {
            self.ledger
                .insert_unique(viewer.id, video.id, video.ppv_price)
        };

        match &result {
            Ok(record) => {
                obs::inc_ppv_purchase("success");
                info!(
                    viewer_id = %viewer.id,
                    video_id = %video.id,
                    price = %record.price,
                    "ppv purchase recorded"
                );
            }
            Err(PurchaseError::AlreadyPurchased { .. }) => obs::inc_ppv_purchase("duplicate"),
            Err(_) => obs::inc_ppv_purchase("rejected"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::videos::tests::sample_video;
    use crate::core::types::{SubscriptionPlan, ViewerId};
    use std::sync::Arc;

    fn viewer(plan: SubscriptionPlan) -> Viewer {
        Viewer {
            id: ViewerId::new(),
            username: "v".to_string(),
            subscription: plan,
            my_list: Vec::new(),
            preferences: Default::default(),
        }
    }

    fn ppv_video() -> Video {
        let mut v = sample_video("Title Fight");
        v.is_ppv = true;
        v.ppv_price = Price::from_cents(999);
        v
    }

    #[test]
    fn test_unpublished_is_not_found_for_everyone() {
        let ledger = PurchaseLedger::new();
        let gate = EntitlementGate::new(&ledger);
        let mut video = ppv_video();
        video.is_published = false;

        let premium = viewer(SubscriptionPlan::Premium);
        assert_eq!(
            gate.check(Some(&premium), &video),
            Entitlement::Denied(DenyReason::NotFound)
        );
        assert_eq!(
            gate.check(None, &video),
            Entitlement::Denied(DenyReason::NotFound)
        );
    }

    #[test]
    fn test_free_video_is_always_granted() {
        let ledger = PurchaseLedger::new();
        let gate = EntitlementGate::new(&ledger);
        let video = sample_video("Free");
        assert!(gate.check(None, &video).is_granted());
        assert!(gate
            .check(Some(&viewer(SubscriptionPlan::Free)), &video)
            .is_granted());
    }

    #[test]
    fn test_ppv_decisions() {
        let ledger = PurchaseLedger::new();
        let gate = EntitlementGate::new(&ledger);
        let video = ppv_video();
        let free = viewer(SubscriptionPlan::Free);

        assert_eq!(
            gate.check(None, &video),
            Entitlement::Denied(DenyReason::AuthRequired)
        );
        assert_eq!(
            gate.check(Some(&free), &video),
            Entitlement::Denied(DenyReason::PurchaseRequired {
                price: Price::from_cents(999)
            })
        );
        assert!(gate
            .check(Some(&viewer(SubscriptionPlan::Premium)), &video)
            .is_granted());

        gate.purchase(&free, &video).unwrap();
        assert!(gate.check(Some(&free), &video).is_granted());
    }

    #[test]
    fn test_purchase_rules() {
        let ledger = PurchaseLedger::new();
        let gate = EntitlementGate::new(&ledger);
        let free = viewer(SubscriptionPlan::Free);

        let plain = sample_video("Plain");
        assert_eq!(
            gate.purchase(&free, &plain),
            Err(PurchaseError::NotPpv { video_id: plain.id })
        );

        let mut draft = ppv_video();
        draft.is_published = false;
        assert_eq!(
            gate.purchase(&free, &draft),
            Err(PurchaseError::VideoNotFound { video_id: draft.id })
        );

        let video = ppv_video();
        let record = gate.purchase(&free, &video).unwrap();
        assert_eq!(record.price, Price::from_cents(999));
        assert_eq!(
            gate.purchase(&free, &video),
            Err(PurchaseError::AlreadyPurchased { video_id: video.id })
        );
    }

    #[test]
    fn test_price_is_captured_at_purchase_time() {
        let ledger = PurchaseLedger::new();
        let gate = EntitlementGate::new(&ledger);
        let free = viewer(SubscriptionPlan::Free);
        let mut video = ppv_video();

        gate.purchase(&free, &video).unwrap();
        video.ppv_price = Price::from_cents(1999);
        assert!(gate.check(Some(&free), &video).is_granted());
        let records = ledger.list_for_viewer(free.id);
        assert_eq!(records[0].price, Price::from_cents(999));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_two_concurrent_purchases_make_one_record() {
        let ledger = Arc::new(PurchaseLedger::new());
        let free = viewer(SubscriptionPlan::Free);
        let video = ppv_video();

        let spawn = |ledger: Arc<PurchaseLedger>, viewer: Viewer, video: Video| {
            tokio::spawn(async move { EntitlementGate::new(&ledger).purchase(&viewer, &video) })
        };
        let a = spawn(ledger.clone(), free.clone(), video.clone());
        let b = spawn(ledger.clone(), free.clone(), video.clone());
        let results = [a.await.unwrap(), b.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(PurchaseError::AlreadyPurchased { .. })))
                .count(),
            1
        );
        assert_eq!(ledger.list_for_viewer(free.id).len(), 1);
    }
}
