use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::core::error::PurchaseError;
use crate::core::types::{Price, PurchaseRecord, VideoId, ViewerId};

/// Pay-per-view purchase records, unique on (viewer, video).
///
/// Records are append-only: there is no update or delete.
#[derive(Default)]
pub struct PurchaseLedger {
    records: DashMap<(ViewerId, VideoId), PurchaseRecord>,
}

impl PurchaseLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a purchase at `price`.
    ///
    /// The occupied/vacant check and the insert happen under one shard lock,
    /// so of two racing calls for the same pair exactly one succeeds.
    pub fn insert_unique(
        &self,
        viewer_id: ViewerId,
        video_id: VideoId,
        price: Price,
    ) -> Result<PurchaseRecord, PurchaseError> {
        match self.records.entry((viewer_id, video_id)) {
            Entry::Occupied(_) => Err(PurchaseError::AlreadyPurchased { video_id }),
            Entry::Vacant(slot) => {
                let record = PurchaseRecord {
                    viewer_id,
                    video_id,
                    purchased_at: Utc::now(),
                    price,
                };
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    pub fn has_purchase(&self, viewer_id: ViewerId, video_id: VideoId) -> bool {
        self.records.contains_key(&(viewer_id, video_id))
    }

    /// All purchases of one viewer, most recent first.
    pub fn list_for_viewer(&self, viewer_id: ViewerId) -> Vec<PurchaseRecord> {
        let mut records: Vec<PurchaseRecord> = self
            .records
            .iter()
            .filter(|r| r.viewer_id == viewer_id)
            .map(|r| r.clone())
            .collect();
        records.sort_by(|a, b| b.purchased_at.cmp(&a.purchased_at));
        records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
