//! In-process document store.
//!
//! Each collection is its own `DashMap`-backed table; uniqueness constraints
//! ((viewer, video) for purchases and history) are the table keys.

pub mod ads;
pub mod history;
pub mod purchases;
pub mod search;
pub mod seed;
pub mod videos;
pub mod viewers;

use self::ads::AdStore;
use self::history::WatchHistoryStore;
use self::purchases::PurchaseLedger;
use self::videos::VideoCatalog;
use self::viewers::ViewerDirectory;

/// All collections, shared by handlers behind one `Arc`.
#[derive(Default)]
pub struct Catalog {
    pub videos: VideoCatalog,
    pub viewers: ViewerDirectory,
    pub purchases: PurchaseLedger,
    pub history: WatchHistoryStore,
    pub ads: AdStore,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }
}
