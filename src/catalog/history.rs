use chrono::Utc;
use dashmap::DashMap;

use crate::core::security::CONTINUE_WATCHING_LIMIT;
use crate::core::types::{VideoId, ViewerId, WatchHistoryEntry};

/// Playback progress, one entry per (viewer, video).
#[derive(Default)]
pub struct WatchHistoryStore {
    entries: DashMap<(ViewerId, VideoId), WatchHistoryEntry>,
}

impl WatchHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or update the entry and stamp `last_watched`.
    ///
    /// `completed` of `None` keeps the current flag (false for a new entry).
    pub fn upsert(
        &self,
        viewer_id: ViewerId,
        video_id: VideoId,
        progress_secs: u32,
        completed: Option<bool>,
    ) -> WatchHistoryEntry {
        let now = Utc::now();
        let mut entry = self
            .entries
            .entry((viewer_id, video_id))
            .or_insert_with(|| WatchHistoryEntry {
                viewer_id,
                video_id,
                progress_secs: 0,
                completed: false,
                last_watched: now,
            });
        entry.progress_secs = progress_secs;
        if let Some(completed) = completed {
            entry.completed = completed;
        }
        entry.last_watched = now;
        entry.clone()
    }

    /// The viewer's history, most recently watched first.
    pub fn list(&self, viewer_id: ViewerId) -> Vec<WatchHistoryEntry> {
        let mut entries: Vec<WatchHistoryEntry> = self
            .entries
            .iter()
            .filter(|e| e.viewer_id == viewer_id)
            .map(|e| e.clone())
            .collect();
        entries.sort_by(|a, b| b.last_watched.cmp(&a.last_watched));
        entries
    }

    /// Started but unfinished videos, most recent first.
    pub fn continue_watching(&self, viewer_id: ViewerId) -> Vec<WatchHistoryEntry> {
        let mut entries = self.list(viewer_id);
        entries.retain(|e| !e.completed && e.progress_secs > 0);
        entries.truncate(CONTINUE_WATCHING_LIMIT);
        entries
    }

    pub fn remove(&self, viewer_id: ViewerId, video_id: VideoId) {
        self.entries.remove(&(viewer_id, video_id));
    }

    /// Remove all of a viewer's entries; returns how many were removed.
    pub fn clear(&self, viewer_id: ViewerId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(viewer, _), _| *viewer != viewer_id);
        before.saturating_sub(self.entries.len())
    }

    /// Drop every viewer's entry for a deleted video.
    pub fn forget_video(&self, video_id: VideoId) {
        self.entries.retain(|(_, video), _| *video != video_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_keeps_one_entry_per_pair() {
        let store = WatchHistoryStore::new();
        let (viewer, video) = (ViewerId::new(), VideoId::new());

        store.upsert(viewer, video, 10, None);
        let entry = store.upsert(viewer, video, 42, None);
        assert_eq!(entry.progress_secs, 42);
        assert!(!entry.completed);
        assert_eq!(store.list(viewer).len(), 1);

        let entry = store.upsert(viewer, video, 50, Some(true));
        assert!(entry.completed);
        let entry = store.upsert(viewer, video, 55, None);
        assert!(entry.completed);
    }

    #[test]
    fn test_continue_watching_filters_and_orders() {
        let store = WatchHistoryStore::new();
        let viewer = ViewerId::new();
        let (a, b, c, d) = (VideoId::new(), VideoId::new(), VideoId::new(), VideoId::new());

        store.upsert(viewer, a, 10, None);
        store.upsert(viewer, b, 0, None);
        store.upsert(viewer, c, 30, Some(true));
        std::thread::sleep(std::time::Duration::from_millis(2));
        store.upsert(viewer, d, 20, None);

        let ids: Vec<VideoId> = store
            .continue_watching(viewer)
            .into_iter()
            .map(|e| e.video_id)
            .collect();
        assert_eq!(ids, vec![d, a]);
    }

    #[test]
    fn test_continue_watching_is_capped() {
        let store = WatchHistoryStore::new();
        let viewer = ViewerId::new();
        for _ in 0..15 {
            store.upsert(viewer, VideoId::new(), 5, None);
        }
        assert_eq!(store.continue_watching(viewer).len(), CONTINUE_WATCHING_LIMIT);
    }

    #[test]
    fn test_clear_only_touches_one_viewer() {
        let store = WatchHistoryStore::new();
        let (alice, bob) = (ViewerId::new(), ViewerId::new());
        store.upsert(alice, VideoId::new(), 1, None);
        store.upsert(alice, VideoId::new(), 1, None);
        store.upsert(bob, VideoId::new(), 1, None);

        assert_eq!(store.clear(alice), 2);
        assert!(store.list(alice).is_empty());
        assert_eq!(store.list(bob).len(), 1);
    }

    #[test]
    fn test_remove_and_forget() {
        let store = WatchHistoryStore::new();
        let (alice, bob) = (ViewerId::new(), ViewerId::new());
        let video = VideoId::new();
        store.upsert(alice, video, 1, None);
        store.upsert(bob, video, 1, None);

        store.remove(alice, video);
        assert!(store.list(alice).is_empty());
        store.forget_video(video);
        assert!(store.list(bob).is_empty());
    }
}
