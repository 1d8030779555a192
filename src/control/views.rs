use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::core::types::VideoId;
use crate::observability::metrics as obs;

// ---------------------------------------------------------------------------
// View counting
// ---------------------------------------------------------------------------

/// Fire-and-forget view increments.
///
/// Streaming handlers hold a clone; the receiving half is drained by
/// [`run_view_counter`]. Counting is lossy: when the channel is full or the
/// task has stopped, the increment is dropped instead of delaying playback.
#[derive(Clone)]
pub struct ViewCounter {
    tx: mpsc::Sender<VideoId>,
}

/// Create the counter and its receiver with room for `capacity` pending views.
pub fn view_channel(capacity: usize) -> (ViewCounter, mpsc::Receiver<VideoId>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ViewCounter { tx }, rx)
}

impl ViewCounter {
    /// Queue one view. Never blocks; returns whether the view was queued.
    pub fn increment(&self, video_id: VideoId) -> bool {
        match self.tx.try_send(video_id) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!(%video_id, "view channel full, dropping increment");
                obs::inc_views_dropped("full");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(%video_id, "view channel closed, dropping increment");
                obs::inc_views_dropped("closed");
                false
            }
        }
    }
}

/// Apply queued views to the catalog until cancelled or all counters drop.
///
/// On cancellation the channel is closed and whatever is already queued is
/// applied before returning.
pub async fn run_view_counter(
    mut rx: mpsc::Receiver<VideoId>,
    catalog: Arc<Catalog>,
    cancel: CancellationToken,
) {
    info!("view counter task started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(video_id) => apply(&catalog, video_id),
                None => {
                    info!("view channel closed, view counter task exiting");
                    return;
                }
            },
        }
    }

    rx.close();
    let mut drained = 0usize;
    while let Ok(video_id) = rx.try_recv() {
        apply(&catalog, video_id);
        drained += 1;
    }
    info!(drained, "view counter task stopped");
}

fn apply(catalog: &Catalog, video_id: VideoId) {
    if catalog.videos.increment_views(video_id) {
        obs::inc_views_recorded();
    } else {
        debug!(%video_id, "view for deleted video ignored");
    }
}
