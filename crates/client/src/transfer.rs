//! Moving one file's bytes to its signed write target.

use std::sync::atomic::{AtomicU8, Ordering};

use uuid::Uuid;

use crate::api::{Transport, UploadTarget};
use crate::collection::OptimisticImageCollection;
use crate::error::TransferError;
use crate::preview::SelectedFile;

/// Highest progress reported before the target has answered.
pub const MAX_IN_FLIGHT_PERCENT: u8 = 99;

/// Turns `(sent, total)` byte counts into a percentage that only goes up.
///
/// While the transfer is in flight the value is capped at
/// [`MAX_IN_FLIGHT_PERCENT`]; only [`ProgressTracker::complete`] reaches 100.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    percent: AtomicU8,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `sent` of `total` bytes went out. Returns the new
    /// percentage if it increased.
    pub fn observe(&self, sent: u64, total: u64) -> Option<u8> {
        let percent = in_flight_percent(sent, total);
        let previous = self.percent.fetch_max(percent, Ordering::AcqRel);
        (percent > previous).then_some(percent)
    }

    /// Mark the transfer as acknowledged by the target.
    pub fn complete(&self) -> u8 {
        self.percent.store(100, Ordering::Release);
        100
    }

    pub fn percent(&self) -> u8 {
        self.percent.load(Ordering::Acquire)
    }
}

fn in_flight_percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = sent.min(total).saturating_mul(100) / total;
    (percent as u8).min(MAX_IN_FLIGHT_PERCENT)
}

/// Stream `file` to `target`, keeping the pending entry's progress current.
///
/// Progress reaches 100 only when the target answers 2xx. Any error rejects
/// the whole transfer; the entry's status is left to the caller.
pub async fn transfer(
    transport: &dyn Transport,
    collection: &OptimisticImageCollection,
    client_id: Uuid,
    target: &UploadTarget,
    file: &SelectedFile,
) -> Result<(), TransferError> {
    let tracker = ProgressTracker::new();
    let on_progress = |sent: u64, total: u64| {
        if let Some(percent) = tracker.observe(sent, total) {
            collection.set_progress(client_id, percent);
        }
    };

    transport
        .put(target, &file.content_type, file.bytes.clone(), &on_progress)
        .await?;

    collection.set_progress(client_id, tracker.complete());
    tracing::debug!(%client_id, image_id = target.image_id, bytes = file.size(), "Transfer complete");
    Ok(())
}
