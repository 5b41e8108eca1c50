//! Replacing pending uploads with their durable records.
//!
//! Reconciliation is read-driven: after a transfer succeeds the entry goes
//! to `Finalizing` and the gallery is re-read. The entry disappears only
//! when a read contains its durable id. A read that does not (yet) show it
//! leaves the entry `Finalizing` until a later read does.

use std::sync::Arc;
use std::time::Duration;

use lumen_core::types::DbId;
use uuid::Uuid;

use crate::api::GalleryApi;
use crate::collection::OptimisticImageCollection;
use crate::error::ApiError;
use crate::preview::PreviewRegistry;

/// Re-read a gallery and merge the result into `collection`.
///
/// Previews of pending entries the read superseded are released after
/// `grace`. Returns how many pending entries were replaced; a response
/// overtaken by a later read replaces none.
pub async fn refresh_gallery(
    api: &dyn GalleryApi,
    collection: &OptimisticImageCollection,
    previews: &Arc<PreviewRegistry>,
    grace: Duration,
) -> Result<usize, ApiError> {
    let gallery_id: DbId = collection.gallery_id();
    let ticket = collection.begin_read();
    let images = api.list_images(gallery_id).await?;
    let Some(released) = collection.apply_read(ticket, images) else {
        tracing::debug!(gallery_id, ?ticket, "Dropped gallery read older than the one shown");
        return Ok(0);
    };

    for preview in &released {
        previews.release_after(*preview, grace);
    }
    if !released.is_empty() {
        tracing::debug!(gallery_id, replaced = released.len(), "Pending uploads reconciled");
    }
    Ok(released.len())
}

/// Finalize one upload after its transfer succeeded.
///
/// Returns `true` once the durable record has replaced the pending entry,
/// `false` if the read did not include it yet.
pub async fn reconcile(
    api: &dyn GalleryApi,
    collection: &OptimisticImageCollection,
    previews: &Arc<PreviewRegistry>,
    client_id: Uuid,
    grace: Duration,
) -> Result<bool, ApiError> {
    if !collection.mark_finalizing(client_id) {
        // Dismissed while in flight.
        return Ok(false);
    }

    refresh_gallery(api, collection, previews, grace).await?;

    let surfaced = collection.pending(client_id).is_none();
    if !surfaced {
        tracing::debug!(%client_id, gallery_id = collection.gallery_id(), "Upload not visible yet, still finalizing");
    }
    Ok(surfaced)
}
