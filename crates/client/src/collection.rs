//! The ordered, render-ready list of a gallery's images.
//!
//! An [`OptimisticImageCollection`] shows durable images in authoritative
//! order followed by pending uploads in selection order. Every mutation is
//! addressed by key (client id for pending entries, durable id otherwise),
//! so concurrent upload chains never overwrite each other's changes. An
//! update for a key that is no longer present is ignored.
//!
//! Gallery reads can overlap. Each read takes a [`ReadTicket`] before it
//! goes out, and a response older than the last one applied is dropped.
//! Local star and order changes are kept over any read issued before they
//! settled.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use lumen_core::dimensions::Dimensions;
use lumen_core::image::DurableImage;
use lumen_core::realtime::RealtimeMessage;
use lumen_core::types::DbId;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::preview::PreviewRef;

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// Where a pending upload is in its chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingStatus {
    Uploading,
    /// Bytes are stored; waiting for a gallery read to surface the image.
    Finalizing,
    /// The chain stopped. Stays visible until retried or dismissed.
    Error(String),
}

/// A client-only record of an upload that is not yet durable.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingImage {
    pub client_id: Uuid,
    pub preview: PreviewRef,
    pub status: PendingStatus,
    /// Transfer progress in percent.
    pub progress: u8,
    pub dimensions: Dimensions,
    /// Durable id handed out by negotiation, once known.
    pub image_id: Option<DbId>,
    pub file_name: String,
}

impl PendingImage {
    /// A fresh entry for a file that was just selected.
    pub fn new(preview: PreviewRef, dimensions: Dimensions, file_name: impl Into<String>) -> Self {
        Self {
            client_id: Uuid::new_v4(),
            preview,
            status: PendingStatus::Uploading,
            progress: 0,
            dimensions,
            image_id: None,
            file_name: file_name.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.status, PendingStatus::Error(_))
    }
}

/// One visible item of a gallery.
#[derive(Debug, Clone, PartialEq)]
pub enum GalleryEntry {
    Durable(DurableImage),
    Pending(PendingImage),
}

impl GalleryEntry {
    pub fn dimensions(&self) -> Dimensions {
        match self {
            GalleryEntry::Durable(image) => image.dimensions(),
            GalleryEntry::Pending(pending) => pending.dimensions,
        }
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.dimensions().aspect_ratio()
    }

    /// Durable id, known for durable entries and for pending entries past
    /// negotiation.
    pub fn image_id(&self) -> Option<DbId> {
        match self {
            GalleryEntry::Durable(image) => Some(image.id),
            GalleryEntry::Pending(pending) => pending.image_id,
        }
    }
}

// ---------------------------------------------------------------------------
// OptimisticImageCollection
// ---------------------------------------------------------------------------

/// Orders gallery reads by when they were issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReadTicket(u64);

/// A local change that reads issued before it settled cannot see.
#[derive(Debug)]
struct LocalWrite<T> {
    value: T,
    in_flight: usize,
    /// Last ticket issued when the change settled.
    settled_at: u64,
}

impl<T> LocalWrite<T> {
    fn begin(value: T) -> Self {
        Self {
            value,
            in_flight: 1,
            settled_at: 0,
        }
    }

    /// Whether a read with `ticket` may be missing this change.
    fn hides_from(&self, ticket: ReadTicket) -> bool {
        self.in_flight > 0 || ticket.0 <= self.settled_at
    }

    /// Finish one request. `value` replaces the local value only when no
    /// newer request is still out. Returns `true` if it did.
    fn settle(&mut self, value: Option<T>, issued: u64) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.settled_at = issued;
        match value {
            Some(value) if self.in_flight == 0 => {
                self.value = value;
                true
            }
            _ => false,
        }
    }
}

#[derive(Default)]
struct Entries {
    durable: IndexMap<DbId, DurableImage>,
    pending: IndexMap<Uuid, PendingImage>,
    applied_read: u64,
    stars: HashMap<DbId, LocalWrite<bool>>,
    order: Option<LocalWrite<Vec<DbId>>>,
}

impl Entries {
    /// Stable sort of durable entries by their index in `order`; unlisted
    /// ids keep their relative order after the listed ones.
    fn sort_durable(&mut self, order: &[DbId]) {
        let rank: HashMap<DbId, usize> = order
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, index))
            .collect();
        self.durable
            .sort_by_cached_key(|id, _| rank.get(id).copied().unwrap_or(usize::MAX));
    }

    /// Re-apply local changes `ticket`'s read may not reflect, and forget
    /// the ones it does.
    fn overlay_local_writes(&mut self, ticket: ReadTicket) {
        let durable = &mut self.durable;
        self.stars.retain(|id, star| {
            if !star.hides_from(ticket) {
                return false;
            }
            if let Some(image) = durable.get_mut(id) {
                image.starred = star.value;
            }
            true
        });

        match self.order.take() {
            Some(order) if order.hides_from(ticket) => {
                self.sort_durable(&order.value);
                self.order = Some(order);
            }
            _ => {}
        }
    }

    /// Drop pending entries whose durable record is now visible.
    fn remove_superseded(&mut self) -> Vec<PreviewRef> {
        let durable = &self.durable;
        let mut released = Vec::new();
        self.pending.retain(|_, pending| match pending.image_id {
            Some(id) if durable.contains_key(&id) => {
                released.push(pending.preview);
                false
            }
            _ => true,
        });
        released
    }

    fn is_pending_id(&self, image_id: DbId) -> bool {
        self.pending.values().any(|p| p.image_id == Some(image_id))
    }
}

/// A gallery's visible images, mixing pending and durable records.
pub struct OptimisticImageCollection {
    gallery_id: DbId,
    entries: RwLock<Entries>,
    reads: AtomicU64,
}

impl OptimisticImageCollection {
    pub fn new(gallery_id: DbId) -> Self {
        Self {
            gallery_id,
            entries: RwLock::new(Entries::default()),
            reads: AtomicU64::new(0),
        }
    }

    pub fn gallery_id(&self) -> DbId {
        self.gallery_id
    }

    // ---- pending entries ----

    /// Append a pending entry after all existing ones.
    pub fn insert_pending(&self, pending: PendingImage) {
        self.entries.write().pending.insert(pending.client_id, pending);
    }

    /// Apply `change` to a pending entry. Returns `false` if the entry is gone.
    pub fn update_pending(&self, client_id: Uuid, change: impl FnOnce(&mut PendingImage)) -> bool {
        match self.entries.write().pending.get_mut(&client_id) {
            Some(pending) => {
                change(pending);
                true
            }
            None => false,
        }
    }

    /// Raise an uploading entry's progress. Lower values are ignored, so
    /// progress never moves backwards.
    pub fn set_progress(&self, client_id: Uuid, progress: u8) -> bool {
        let progress = progress.min(100);
        self.update_pending(client_id, |pending| {
            if pending.status == PendingStatus::Uploading && progress > pending.progress {
                pending.progress = progress;
            }
        })
    }

    pub fn set_image_id(&self, client_id: Uuid, image_id: DbId) -> bool {
        self.update_pending(client_id, |pending| pending.image_id = Some(image_id))
    }

    pub fn mark_finalizing(&self, client_id: Uuid) -> bool {
        self.update_pending(client_id, |pending| pending.status = PendingStatus::Finalizing)
    }

    pub fn mark_error(&self, client_id: Uuid, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        self.update_pending(client_id, |pending| pending.status = PendingStatus::Error(reason))
    }

    /// Put an errored entry back to a fresh uploading state for a retry.
    /// Returns `false` unless the entry exists and is in `Error`.
    pub fn reset_for_retry(&self, client_id: Uuid) -> bool {
        let mut entries = self.entries.write();
        match entries.pending.get_mut(&client_id) {
            Some(pending) if pending.is_error() => {
                pending.status = PendingStatus::Uploading;
                pending.progress = 0;
                pending.image_id = None;
                true
            }
            _ => false,
        }
    }

    /// Remove a pending entry, keeping the order of the rest.
    pub fn remove_pending(&self, client_id: Uuid) -> Option<PendingImage> {
        self.entries.write().pending.shift_remove(&client_id)
    }

    pub fn pending(&self, client_id: Uuid) -> Option<PendingImage> {
        self.entries.read().pending.get(&client_id).cloned()
    }

    pub fn pending_entries(&self) -> Vec<PendingImage> {
        self.entries.read().pending.values().cloned().collect()
    }

    // ---- durable entries ----

    /// Take a ticket for a gallery read about to be issued.
    pub fn begin_read(&self) -> ReadTicket {
        ReadTicket(self.reads.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Merge the result of the read holding `ticket` and remove every
    /// pending entry it now covers, in one step.
    ///
    /// Returns `None` if a read issued later has already been applied; the
    /// response is dropped. Otherwise returns the previews of the removed
    /// pending entries, which the caller releases.
    pub fn apply_read(&self, ticket: ReadTicket, images: Vec<DurableImage>) -> Option<Vec<PreviewRef>> {
        let mut entries = self.entries.write();
        if ticket.0 <= entries.applied_read {
            return None;
        }
        entries.applied_read = ticket.0;
        entries.durable = images.into_iter().map(|image| (image.id, image)).collect();
        entries.overlay_local_writes(ticket);
        Some(entries.remove_superseded())
    }

    /// Apply `images` as a read issued now.
    pub fn replace_durable(&self, images: Vec<DurableImage>) -> Vec<PreviewRef> {
        let ticket = self.begin_read();
        self.apply_read(ticket, images).unwrap_or_default()
    }

    pub fn durable(&self) -> Vec<DurableImage> {
        self.entries.read().durable.values().cloned().collect()
    }

    pub fn durable_image(&self, image_id: DbId) -> Option<DurableImage> {
        self.entries.read().durable.get(&image_id).cloned()
    }

    pub fn durable_order(&self) -> Vec<DbId> {
        self.entries.read().durable.keys().copied().collect()
    }

    /// Rearrange durable entries to follow `order`.
    ///
    /// Ids in `order` that are not present are skipped; present ids missing
    /// from `order` keep their relative order after the listed ones.
    pub fn set_durable_order(&self, order: &[DbId]) {
        self.entries.write().sort_durable(order);
    }

    /// Show `order` while a reorder request is out. Returns the order that
    /// was visible before.
    pub fn begin_reorder(&self, order: &[DbId]) -> Vec<DbId> {
        let mut entries = self.entries.write();
        let prior = entries.durable.keys().copied().collect();
        entries.sort_durable(order);
        match entries.order.as_mut() {
            Some(local) => {
                local.value = order.to_vec();
                local.in_flight += 1;
            }
            None => entries.order = Some(LocalWrite::begin(order.to_vec())),
        }
        prior
    }

    /// Finish a reorder request. `restore` is the order to show again when
    /// the server refused it.
    pub fn settle_reorder(&self, restore: Option<Vec<DbId>>) {
        let issued = self.reads.load(Ordering::Acquire);
        let mut entries = self.entries.write();
        let Some(mut local) = entries.order.take() else {
            return;
        };
        if local.settle(restore, issued) {
            entries.sort_durable(&local.value);
        }
        entries.order = Some(local);
    }

    /// Show `starred` while a star request is out. Returns the previous
    /// value, or `None` if the image is not visible.
    pub fn begin_star(&self, image_id: DbId, starred: bool) -> Option<bool> {
        let mut entries = self.entries.write();
        let image = entries.durable.get_mut(&image_id)?;
        let prior = std::mem::replace(&mut image.starred, starred);
        entries
            .stars
            .entry(image_id)
            .and_modify(|local| {
                local.value = starred;
                local.in_flight += 1;
            })
            .or_insert_with(|| LocalWrite::begin(starred));
        Some(prior)
    }

    /// Finish a star request with the state the server now holds, or the
    /// prior state when it refused.
    pub fn settle_star(&self, image_id: DbId, starred: bool) {
        let issued = self.reads.load(Ordering::Acquire);
        let mut entries = self.entries.write();
        let latest = match entries.stars.get_mut(&image_id) {
            Some(local) => local.settle(Some(starred), issued),
            None => true,
        };
        if latest {
            if let Some(image) = entries.durable.get_mut(&image_id) {
                image.starred = starred;
            }
        }
    }

    // ---- whole collection ----

    /// Everything visible, durable entries first.
    pub fn snapshot(&self) -> Vec<GalleryEntry> {
        let entries = self.entries.read();
        entries
            .durable
            .values()
            .cloned()
            .map(GalleryEntry::Durable)
            .chain(entries.pending.values().cloned().map(GalleryEntry::Pending))
            .collect()
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read();
        entries.durable.len() + entries.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empty the collection, returning the previews of pending entries.
    pub fn drain(&self) -> Vec<PreviewRef> {
        let mut entries = self.entries.write();
        entries.durable.clear();
        entries.stars.clear();
        entries.order = None;
        entries.pending.drain(..).map(|(_, p)| p.preview).collect()
    }

    // ---- realtime ----

    /// Merge a realtime message into the collection.
    ///
    /// `viewer` is the signed-in user: star changes by other users do not
    /// touch the viewer-relative `starred` flag. An `ImageReady` for an id a
    /// local pending entry already owns is left for the next gallery read,
    /// which keeps reconciliation read-driven.
    ///
    /// Returns `true` if anything changed.
    pub fn apply_realtime(&self, message: &RealtimeMessage, viewer: Option<&str>) -> bool {
        if message.gallery_id() != Some(self.gallery_id) {
            return false;
        }
        let mut entries = self.entries.write();
        match message {
            RealtimeMessage::ImageReady { image, .. } => {
                if entries.is_pending_id(image.id) || entries.durable.contains_key(&image.id) {
                    return false;
                }
                entries.durable.insert(image.id, image.clone());
                true
            }
            RealtimeMessage::ImageUpdated {
                image_id, caption, ..
            } => match entries.durable.get_mut(image_id) {
                Some(image) => {
                    image.caption = caption.clone();
                    true
                }
                None => false,
            },
            RealtimeMessage::ImageDeleted { image_id, .. } => {
                entries.durable.shift_remove(image_id).is_some()
            }
            RealtimeMessage::ImagesReordered { image_ids, .. } => {
                if let Some(local) = entries.order.as_mut().filter(|l| l.in_flight == 0) {
                    local.value = image_ids.clone();
                }
                let before: Vec<DbId> = entries.durable.keys().copied().collect();
                entries.sort_durable(image_ids);
                entries.durable.keys().copied().ne(before)
            }
            RealtimeMessage::StarChanged {
                image_id,
                user_id,
                starred,
                ..
            } => {
                if viewer != Some(user_id.as_str()) {
                    return false;
                }
                if let Some(local) = entries.stars.get_mut(image_id).filter(|l| l.in_flight == 0) {
                    local.value = *starred;
                }
                match entries.durable.get_mut(image_id) {
                    Some(image) if image.starred != *starred => {
                        image.starred = *starred;
                        true
                    }
                    _ => false,
                }
            }
            RealtimeMessage::CommentAdded {
                image_id,
                comment_count,
                ..
            } => match entries.durable.get_mut(image_id) {
                Some(image) => {
                    image.comment_count = *comment_count;
                    true
                }
                None => false,
            },
            RealtimeMessage::Notification { .. } => false,
        }
    }
}

// ---------------------------------------------------------------------------
// GalleryCollections
// ---------------------------------------------------------------------------

/// The collections of every gallery open in a session.
#[derive(Default)]
pub struct GalleryCollections {
    galleries: RwLock<HashMap<DbId, Arc<OptimisticImageCollection>>>,
}

impl GalleryCollections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, gallery_id: DbId) -> Arc<OptimisticImageCollection> {
        if let Some(existing) = self.get(gallery_id) {
            return existing;
        }
        Arc::clone(
            self.galleries
                .write()
                .entry(gallery_id)
                .or_insert_with(|| Arc::new(OptimisticImageCollection::new(gallery_id))),
        )
    }

    pub fn get(&self, gallery_id: DbId) -> Option<Arc<OptimisticImageCollection>> {
        self.galleries.read().get(&gallery_id).cloned()
    }

    /// Close one gallery, returning the previews its pending entries held.
    pub fn remove(&self, gallery_id: DbId) -> Vec<PreviewRef> {
        let removed = self.galleries.write().remove(&gallery_id);
        removed.map(|c| c.drain()).unwrap_or_default()
    }

    pub fn gallery_ids(&self) -> HashSet<DbId> {
        self.galleries.read().keys().copied().collect()
    }

    /// Close every gallery, returning the previews their pending entries held.
    pub fn clear(&self) -> Vec<PreviewRef> {
        let drained: Vec<_> = self.galleries.write().drain().map(|(_, c)| c).collect();
        drained.iter().flat_map(|c| c.drain()).collect()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use chrono::Utc;

    use super::*;
    use crate::preview::PreviewRegistry;

    fn durable(id: DbId, position: i32) -> DurableImage {
        DurableImage {
            id,
            gallery_id: 1,
            url: format!("https://cdn.test/{id}.jpg"),
            original_filename: format!("{id}.jpg"),
            width: Some(100),
            height: Some(100),
            starred: false,
            position,
            comment_count: 0,
            caption: None,
            created_at: Utc::now(),
        }
    }

    fn pending(registry: &PreviewRegistry, name: &str) -> PendingImage {
        let preview = registry.register(Bytes::from_static(b"p"));
        PendingImage::new(preview, Dimensions::PLACEHOLDER, name)
    }

    #[test]
    fn snapshot_lists_durable_then_pending_in_insertion_order() {
        let registry = PreviewRegistry::new();
        let collection = OptimisticImageCollection::new(1);
        let a = pending(&registry, "a.jpg");
        let b = pending(&registry, "b.jpg");
        collection.insert_pending(a.clone());
        collection.insert_pending(b.clone());
        collection.replace_durable(vec![durable(10, 1)]);

        let ids: Vec<Option<DbId>> = collection.snapshot().iter().map(GalleryEntry::image_id).collect();
        assert_eq!(ids, vec![Some(10), None, None]);

        let names: Vec<String> = collection
            .pending_entries()
            .into_iter()
            .map(|p| p.file_name)
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn progress_never_decreases_and_stops_outside_uploading() {
        let registry = PreviewRegistry::new();
        let collection = OptimisticImageCollection::new(1);
        let p = pending(&registry, "a.jpg");
        let id = p.client_id;
        collection.insert_pending(p);

        collection.set_progress(id, 40);
        collection.set_progress(id, 20);
        assert_eq!(collection.pending(id).unwrap().progress, 40);

        collection.mark_error(id, "boom");
        collection.set_progress(id, 90);
        assert_eq!(collection.pending(id).unwrap().progress, 40);
    }

    #[test]
    fn replace_durable_removes_matching_pending_atomically() {
        let registry = PreviewRegistry::new();
        let collection = OptimisticImageCollection::new(1);
        let p = pending(&registry, "a.jpg");
        let (client_id, preview) = (p.client_id, p.preview);
        collection.insert_pending(p);
        collection.set_image_id(client_id, 42);

        let released = collection.replace_durable(vec![durable(41, 1)]);
        assert!(released.is_empty());
        assert!(collection.pending(client_id).is_some());

        let released = collection.replace_durable(vec![durable(41, 1), durable(42, 2)]);
        assert_eq!(released, vec![preview]);
        assert!(collection.pending(client_id).is_none());
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn read_answered_after_a_later_read_is_dropped() {
        let registry = PreviewRegistry::new();
        let collection = OptimisticImageCollection::new(1);
        let p = pending(&registry, "a.jpg");
        let client_id = p.client_id;
        collection.insert_pending(p);
        collection.set_image_id(client_id, 2);

        let older = collection.begin_read();
        let newer = collection.begin_read();
        assert!(older < newer);

        let released = collection.apply_read(newer, vec![durable(1, 1), durable(2, 2)]);
        assert_eq!(released.map(|r| r.len()), Some(1));
        assert_eq!(collection.apply_read(older, vec![durable(1, 1)]), None);
        assert_eq!(collection.durable_order(), vec![1, 2]);
    }

    #[test]
    fn in_flight_reorder_survives_reads_until_settled() {
        let collection = OptimisticImageCollection::new(1);
        collection.replace_durable(vec![durable(1, 1), durable(2, 2), durable(3, 3)]);

        let prior = collection.begin_reorder(&[3, 2, 1]);
        assert_eq!(prior, vec![1, 2, 3]);

        // The server has not stored the new order yet.
        collection.replace_durable(vec![durable(1, 1), durable(2, 2), durable(3, 3)]);
        assert_eq!(collection.durable_order(), vec![3, 2, 1]);

        collection.settle_reorder(Some(prior));
        assert_eq!(collection.durable_order(), vec![1, 2, 3]);

        collection.replace_durable(vec![durable(2, 1), durable(1, 2), durable(3, 3)]);
        assert_eq!(collection.durable_order(), vec![2, 1, 3], "settled writes yield to later reads");
    }

    #[test]
    fn overlapping_stars_settle_to_the_latest_request() {
        let collection = OptimisticImageCollection::new(1);
        collection.replace_durable(vec![durable(5, 1)]);

        assert_eq!(collection.begin_star(5, true), Some(false));
        assert_eq!(collection.begin_star(5, false), Some(true));

        // The first request answers while the second is still out.
        collection.settle_star(5, true);
        assert!(!collection.durable_image(5).unwrap().starred);

        collection.settle_star(5, false);
        assert!(!collection.durable_image(5).unwrap().starred);
        assert_eq!(collection.begin_star(99, true), None);
    }

    #[test]
    fn updates_to_missing_keys_are_ignored() {
        let collection = OptimisticImageCollection::new(1);
        let ghost = Uuid::new_v4();
        assert!(!collection.set_progress(ghost, 50));
        assert!(!collection.mark_finalizing(ghost));
        assert!(!collection.mark_error(ghost, "x"));
        assert!(collection.is_empty());
    }

    #[test]
    fn set_durable_order_keeps_unlisted_ids_last() {
        let collection = OptimisticImageCollection::new(1);
        collection.replace_durable(vec![durable(1, 1), durable(2, 2), durable(3, 3)]);

        collection.set_durable_order(&[3, 1, 99]);
        assert_eq!(collection.durable_order(), vec![3, 1, 2]);
    }

    #[test]
    fn star_changes_apply_only_for_the_viewer() {
        let collection = OptimisticImageCollection::new(1);
        collection.replace_durable(vec![durable(5, 1)]);
        let message = |user: &str| RealtimeMessage::StarChanged {
            gallery_id: 1,
            image_id: 5,
            user_id: user.to_string(),
            starred: true,
        };

        assert!(!collection.apply_realtime(&message("someone_else"), Some("me")));
        assert!(!collection.durable_image(5).unwrap().starred);

        assert!(collection.apply_realtime(&message("me"), Some("me")));
        assert!(collection.durable_image(5).unwrap().starred);
    }

    #[test]
    fn image_ready_for_a_local_upload_is_left_to_the_read() {
        let registry = PreviewRegistry::new();
        let collection = OptimisticImageCollection::new(1);
        let p = pending(&registry, "a.jpg");
        let client_id = p.client_id;
        collection.insert_pending(p);
        collection.set_image_id(client_id, 7);

        let ready = |id| RealtimeMessage::ImageReady {
            gallery_id: 1,
            image: durable(id, 1),
        };
        assert!(!collection.apply_realtime(&ready(7), None));
        assert!(collection.durable_image(7).is_none());

        assert!(collection.apply_realtime(&ready(8), None));
        assert!(collection.durable_image(8).is_some());
    }

    #[test]
    fn messages_for_other_galleries_are_ignored() {
        let collection = OptimisticImageCollection::new(1);
        collection.replace_durable(vec![durable(5, 1)]);
        let deleted = RealtimeMessage::ImageDeleted {
            gallery_id: 2,
            image_id: 5,
        };
        assert!(!collection.apply_realtime(&deleted, None));
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn clear_returns_pending_previews() {
        let registry = PreviewRegistry::new();
        let collections = GalleryCollections::new();
        let p = pending(&registry, "a.jpg");
        let preview = p.preview;
        collections.get_or_create(3).insert_pending(p);

        assert_eq!(collections.clear(), vec![preview]);
        assert!(collections.get(3).is_none());
    }
}
