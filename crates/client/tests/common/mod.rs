#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use image::{ImageFormat, RgbImage};
use lumen_client::api::{GalleryApi, ProgressFn, StarState, Transport, UploadTarget};
use lumen_client::config::ClientConfig;
use lumen_client::error::{ApiError, TransferError};
use lumen_client::preview::SelectedFile;
use lumen_client::session::Session;
use lumen_core::image::DurableImage;
use lumen_core::types::DbId;
use lumen_core::upload::UploadDescriptor;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

pub const GALLERY: DbId = 1;
pub const VIEWER: &str = "user_viewer";

// ---------------------------------------------------------------------------
// Fake backend
// ---------------------------------------------------------------------------

#[derive(Default)]
struct State {
    next_id: DbId,
    /// Negotiated but not yet transferred.
    negotiated: HashMap<DbId, DurableImage>,
    /// Transferred, waiting for a read to confirm them.
    stored: Vec<DbId>,
    /// Confirmed images in position order.
    gallery: Vec<DurableImage>,
    stars: HashSet<DbId>,
    reject_names: HashSet<String>,
    fail_transfer_once: HashSet<String>,
    reject_reorder: bool,
    reject_star: bool,
    hide_stored: bool,
    /// The next read answers this long after taking its snapshot.
    stall_next_read: Option<Duration>,
    negotiations: usize,
    star_requests: usize,
}

/// In-process stand-in for both the REST API and the storage target.
pub struct FakeBackend {
    state: Mutex<State>,
    gate: Semaphore,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Self::build(Semaphore::MAX_PERMITS)
    }

    /// Negotiation blocks until [`FakeBackend::open_gate`] is called.
    pub fn gated() -> Arc<Self> {
        Self::build(0)
    }

    fn build(permits: usize) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                next_id: 100,
                ..State::default()
            }),
            gate: Semaphore::new(permits),
        })
    }

    pub fn open_gate(&self) {
        self.gate.add_permits(1024);
    }

    pub fn reject_negotiation(&self, name: &str) {
        self.state.lock().reject_names.insert(name.to_string());
    }

    pub fn fail_transfer_once(&self, name: &str) {
        self.state.lock().fail_transfer_once.insert(name.to_string());
    }

    pub fn reject_reorder(&self, reject: bool) {
        self.state.lock().reject_reorder = reject;
    }

    pub fn reject_star(&self, reject: bool) {
        self.state.lock().reject_star = reject;
    }

    /// Delay the next read's answer; its snapshot is taken immediately.
    pub fn stall_next_read(&self, delay: Duration) {
        self.state.lock().stall_next_read = Some(delay);
    }

    /// While set, reads do not surface stored uploads yet.
    pub fn hide_stored(&self, hide: bool) {
        self.state.lock().hide_stored = hide;
    }

    /// Put an already-confirmed image into the gallery.
    pub fn seed_image(&self, name: &str) -> DbId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = state.next_id;
        let position = state.gallery.len() as i32 + 1;
        state.gallery.push(durable(id, name, None, None, position));
        id
    }

    pub fn negotiations(&self) -> usize {
        self.state.lock().negotiations
    }

    pub fn star_requests(&self) -> usize {
        self.state.lock().star_requests
    }

    pub fn is_starred(&self, image_id: DbId) -> bool {
        self.state.lock().stars.contains(&image_id)
    }

    pub fn order(&self) -> Vec<DbId> {
        self.state.lock().gallery.iter().map(|i| i.id).collect()
    }
}

fn durable(
    id: DbId,
    name: &str,
    width: Option<i32>,
    height: Option<i32>,
    position: i32,
) -> DurableImage {
    DurableImage {
        id,
        gallery_id: GALLERY,
        url: format!("https://cdn.test/galleries/{GALLERY}/{id}"),
        original_filename: name.to_string(),
        width,
        height,
        starred: false,
        position,
        comment_count: 0,
        caption: None,
        created_at: Utc::now(),
    }
}

fn rejected(status: u16, code: &str, message: &str) -> ApiError {
    ApiError::Status {
        status,
        code: Some(code.to_string()),
        message: message.to_string(),
    }
}

#[async_trait]
impl GalleryApi for FakeBackend {
    async fn negotiate(
        &self,
        gallery_id: DbId,
        files: &[UploadDescriptor],
    ) -> Result<Vec<UploadTarget>, ApiError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        let mut state = self.state.lock();
        state.negotiations += 1;
        if files.iter().any(|f| state.reject_names.contains(&f.name)) {
            return Err(rejected(400, "VALIDATION_ERROR", "Upload quota exceeded"));
        }

        let mut targets = Vec::with_capacity(files.len());
        for file in files {
            state.next_id += 1;
            let id = state.next_id;
            state
                .negotiated
                .insert(id, durable(id, &file.name, file.width, file.height, 0));
            targets.push(UploadTarget {
                image_id: id,
                signed_url: format!("https://storage.test/put/{id}"),
                public_url: format!("https://cdn.test/galleries/{gallery_id}/{id}"),
                headers: vec![("content-type".into(), file.content_type.clone())],
            });
        }
        Ok(targets)
    }

    async fn list_images(&self, _gallery_id: DbId) -> Result<Vec<DurableImage>, ApiError> {
        let (images, stall) = {
            let mut state = self.state.lock();
            if !state.hide_stored {
                let stored = std::mem::take(&mut state.stored);
                for id in stored {
                    if let Some(mut image) = state.negotiated.remove(&id) {
                        image.position = state.gallery.len() as i32 + 1;
                        state.gallery.push(image);
                    }
                }
            }
            let images: Vec<DurableImage> = state
                .gallery
                .iter()
                .cloned()
                .map(|mut image| {
                    image.starred = state.stars.contains(&image.id);
                    image
                })
                .collect();
            (images, state.stall_next_read.take())
        };
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        Ok(images)
    }

    async fn set_star(&self, image_id: DbId, starred: bool) -> Result<StarState, ApiError> {
        let mut state = self.state.lock();
        state.star_requests += 1;
        if state.reject_star {
            return Err(rejected(503, "SERVICE_UNAVAILABLE", "Try again later"));
        }
        if !state.gallery.iter().any(|i| i.id == image_id) {
            return Err(rejected(404, "NOT_FOUND", "Image not found"));
        }
        let changed = if starred {
            state.stars.insert(image_id)
        } else {
            state.stars.remove(&image_id)
        };
        Ok(StarState {
            image_id,
            starred,
            changed,
        })
    }

    async fn reorder(&self, _gallery_id: DbId, image_ids: &[DbId]) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        if state.reject_reorder {
            return Err(rejected(409, "CONFLICT", "Gallery changed while reordering"));
        }
        let mut reordered = Vec::with_capacity(image_ids.len());
        for (index, id) in image_ids.iter().enumerate() {
            let Some(image) = state.gallery.iter().find(|i| i.id == *id) else {
                return Err(rejected(400, "VALIDATION_ERROR", "Unknown image id"));
            };
            let mut image = image.clone();
            image.position = index as i32 + 1;
            reordered.push(image);
        }
        state.gallery = reordered;
        Ok(())
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn put(
        &self,
        target: &UploadTarget,
        _content_type: &str,
        body: Bytes,
        progress: &ProgressFn<'_>,
    ) -> Result<(), TransferError> {
        let total = body.len() as u64;
        let step = (total / 4).max(1);
        let mut sent = 0;
        while sent < total {
            sent = (sent + step).min(total);
            progress(sent, total);
            tokio::task::yield_now().await;
        }

        let mut state = self.state.lock();
        let name = state
            .negotiated
            .get(&target.image_id)
            .map(|i| i.original_filename.clone())
            .ok_or(TransferError::Status(403))?;
        if state.fail_transfer_once.remove(&name) {
            return Err(TransferError::Status(503));
        }
        state.stored.push(target.image_id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn test_config() -> ClientConfig {
    ClientConfig {
        preview_release_grace: Duration::ZERO,
        ..ClientConfig::default()
    }
}

pub fn session_with(backend: &Arc<FakeBackend>) -> Session {
    Session::new(test_config(), backend.clone(), backend.clone())
}

/// Encode a blank image of the given size.
pub fn encoded_image(width: u32, height: u32, format: ImageFormat) -> Bytes {
    let mut out = Cursor::new(Vec::new());
    RgbImage::new(width, height)
        .write_to(&mut out, format)
        .unwrap();
    Bytes::from(out.into_inner())
}

pub fn png(name: &str, width: u32, height: u32) -> SelectedFile {
    SelectedFile::new(name, "image/png", encoded_image(width, height, ImageFormat::Png))
}

pub fn jpeg(name: &str, width: u32, height: u32) -> SelectedFile {
    SelectedFile::new(name, "image/jpeg", encoded_image(width, height, ImageFormat::Jpeg))
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
