//! Local previews for files that have not been uploaded yet.
//!
//! A selected file is registered in the [`PreviewRegistry`] and gets a
//! [`PreviewRef`] the UI can render straight away, while its intrinsic
//! dimensions are decoded off the async executor. Previews hold the file
//! bytes in memory until released, so every registered preview must be
//! released once nothing displays it any more.

use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use image::ImageReader;
use lumen_core::dimensions::Dimensions;
use parking_lot::Mutex;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// SelectedFile
// ---------------------------------------------------------------------------

/// A file the user picked for upload.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

// ---------------------------------------------------------------------------
// PreviewRegistry
// ---------------------------------------------------------------------------

/// Handle to a registered local preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewRef(Uuid);

impl fmt::Display for PreviewRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "preview:{}", self.0)
    }
}

/// Client-local store of preview bytes, addressed by [`PreviewRef`].
#[derive(Default)]
pub struct PreviewRegistry {
    previews: Mutex<HashMap<PreviewRef, Bytes>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` and return a handle for rendering them.
    pub fn register(&self, bytes: Bytes) -> PreviewRef {
        let preview = PreviewRef(Uuid::new_v4());
        self.previews.lock().insert(preview, bytes);
        preview
    }

    /// Bytes behind a live preview.
    pub fn get(&self, preview: PreviewRef) -> Option<Bytes> {
        self.previews.lock().get(&preview).cloned()
    }

    pub fn contains(&self, preview: PreviewRef) -> bool {
        self.previews.lock().contains_key(&preview)
    }

    /// Release a preview now. Returns `false` if it was already released.
    pub fn release(&self, preview: PreviewRef) -> bool {
        self.previews.lock().remove(&preview).is_some()
    }

    /// Release a preview once `grace` has passed.
    pub fn release_after(self: &Arc<Self>, preview: PreviewRef, grace: Duration) {
        if grace.is_zero() {
            self.release(preview);
            return;
        }
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            registry.release(preview);
        });
    }

    /// Release every preview. Returns how many were live.
    pub fn release_all(&self) -> usize {
        let mut previews = self.previews.lock();
        let count = previews.len();
        previews.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.previews.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.previews.lock().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Building previews
// ---------------------------------------------------------------------------

/// A registered preview with its decoded size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalPreview {
    pub preview: PreviewRef,
    pub dimensions: Dimensions,
    /// `false` when decoding failed and `dimensions` is the placeholder.
    pub decoded: bool,
}

/// Register a preview for `file` and decode its intrinsic dimensions.
///
/// Decode failure is not an error: the preview uses
/// [`Dimensions::PLACEHOLDER`] and the upload proceeds.
pub async fn build_preview(registry: &PreviewRegistry, file: &SelectedFile) -> LocalPreview {
    let preview = registry.register(file.bytes.clone());

    match decode_dimensions(file.bytes.clone()).await {
        Some(dimensions) => LocalPreview {
            preview,
            dimensions,
            decoded: true,
        },
        None => {
            tracing::debug!(file = %file.name, "Could not decode image header, using placeholder size");
            LocalPreview {
                preview,
                dimensions: Dimensions::PLACEHOLDER,
                decoded: false,
            }
        }
    }
}

/// Read an image's dimensions from its header on the blocking pool.
pub async fn decode_dimensions(bytes: Bytes) -> Option<Dimensions> {
    tokio::task::spawn_blocking(move || decode_dimensions_blocking(&bytes))
        .await
        .ok()
        .flatten()
}

fn decode_dimensions_blocking(bytes: &[u8]) -> Option<Dimensions> {
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()?;
    (width > 0 && height > 0).then(|| Dimensions::new(width, height))
}
