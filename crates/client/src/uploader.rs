//! Per-file upload chains for one gallery.
//!
//! [`Uploader::select_files`] shows every selected file as a pending entry
//! before any network call, then runs one independent task per file:
//! negotiate, transfer, reconcile. A failure is recorded on that file's
//! entry only. There is no concurrency cap and no cancellation: dismissing
//! an in-flight upload lets its task run on, and its later updates are
//! ignored because the entry is gone.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use lumen_core::dimensions::Dimensions;
use lumen_core::types::DbId;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::api::{GalleryApi, Transport};
use crate::collection::{OptimisticImageCollection, PendingImage};
use crate::error::UploadError;
use crate::negotiate::negotiate;
use crate::preview::{build_preview, PreviewRegistry, SelectedFile};
use crate::reconcile::reconcile;
use crate::transfer::transfer;

/// What a retry needs to run a chain again.
#[derive(Clone)]
struct Source {
    file: SelectedFile,
    decoded: Option<Dimensions>,
}

/// A spawned upload chain.
#[derive(Debug)]
pub struct UploadHandle {
    pub client_id: Uuid,
    pub task: JoinHandle<Result<(), UploadError>>,
}

/// Runs uploads into one gallery's collection.
#[derive(Clone)]
pub struct Uploader {
    api: Arc<dyn GalleryApi>,
    transport: Arc<dyn Transport>,
    previews: Arc<PreviewRegistry>,
    collection: Arc<OptimisticImageCollection>,
    preview_release_grace: Duration,
    sources: Arc<Mutex<HashMap<Uuid, Source>>>,
}

impl Uploader {
    pub fn new(
        api: Arc<dyn GalleryApi>,
        transport: Arc<dyn Transport>,
        previews: Arc<PreviewRegistry>,
        collection: Arc<OptimisticImageCollection>,
        preview_release_grace: Duration,
    ) -> Self {
        Self {
            api,
            transport,
            previews,
            collection,
            preview_release_grace,
            sources: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn gallery_id(&self) -> DbId {
        self.collection.gallery_id()
    }

    pub fn collection(&self) -> &Arc<OptimisticImageCollection> {
        &self.collection
    }

    /// Add `files` to the gallery and start uploading each of them.
    ///
    /// Previews for all files are built first, so every pending entry is
    /// visible, in selection order, before any chain touches the network.
    pub async fn select_files(&self, files: Vec<SelectedFile>) -> Vec<UploadHandle> {
        let previews = join_all(files.iter().map(|file| build_preview(&self.previews, file))).await;

        let mut started = Vec::with_capacity(files.len());
        for (file, local) in files.into_iter().zip(previews) {
            let pending = PendingImage::new(local.preview, local.dimensions, file.name.clone());
            let client_id = pending.client_id;
            self.collection.insert_pending(pending);

            let source = Source {
                file,
                decoded: local.decoded.then_some(local.dimensions),
            };
            self.sources.lock().insert(client_id, source.clone());
            started.push((client_id, source));
        }

        tracing::info!(
            gallery_id = self.gallery_id(),
            count = started.len(),
            "Files selected for upload"
        );

        started
            .into_iter()
            .map(|(client_id, source)| self.spawn_chain(client_id, source))
            .collect()
    }

    /// Run the chain again for an entry in `Error`, starting with a new
    /// negotiation.
    pub fn retry(&self, client_id: Uuid) -> Result<UploadHandle, UploadError> {
        let source = self
            .sources
            .lock()
            .get(&client_id)
            .cloned()
            .ok_or(UploadError::NotRetryable(client_id))?;

        if !self.collection.reset_for_retry(client_id) {
            return Err(UploadError::NotRetryable(client_id));
        }

        tracing::info!(%client_id, file = %source.file.name, "Retrying upload");
        Ok(self.spawn_chain(client_id, source))
    }

    /// Remove an entry and release its preview. An in-flight transfer keeps
    /// running; its result is ignored. Returns `false` if there was no entry.
    pub fn dismiss(&self, client_id: Uuid) -> bool {
        self.sources.lock().remove(&client_id);
        match self.collection.remove_pending(client_id) {
            Some(pending) => {
                self.previews.release(pending.preview);
                true
            }
            None => false,
        }
    }

    // ---- private helpers ----

    fn spawn_chain(&self, client_id: Uuid, source: Source) -> UploadHandle {
        let uploader = self.clone();
        let task = tokio::spawn(async move {
            let result = uploader.run_chain(client_id, &source).await;
            if let Err(e) = &result {
                tracing::warn!(%client_id, file = %source.file.name, error = %e, "Upload failed");
                uploader.collection.mark_error(client_id, e.to_string());
            }
            result
        });
        UploadHandle { client_id, task }
    }

    async fn run_chain(&self, client_id: Uuid, source: &Source) -> Result<(), UploadError> {
        let target = negotiate(
            self.api.as_ref(),
            self.gallery_id(),
            &source.file,
            source.decoded,
        )
        .await?;
        self.collection.set_image_id(client_id, target.image_id);

        transfer(
            self.transport.as_ref(),
            &self.collection,
            client_id,
            &target,
            &source.file,
        )
        .await?;

        // The bytes are stored; from here on the entry can no longer fail.
        self.sources.lock().remove(&client_id);

        if let Err(e) = reconcile(
            self.api.as_ref(),
            &self.collection,
            &self.previews,
            client_id,
            self.preview_release_grace,
        )
        .await
        {
            tracing::warn!(%client_id, error = %e, "Gallery read failed, upload stays finalizing");
        }
        Ok(())
    }
}
