//! Everything one signed-in user's client holds.
//!
//! A [`Session`] is constructed explicitly and passed to whatever needs it;
//! there is no global client state. `sign_in` starts the realtime
//! dispatcher and `sign_out` tears down realtime, previews and collections.

use std::sync::Arc;

use lumen_core::types::{DbId, UserId};
use tokio::sync::Mutex as AsyncMutex;

use crate::api::{GalleryApi, HttpBackend, HttpTransport, StarState, Transport};
use crate::collection::{GalleryCollections, OptimisticImageCollection};
use crate::config::ClientConfig;
use crate::error::{ApiError, RealtimeError};
use crate::notify::Notifier;
use crate::optimistic;
use crate::preview::PreviewRegistry;
use crate::realtime::{self, RealtimeDispatcher, RealtimeHandle};
use crate::reconcile::refresh_gallery;
use crate::uploader::Uploader;

/// Client application state for one user.
pub struct Session {
    config: ClientConfig,
    api: Arc<dyn GalleryApi>,
    transport: Arc<dyn Transport>,
    previews: Arc<PreviewRegistry>,
    collections: Arc<GalleryCollections>,
    notifier: Notifier,
    realtime: AsyncMutex<Option<RealtimeHandle>>,
}

impl Session {
    pub fn new(
        config: ClientConfig,
        api: Arc<dyn GalleryApi>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            api,
            transport,
            previews: Arc::new(PreviewRegistry::new()),
            collections: Arc::new(GalleryCollections::new()),
            notifier: Notifier::new(),
            realtime: AsyncMutex::new(None),
        }
    }

    /// A session talking HTTP to `config.api_url` with `token`.
    pub fn over_http(config: ClientConfig, token: &str) -> Self {
        let client = reqwest::Client::new();
        let api = HttpBackend::with_client(client.clone(), config.api_url.clone(), token);
        let transport = HttpTransport::with_client(client, config.transfer_chunk_bytes);
        Self::new(config, Arc::new(api), Arc::new(transport))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn previews(&self) -> &Arc<PreviewRegistry> {
        &self.previews
    }

    pub fn collection(&self, gallery_id: DbId) -> Option<Arc<OptimisticImageCollection>> {
        self.collections.get(gallery_id)
    }

    // ---- lifecycle ----

    /// Connect the realtime socket for `user_id` and start dispatching.
    /// Galleries already open are subscribed immediately.
    pub async fn sign_in(
        &self,
        user_id: impl Into<UserId>,
        token: &str,
    ) -> Result<(), RealtimeError> {
        let socket = realtime::connect(&self.config.ws_url, token).await?;
        let handle = RealtimeHandle::spawn_socket(
            self.dispatcher(user_id.into()),
            socket,
            self.collections.gallery_ids(),
        );
        self.replace_realtime(Some(handle)).await;
        Ok(())
    }

    /// Start dispatching from an already-decoded message stream.
    pub async fn attach_realtime<S>(&self, user_id: impl Into<UserId>, messages: S)
    where
        S: futures::Stream<Item = lumen_core::realtime::RealtimeMessage> + Send + 'static,
    {
        let handle = RealtimeHandle::spawn_stream(self.dispatcher(user_id.into()), messages);
        self.replace_realtime(Some(handle)).await;
    }

    pub async fn is_realtime_running(&self) -> bool {
        self.realtime
            .lock()
            .await
            .as_ref()
            .is_some_and(RealtimeHandle::is_running)
    }

    /// Stop realtime, close every gallery and release every preview.
    pub async fn sign_out(&self) {
        self.replace_realtime(None).await;
        self.collections.clear();
        let released = self.previews.release_all();
        tracing::info!(released, "Signed out");
    }

    // ---- galleries ----

    /// Open a gallery: load its durable images and follow its realtime
    /// updates.
    pub async fn open_gallery(
        &self,
        gallery_id: DbId,
    ) -> Result<Arc<OptimisticImageCollection>, ApiError> {
        let collection = self.collections.get_or_create(gallery_id);
        if let Some(handle) = self.realtime.lock().await.as_ref() {
            handle.subscribe(gallery_id);
        }
        self.refresh(&collection).await?;
        Ok(collection)
    }

    /// Close a gallery: stop following it and release its pending previews.
    /// Upload chains still running for it finish against a detached
    /// collection.
    pub async fn close_gallery(&self, gallery_id: DbId) {
        if let Some(handle) = self.realtime.lock().await.as_ref() {
            handle.unsubscribe(gallery_id);
        }
        for preview in self.collections.remove(gallery_id) {
            self.previews.release(preview);
        }
    }

    /// Re-read a gallery; pending uploads the read covers are replaced.
    pub async fn refresh(&self, collection: &OptimisticImageCollection) -> Result<usize, ApiError> {
        refresh_gallery(
            self.api.as_ref(),
            collection,
            &self.previews,
            self.config.preview_release_grace,
        )
        .await
    }

    /// An uploader for `gallery_id`, opening its collection if needed.
    pub fn uploader(&self, gallery_id: DbId) -> Uploader {
        Uploader::new(
            Arc::clone(&self.api),
            Arc::clone(&self.transport),
            Arc::clone(&self.previews),
            self.collections.get_or_create(gallery_id),
            self.config.preview_release_grace,
        )
    }

    // ---- optimistic mutations ----

    /// Star or unstar an image. The collection shows the new state at once
    /// and is restored if the server refuses. Setting the state it already
    /// has is a no-op on the server.
    pub async fn set_star(
        &self,
        collection: &OptimisticImageCollection,
        image_id: DbId,
        starred: bool,
    ) -> Result<StarState, ApiError> {
        let state = optimistic::apply(
            &self.notifier,
            "Could not update star",
            || collection.begin_star(image_id, starred),
            self.api.set_star(image_id, starred),
            |prior| {
                if let Some(prior) = prior {
                    collection.settle_star(image_id, prior);
                }
            },
        )
        .await?;
        collection.settle_star(image_id, state.starred);
        Ok(state)
    }

    /// Flip the viewer's star on a visible image.
    pub async fn toggle_star(
        &self,
        collection: &OptimisticImageCollection,
        image_id: DbId,
    ) -> Result<StarState, ApiError> {
        let current = collection
            .durable_image(image_id)
            .map(|image| image.starred)
            .ok_or(ApiError::NotVisible(image_id))?;
        self.set_star(collection, image_id, !current).await
    }

    /// Reorder a gallery's durable images. On rejection the prior visible
    /// order comes back and an error toast is shown.
    pub async fn reorder(
        &self,
        collection: &OptimisticImageCollection,
        image_ids: Vec<DbId>,
    ) -> Result<(), ApiError> {
        optimistic::apply(
            &self.notifier,
            "Could not reorder images",
            || collection.begin_reorder(&image_ids),
            self.api.reorder(collection.gallery_id(), &image_ids),
            |prior| collection.settle_reorder(Some(prior)),
        )
        .await?;
        collection.settle_reorder(None);
        Ok(())
    }

    // ---- private helpers ----

    fn dispatcher(&self, viewer: UserId) -> RealtimeDispatcher {
        RealtimeDispatcher::new(Arc::clone(&self.collections), self.notifier.clone(), viewer)
    }

    async fn replace_realtime(&self, next: Option<RealtimeHandle>) {
        let previous = std::mem::replace(&mut *self.realtime.lock().await, next);
        if let Some(handle) = previous {
            handle.stop().await;
        }
    }
}
