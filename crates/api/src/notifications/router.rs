//! Event-to-socket routing.
//!
//! Gallery-scoped events go to every connection subscribed to the gallery.
//! Events without a gallery go to the acting user's own connections.

use std::sync::Arc;

use axum::extract::ws::Message;
use lumen_events::GalleryEvent;
use tokio::sync::broadcast;

use crate::ws::WsManager;

/// Routes gallery events to WebSocket subscribers.
pub struct NotificationRouter {
    ws_manager: Arc<WsManager>,
}

impl NotificationRouter {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run the main routing loop.
    ///
    /// The loop exits when the channel is closed (i.e. the
    /// [`EventBus`](lumen_events::EventBus) is dropped).
    pub async fn run(self, mut receiver: broadcast::Receiver<GalleryEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let delivered = self.route_event(&event).await;
                    tracing::debug!(
                        event_type = event.event_type(),
                        gallery_id = ?event.gallery_id(),
                        delivered,
                        "Routed gallery event"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    /// Deliver a single event. Returns the number of connections it was queued for.
    pub async fn route_event(&self, event: &GalleryEvent) -> usize {
        let text = match serde_json::to_string(&event.message) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    event_type = event.event_type(),
                    "Failed to serialize realtime message"
                );
                return 0;
            }
        };
        let msg = Message::Text(text.into());

        match (event.gallery_id(), event.actor.as_deref()) {
            (Some(gallery_id), _) => self.ws_manager.send_to_gallery(gallery_id, msg).await,
            (None, Some(user_id)) => self.ws_manager.send_to_user(user_id, msg).await,
            (None, None) => 0,
        }
    }
}
