//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the central publish/subscribe hub for [`GalleryEvent`]s.
//! It is designed to be shared via `Arc<EventBus>` across the application.

use chrono::{DateTime, Utc};
use lumen_core::realtime::RealtimeMessage;
use lumen_core::types::{DbId, UserId};
use serde::Serialize;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// GalleryEvent
// ---------------------------------------------------------------------------

/// Something that happened in a gallery and should reach its viewers.
#[derive(Debug, Clone, Serialize)]
pub struct GalleryEvent {
    /// The message delivered to realtime subscribers.
    pub message: RealtimeMessage,

    /// The user whose request caused the event, if any.
    pub actor: Option<UserId>,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl GalleryEvent {
    pub fn new(message: RealtimeMessage) -> Self {
        Self {
            message,
            actor: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach the acting user to the event.
    pub fn with_actor(mut self, user_id: impl Into<UserId>) -> Self {
        self.actor = Some(user_id.into());
        self
    }

    /// Gallery the event is scoped to, if any.
    pub fn gallery_id(&self) -> Option<DbId> {
        self.message.gallery_id()
    }

    /// Dot-separated event name for logs, e.g. `"image.ready"`.
    pub fn event_type(&self) -> &'static str {
        match &self.message {
            RealtimeMessage::ImageReady { .. } => "image.ready",
            RealtimeMessage::ImageUpdated { .. } => "image.updated",
            RealtimeMessage::ImageDeleted { .. } => "image.deleted",
            RealtimeMessage::ImagesReordered { .. } => "gallery.reordered",
            RealtimeMessage::StarChanged { .. } => "image.star_changed",
            RealtimeMessage::CommentAdded { .. } => "comment.added",
            RealtimeMessage::Notification { .. } => "notification",
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`GalleryEvent`].
pub struct EventBus {
    sender: broadcast::Sender<GalleryEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: GalleryEvent) {
        // Ignore the SendError: it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<GalleryEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
