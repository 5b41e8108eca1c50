//! Realtime message types shared by the server push channel and the
//! client dispatcher.
//!
//! Messages travel as JSON with the shape `{"type": "<kind>", "data": {...}}`.

use serde::{Deserialize, Serialize};

use crate::image::DurableImage;
use crate::types::{DbId, UserId};

/// A server-to-client realtime message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RealtimeMessage {
    /// An upload was confirmed and is now part of the gallery.
    ImageReady { gallery_id: DbId, image: DurableImage },

    /// An image's caption changed.
    ImageUpdated {
        gallery_id: DbId,
        image_id: DbId,
        caption: Option<String>,
    },

    /// An image was soft-deleted.
    ImageDeleted { gallery_id: DbId, image_id: DbId },

    /// The gallery was reordered; `image_ids` is the complete new order.
    ImagesReordered { gallery_id: DbId, image_ids: Vec<DbId> },

    /// A user starred or unstarred an image.
    StarChanged {
        gallery_id: DbId,
        image_id: DbId,
        user_id: UserId,
        starred: bool,
    },

    /// A comment was added; `comment_count` is the new total.
    CommentAdded {
        gallery_id: DbId,
        image_id: DbId,
        comment_count: i64,
    },

    /// A free-form notification for the user.
    Notification {
        gallery_id: Option<DbId>,
        title: String,
        body: String,
    },
}

impl RealtimeMessage {
    /// The gallery this message belongs to, if any.
    pub fn gallery_id(&self) -> Option<DbId> {
        match self {
            Self::ImageReady { gallery_id, .. }
            | Self::ImageUpdated { gallery_id, .. }
            | Self::ImageDeleted { gallery_id, .. }
            | Self::ImagesReordered { gallery_id, .. }
            | Self::StarChanged { gallery_id, .. }
            | Self::CommentAdded { gallery_id, .. } => Some(*gallery_id),
            Self::Notification { gallery_id, .. } => *gallery_id,
        }
    }
}

/// A client-to-server control message on the realtime socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    Subscribe { gallery_id: DbId },
    Unsubscribe { gallery_id: DbId },
}
