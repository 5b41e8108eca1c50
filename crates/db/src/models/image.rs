//! Image entity models and DTOs.
//!
//! An image row is created `pending` when an upload is negotiated and becomes
//! `ready` once the stored object is confirmed. Only `ready` rows are durable
//! images from the client's point of view.

use lumen_core::image::DurableImage;
use lumen_core::types::{DbId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Status of an upload that has been negotiated but not yet confirmed.
pub const STATUS_PENDING: &str = "pending";

/// Status of a confirmed, visible image.
pub const STATUS_READY: &str = "ready";

/// A full row from the `images` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Image {
    pub id: DbId,
    pub gallery_id: DbId,
    pub uploader_id: UserId,
    pub object_key: String,
    pub url: String,
    pub original_filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub position: i32,
    pub caption: Option<String>,
    pub status: String,
    pub confirmed_at: Option<Timestamp>,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Image {
    pub fn is_ready(&self) -> bool {
        self.status == STATUS_READY
    }

    /// Convert to the wire shape used in realtime pushes, which are not
    /// viewer-specific.
    pub fn into_durable(self, comment_count: i64) -> DurableImage {
        DurableImage {
            id: self.id,
            gallery_id: self.gallery_id,
            url: self.url,
            original_filename: self.original_filename,
            width: self.width,
            height: self.height,
            starred: false,
            position: self.position,
            comment_count,
            caption: self.caption,
            created_at: self.created_at,
        }
    }
}

/// A durable image joined with viewer-relative star state and comment count.
#[derive(Debug, Clone, FromRow)]
pub struct DurableImageRow {
    pub id: DbId,
    pub gallery_id: DbId,
    pub url: String,
    pub original_filename: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub position: i32,
    pub caption: Option<String>,
    pub created_at: Timestamp,
    pub starred: bool,
    pub comment_count: i64,
}

impl From<DurableImageRow> for DurableImage {
    fn from(row: DurableImageRow) -> Self {
        DurableImage {
            id: row.id,
            gallery_id: row.gallery_id,
            url: row.url,
            original_filename: row.original_filename,
            width: row.width,
            height: row.height,
            starred: row.starred,
            position: row.position,
            comment_count: row.comment_count,
            caption: row.caption,
            created_at: row.created_at,
        }
    }
}

/// One pending upload to insert during negotiation.
#[derive(Debug, Clone)]
pub struct NewPendingImage {
    pub object_key: String,
    pub url: String,
    pub original_filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

/// DTO for updating an image's editable fields.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateImage {
    pub caption: Option<String>,
}
