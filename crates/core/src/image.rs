//! Wire shape of a server-confirmed image.

use serde::{Deserialize, Serialize};

use crate::dimensions::Dimensions;
use crate::types::{DbId, Timestamp};

/// A backend-confirmed image as returned by the gallery read endpoint and
/// carried in realtime messages.
///
/// `starred` is relative to the requesting user; realtime pushes, which fan
/// out to every viewer, always carry `false` here and signal star changes
/// separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurableImage {
    pub id: DbId,
    pub gallery_id: DbId,
    pub url: String,
    pub original_filename: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub starred: bool,
    pub position: i32,
    pub comment_count: i64,
    pub caption: Option<String>,
    pub created_at: Timestamp,
}

impl DurableImage {
    /// Stored dimensions, or the placeholder box when unknown.
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::from_columns(self.width, self.height).unwrap_or(Dimensions::PLACEHOLDER)
    }
}
