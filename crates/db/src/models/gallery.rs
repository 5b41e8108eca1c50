use lumen_core::types::{DbId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `galleries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Gallery {
    pub id: DbId,
    pub owner_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new gallery. The owner comes from the authenticated user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGallery {
    pub name: String,
    pub description: Option<String>,
}

/// DTO for updating an existing gallery.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateGallery {
    pub name: Option<String>,
    pub description: Option<String>,
}
