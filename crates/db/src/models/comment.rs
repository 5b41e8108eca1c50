use lumen_core::types::{DbId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `comments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Comment {
    pub id: DbId,
    pub image_id: DbId,
    pub author_id: UserId,
    pub body: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for posting a comment. The author comes from the authenticated user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateComment {
    pub body: String,
}
