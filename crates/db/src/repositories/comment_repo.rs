//! Repository for the `comments` table.

use lumen_core::types::DbId;
use sqlx::PgPool;

use crate::models::comment::{Comment, CreateComment};

const COLUMNS: &str = "id, image_id, author_id, body, created_at, updated_at";

/// Provides create/list operations for image comments.
pub struct CommentRepo;

impl CommentRepo {
    /// Insert a comment on `image_id`, returning the created row.
    pub async fn create(
        pool: &PgPool,
        image_id: DbId,
        author_id: &str,
        input: &CreateComment,
    ) -> Result<Comment, sqlx::Error> {
        let query = format!(
            "INSERT INTO comments (image_id, author_id, body)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(image_id)
            .bind(author_id)
            .bind(&input.body)
            .fetch_one(pool)
            .await
    }

    /// List live comments on an image, oldest first.
    pub async fn list_by_image(pool: &PgPool, image_id: DbId) -> Result<Vec<Comment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM comments
             WHERE image_id = $1 AND deleted_at IS NULL
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(image_id)
            .fetch_all(pool)
            .await
    }

    /// Number of live comments on an image.
    pub async fn count_by_image(pool: &PgPool, image_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM comments WHERE image_id = $1 AND deleted_at IS NULL",
        )
        .bind(image_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }
}
