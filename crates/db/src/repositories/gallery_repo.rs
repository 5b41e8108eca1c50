//! Repository for the `galleries` table.

use lumen_core::types::DbId;
use sqlx::PgPool;

use crate::models::gallery::{CreateGallery, Gallery, UpdateGallery};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, owner_id, name, description, deleted_at, created_at, updated_at";

/// Provides CRUD operations for galleries.
pub struct GalleryRepo;

impl GalleryRepo {
    /// Insert a new gallery owned by `owner_id`, returning the created row.
    pub async fn create(
        pool: &PgPool,
        owner_id: &str,
        input: &CreateGallery,
    ) -> Result<Gallery, sqlx::Error> {
        let query = format!(
            "INSERT INTO galleries (owner_id, name, description)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Gallery>(&query)
            .bind(owner_id)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// Find a gallery by its internal ID. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Gallery>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM galleries WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Gallery>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's galleries, most recently created first. Excludes soft-deleted rows.
    pub async fn list_by_owner(pool: &PgPool, owner_id: &str) -> Result<Vec<Gallery>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM galleries
             WHERE owner_id = $1 AND deleted_at IS NULL
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Gallery>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    /// Update a gallery. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no live row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateGallery,
    ) -> Result<Option<Gallery>, sqlx::Error> {
        let query = format!(
            "UPDATE galleries SET
                name = COALESCE($2, name),
                description = COALESCE($3, description)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Gallery>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a gallery and all of its live images in one transaction.
    /// Returns `true` if the gallery was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let result = sqlx::query(
            "UPDATE galleries SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        sqlx::query(
            "UPDATE images SET deleted_at = NOW() WHERE gallery_id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(true)
    }
}
