//! Repository for the `image_stars` relation.
//!
//! Both directions are idempotent: starring an already-starred image and
//! unstarring an unstarred one succeed without changing anything.

use lumen_core::types::DbId;
use sqlx::PgPool;

/// Adds and removes per-user stars.
pub struct StarRepo;

impl StarRepo {
    /// Star `image_id` for `user_id`. Returns `true` if a star was added.
    pub async fn star(pool: &PgPool, image_id: DbId, user_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO image_stars (image_id, user_id) VALUES ($1, $2)
             ON CONFLICT (image_id, user_id) DO NOTHING",
        )
        .bind(image_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove the star on `image_id` for `user_id`. Returns `true` if one was removed.
    pub async fn unstar(pool: &PgPool, image_id: DbId, user_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM image_stars WHERE image_id = $1 AND user_id = $2")
            .bind(image_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Whether `user_id` has starred `image_id`.
    pub async fn is_starred(
        pool: &PgPool,
        image_id: DbId,
        user_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM image_stars WHERE image_id = $1 AND user_id = $2)",
        )
        .bind(image_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }
}
