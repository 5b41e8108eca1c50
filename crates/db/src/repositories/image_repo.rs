//! Repository for the `images` table.

use lumen_core::ordering::{next_position, positions_for};
use lumen_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::image::{DurableImageRow, Image, NewPendingImage, UpdateImage};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, gallery_id, uploader_id, object_key, url, original_filename, \
     content_type, size_bytes, width, height, position, caption, status, confirmed_at, \
     deleted_at, created_at, updated_at";

/// Select list for durable images; `$2` is the viewing user.
const DURABLE_SELECT: &str = "SELECT i.id, i.gallery_id, i.url, i.original_filename, \
     i.width, i.height, i.position, i.caption, i.created_at, \
     EXISTS (SELECT 1 FROM image_stars s WHERE s.image_id = i.id AND s.user_id = $2) AS starred, \
     (SELECT COUNT(*) FROM comments c WHERE c.image_id = i.id AND c.deleted_at IS NULL) AS comment_count \
     FROM images i";

/// Provides queries for pending and durable images.
pub struct ImageRepo;

impl ImageRepo {
    /// Insert one pending row per upload, in order, appended after the
    /// gallery's current last position.
    ///
    /// The gallery row is locked for the duration so concurrent negotiations
    /// cannot compute the same positions. Returns `RowNotFound` if the
    /// gallery does not exist or is deleted.
    pub async fn create_pending_batch(
        pool: &PgPool,
        gallery_id: DbId,
        uploader_id: &str,
        items: &[NewPendingImage],
    ) -> Result<Vec<Image>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT id FROM galleries WHERE id = $1 AND deleted_at IS NULL FOR UPDATE")
            .bind(gallery_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        let (max,): (Option<i32>,) = sqlx::query_as(
            "SELECT MAX(position) FROM images WHERE gallery_id = $1 AND deleted_at IS NULL",
        )
        .bind(gallery_id)
        .fetch_one(&mut *tx)
        .await?;

        let insert = format!(
            "INSERT INTO images (gallery_id, uploader_id, object_key, url, original_filename,
                                 content_type, size_bytes, width, height, position, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending')
             RETURNING {COLUMNS}"
        );

        let mut position = next_position(max);
        let mut created = Vec::with_capacity(items.len());
        for item in items {
            let image = sqlx::query_as::<_, Image>(&insert)
                .bind(gallery_id)
                .bind(uploader_id)
                .bind(&item.object_key)
                .bind(&item.url)
                .bind(&item.original_filename)
                .bind(&item.content_type)
                .bind(item.size_bytes)
                .bind(item.width)
                .bind(item.height)
                .bind(position)
                .fetch_one(&mut *tx)
                .await?;
            created.push(image);
            position += 1;
        }

        tx.commit().await?;
        Ok(created)
    }

    /// Find a live image (pending or ready) by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Image>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM images WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Image>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List the live pending uploads of a gallery, in position order.
    pub async fn list_pending_by_gallery(
        pool: &PgPool,
        gallery_id: DbId,
    ) -> Result<Vec<Image>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM images
             WHERE gallery_id = $1 AND status = 'pending' AND deleted_at IS NULL
             ORDER BY position"
        );
        sqlx::query_as::<_, Image>(&query)
            .bind(gallery_id)
            .fetch_all(pool)
            .await
    }

    /// Promote a pending upload to `ready`, recording the stored object size.
    ///
    /// Returns `None` if the row is not pending (already confirmed, deleted,
    /// or missing), so concurrent confirmations promote a row exactly once.
    pub async fn confirm(
        pool: &PgPool,
        id: DbId,
        stored_size: Option<i64>,
    ) -> Result<Option<Image>, sqlx::Error> {
        let query = format!(
            "UPDATE images SET
                status = 'ready',
                confirmed_at = NOW(),
                size_bytes = COALESCE($2, size_bytes)
             WHERE id = $1 AND status = 'pending' AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Image>(&query)
            .bind(id)
            .bind(stored_size)
            .fetch_optional(pool)
            .await
    }

    /// List a gallery's durable images in position order, with star state
    /// relative to `viewer_id`.
    pub async fn list_durable(
        pool: &PgPool,
        gallery_id: DbId,
        viewer_id: &str,
    ) -> Result<Vec<DurableImageRow>, sqlx::Error> {
        let query = format!(
            "{DURABLE_SELECT}
             WHERE i.gallery_id = $1 AND i.status = 'ready' AND i.deleted_at IS NULL
             ORDER BY i.position"
        );
        sqlx::query_as::<_, DurableImageRow>(&query)
            .bind(gallery_id)
            .bind(viewer_id)
            .fetch_all(pool)
            .await
    }

    /// Find one durable image, with star state relative to `viewer_id`.
    pub async fn find_durable(
        pool: &PgPool,
        id: DbId,
        viewer_id: &str,
    ) -> Result<Option<DurableImageRow>, sqlx::Error> {
        let query = format!(
            "{DURABLE_SELECT}
             WHERE i.id = $1 AND i.status = 'ready' AND i.deleted_at IS NULL"
        );
        sqlx::query_as::<_, DurableImageRow>(&query)
            .bind(id)
            .bind(viewer_id)
            .fetch_optional(pool)
            .await
    }

    /// IDs of the gallery's durable images in position order.
    pub async fn active_ids(pool: &PgPool, gallery_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT id FROM images
             WHERE gallery_id = $1 AND status = 'ready' AND deleted_at IS NULL
             ORDER BY position",
        )
        .bind(gallery_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Update an image's caption. Returns `None` if no live ready image matches.
    pub async fn update_caption(
        pool: &PgPool,
        id: DbId,
        input: &UpdateImage,
    ) -> Result<Option<Image>, sqlx::Error> {
        let query = format!(
            "UPDATE images SET caption = COALESCE($2, caption)
             WHERE id = $1 AND status = 'ready' AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Image>(&query)
            .bind(id)
            .bind(&input.caption)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete an image by ID. Returns `true` if a row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE images SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Persist a complete new order for a gallery's durable images.
    ///
    /// Runs in one transaction: the set of durable ids is re-read under a
    /// lock on the gallery and compared with `order`. Returns `false`
    /// without writing anything if they differ. Pending uploads keep their
    /// relative order and are renumbered after the durable images so
    /// positions stay unique.
    pub async fn reorder(
        pool: &PgPool,
        gallery_id: DbId,
        order: &[DbId],
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT id FROM galleries WHERE id = $1 AND deleted_at IS NULL FOR UPDATE")
            .bind(gallery_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        let current: Vec<(DbId,)> = sqlx::query_as(
            "SELECT id FROM images
             WHERE gallery_id = $1 AND status = 'ready' AND deleted_at IS NULL",
        )
        .bind(gallery_id)
        .fetch_all(&mut *tx)
        .await?;
        let mut current: Vec<DbId> = current.into_iter().map(|(id,)| id).collect();
        let mut requested = order.to_vec();
        current.sort_unstable();
        requested.sort_unstable();
        if current != requested {
            return Ok(false);
        }

        // Move every live row to a unique negative slot so the new positions
        // never collide with old ones mid-statement.
        sqlx::query(
            "UPDATE images SET position = -position - 1
             WHERE gallery_id = $1 AND deleted_at IS NULL",
        )
        .bind(gallery_id)
        .execute(&mut *tx)
        .await?;

        let (ids, positions): (Vec<DbId>, Vec<i32>) = positions_for(order).into_iter().unzip();
        sqlx::query(
            "UPDATE images AS i SET position = o.position
             FROM UNNEST($2::bigint[], $3::int[]) AS o(id, position)
             WHERE i.id = o.id AND i.gallery_id = $1",
        )
        .bind(gallery_id)
        .bind(&ids)
        .bind(&positions)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE images AS i SET position = ($2 + r.rank - 1)::int
             FROM (
                 SELECT id, ROW_NUMBER() OVER (ORDER BY position DESC) AS rank
                 FROM images
                 WHERE gallery_id = $1 AND status = 'pending' AND deleted_at IS NULL
             ) AS r
             WHERE i.id = r.id",
        )
        .bind(gallery_id)
        .bind(order.len() as i32)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::debug!(gallery_id, count = order.len(), "Gallery reordered");
        Ok(true)
    }

    /// Soft-deleted images whose retention window ended before `cutoff`.
    pub async fn list_deleted_before(
        pool: &PgPool,
        cutoff: Timestamp,
        limit: i64,
    ) -> Result<Vec<Image>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM images
             WHERE deleted_at IS NOT NULL AND deleted_at < $1
             ORDER BY deleted_at
             LIMIT $2"
        );
        sqlx::query_as::<_, Image>(&query)
            .bind(cutoff)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Pending uploads negotiated before `cutoff` that were never confirmed.
    pub async fn list_stale_pending(
        pool: &PgPool,
        cutoff: Timestamp,
        limit: i64,
    ) -> Result<Vec<Image>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM images
             WHERE status = 'pending' AND deleted_at IS NULL AND created_at < $1
             ORDER BY created_at
             LIMIT $2"
        );
        sqlx::query_as::<_, Image>(&query)
            .bind(cutoff)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Permanently delete an image row. Returns `true` if a row was removed.
    pub async fn hard_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
