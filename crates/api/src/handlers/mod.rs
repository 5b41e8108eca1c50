pub mod comments;
pub mod galleries;
pub mod images;
pub mod uploads;

use lumen_core::error::CoreError;
use lumen_core::types::DbId;
use lumen_db::models::gallery::Gallery;
use lumen_db::models::image::Image;
use lumen_db::repositories::{GalleryRepo, ImageRepo};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;

/// Load a live gallery or fail with 404.
pub(crate) async fn load_gallery(pool: &PgPool, gallery_id: DbId) -> AppResult<Gallery> {
    GalleryRepo::find_by_id(pool, gallery_id)
        .await?
        .ok_or_else(|| AppError::not_found("Gallery", gallery_id))
}

/// Load a live gallery and require that `auth` owns it.
pub(crate) async fn load_owned_gallery(
    pool: &PgPool,
    gallery_id: DbId,
    auth: &AuthUser,
) -> AppResult<Gallery> {
    let gallery = load_gallery(pool, gallery_id).await?;
    if gallery.owner_id != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the gallery owner can modify it".into(),
        )));
    }
    Ok(gallery)
}

/// Load a live, confirmed image or fail with 404.
pub(crate) async fn load_ready_image(pool: &PgPool, image_id: DbId) -> AppResult<Image> {
    ImageRepo::find_by_id(pool, image_id)
        .await?
        .filter(Image::is_ready)
        .ok_or_else(|| AppError::not_found("Image", image_id))
}
