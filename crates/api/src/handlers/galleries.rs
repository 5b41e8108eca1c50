//! Handlers for gallery CRUD.
//!
//! Any authenticated user can view a gallery; only its owner can change it.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use lumen_core::types::DbId;
use lumen_db::models::gallery::{CreateGallery, UpdateGallery};
use lumen_db::repositories::GalleryRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::{load_gallery, load_owned_gallery};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum length of a gallery name, in characters.
const MAX_NAME_CHARS: usize = 200;

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("Gallery name must not be empty".into()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::BadRequest(format!(
            "Gallery name must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(())
}

/// POST /api/v1/galleries
pub async fn create_gallery(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateGallery>,
) -> AppResult<impl IntoResponse> {
    validate_name(&input.name)?;

    let gallery = GalleryRepo::create(&state.pool, &auth.user_id, &input).await?;

    tracing::info!(gallery_id = gallery.id, user_id = %auth.user_id, "Gallery created");

    Ok(DataResponse::created(gallery))
}

/// GET /api/v1/galleries
///
/// List the caller's own galleries.
pub async fn list_galleries(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let galleries = GalleryRepo::list_by_owner(&state.pool, &auth.user_id).await?;
    Ok(DataResponse::ok(galleries))
}

/// GET /api/v1/galleries/{id}
pub async fn get_gallery(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(gallery_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let gallery = load_gallery(&state.pool, gallery_id).await?;
    Ok(DataResponse::ok(gallery))
}

/// PATCH /api/v1/galleries/{id}
pub async fn update_gallery(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(gallery_id): Path<DbId>,
    Json(input): Json<UpdateGallery>,
) -> AppResult<impl IntoResponse> {
    if let Some(name) = &input.name {
        validate_name(name)?;
    }
    load_owned_gallery(&state.pool, gallery_id, &auth).await?;

    let gallery = GalleryRepo::update(&state.pool, gallery_id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Gallery", gallery_id))?;

    tracing::info!(gallery_id, user_id = %auth.user_id, "Gallery updated");

    Ok(DataResponse::ok(gallery))
}

/// DELETE /api/v1/galleries/{id}
///
/// Soft-deletes the gallery and its images; the purge job removes them later.
pub async fn delete_gallery(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(gallery_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    load_owned_gallery(&state.pool, gallery_id, &auth).await?;

    if !GalleryRepo::soft_delete(&state.pool, gallery_id).await? {
        return Err(AppError::not_found("Gallery", gallery_id));
    }

    tracing::info!(gallery_id, user_id = %auth.user_id, "Gallery deleted");

    Ok(StatusCode::NO_CONTENT)
}
