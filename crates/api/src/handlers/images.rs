//! Handlers for durable images: gallery read, reorder, caption, delete and stars.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use lumen_core::error::CoreError;
use lumen_core::image::DurableImage;
use lumen_core::ordering::validate_reorder;
use lumen_core::realtime::RealtimeMessage;
use lumen_core::types::DbId;
use lumen_db::models::image::UpdateImage;
use lumen_db::repositories::{ImageRepo, StarRepo};
use lumen_events::GalleryEvent;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::uploads::confirm_pending;
use crate::handlers::{load_gallery, load_owned_gallery, load_ready_image};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum caption length, in characters.
const MAX_CAPTION_CHARS: usize = 2000;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Body of `PUT /galleries/{id}/order`, echoed back on success.
#[derive(Debug, Deserialize, Serialize)]
pub struct ReorderRequest {
    pub image_ids: Vec<DbId>,
}

/// Response body of the star endpoints.
#[derive(Debug, Serialize)]
pub struct StarState {
    pub image_id: DbId,
    pub starred: bool,
    /// Whether this request changed anything.
    pub changed: bool,
}

// ---------------------------------------------------------------------------
// Gallery read
// ---------------------------------------------------------------------------

/// GET /api/v1/galleries/{id}/images
///
/// Durable images in position order, with `starred` relative to the caller.
/// Pending uploads whose objects have landed in storage are confirmed first,
/// so a read after a successful transfer includes the new image.
pub async fn list_gallery_images(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(gallery_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    load_gallery(&state.pool, gallery_id).await?;

    confirm_pending(&state, gallery_id).await?;

    let images: Vec<DurableImage> =
        ImageRepo::list_durable(&state.pool, gallery_id, &auth.user_id)
            .await?
            .into_iter()
            .map(DurableImage::from)
            .collect();

    Ok(DataResponse::ok(images))
}

// ---------------------------------------------------------------------------
// Reorder
// ---------------------------------------------------------------------------

/// PUT /api/v1/galleries/{id}/order
///
/// Replace the gallery's order. `image_ids` must list every durable image
/// exactly once. Owner only.
pub async fn reorder_gallery(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(gallery_id): Path<DbId>,
    Json(input): Json<ReorderRequest>,
) -> AppResult<impl IntoResponse> {
    load_owned_gallery(&state.pool, gallery_id, &auth).await?;

    let current = ImageRepo::active_ids(&state.pool, gallery_id).await?;
    validate_reorder(&current, &input.image_ids)?;

    if !ImageRepo::reorder(&state.pool, gallery_id, &input.image_ids).await? {
        return Err(AppError::Core(CoreError::Conflict(
            "Gallery images changed while reordering; reload and retry".into(),
        )));
    }

    tracing::info!(
        gallery_id,
        user_id = %auth.user_id,
        count = input.image_ids.len(),
        "Gallery reordered"
    );

    state.event_bus.publish(
        GalleryEvent::new(RealtimeMessage::ImagesReordered {
            gallery_id,
            image_ids: input.image_ids.clone(),
        })
        .with_actor(auth.user_id),
    );

    Ok(DataResponse::ok(ReorderRequest {
        image_ids: input.image_ids,
    }))
}

// ---------------------------------------------------------------------------
// Caption / delete
// ---------------------------------------------------------------------------

/// PATCH /api/v1/images/{id}
///
/// Update an image's caption. Gallery owner only.
pub async fn update_image(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(image_id): Path<DbId>,
    Json(input): Json<UpdateImage>,
) -> AppResult<impl IntoResponse> {
    if let Some(caption) = &input.caption {
        if caption.chars().count() > MAX_CAPTION_CHARS {
            return Err(AppError::BadRequest(format!(
                "Caption must be at most {MAX_CAPTION_CHARS} characters"
            )));
        }
    }

    let image = load_ready_image(&state.pool, image_id).await?;
    load_owned_gallery(&state.pool, image.gallery_id, &auth).await?;

    let updated = ImageRepo::update_caption(&state.pool, image_id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Image", image_id))?;

    state.event_bus.publish(
        GalleryEvent::new(RealtimeMessage::ImageUpdated {
            gallery_id: updated.gallery_id,
            image_id,
            caption: updated.caption.clone(),
        })
        .with_actor(auth.user_id.clone()),
    );

    let durable = ImageRepo::find_durable(&state.pool, image_id, &auth.user_id)
        .await?
        .map(DurableImage::from)
        .ok_or_else(|| AppError::not_found("Image", image_id))?;

    Ok(DataResponse::ok(durable))
}

/// DELETE /api/v1/images/{id}
///
/// Soft-delete an image. Gallery owner only.
pub async fn delete_image(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(image_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let image = load_ready_image(&state.pool, image_id).await?;
    load_owned_gallery(&state.pool, image.gallery_id, &auth).await?;

    if !ImageRepo::soft_delete(&state.pool, image_id).await? {
        return Err(AppError::not_found("Image", image_id));
    }

    tracing::info!(
        image_id,
        gallery_id = image.gallery_id,
        user_id = %auth.user_id,
        "Image deleted"
    );

    state.event_bus.publish(
        GalleryEvent::new(RealtimeMessage::ImageDeleted {
            gallery_id: image.gallery_id,
            image_id,
        })
        .with_actor(auth.user_id),
    );

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Stars
// ---------------------------------------------------------------------------

/// POST /api/v1/images/{id}/star
///
/// Star an image for the caller. Starring twice is a no-op.
pub async fn star_image(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(image_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    set_star(auth, state, image_id, true).await
}

/// DELETE /api/v1/images/{id}/star
///
/// Remove the caller's star. Unstarring an unstarred image is a no-op.
pub async fn unstar_image(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(image_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    set_star(auth, state, image_id, false).await
}

async fn set_star(
    auth: AuthUser,
    state: AppState,
    image_id: DbId,
    starred: bool,
) -> AppResult<Json<DataResponse<StarState>>> {
    let image = load_ready_image(&state.pool, image_id).await?;

    let changed = if starred {
        StarRepo::star(&state.pool, image_id, &auth.user_id).await?
    } else {
        StarRepo::unstar(&state.pool, image_id, &auth.user_id).await?
    };

    if changed {
        tracing::debug!(image_id, user_id = %auth.user_id, starred, "Star changed");
        state.event_bus.publish(
            GalleryEvent::new(RealtimeMessage::StarChanged {
                gallery_id: image.gallery_id,
                image_id,
                user_id: auth.user_id.clone(),
                starred,
            })
            .with_actor(auth.user_id),
        );
    }

    Ok(DataResponse::ok(StarState {
        image_id,
        starred,
        changed,
    }))
}
