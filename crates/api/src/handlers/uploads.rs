//! Upload negotiation and confirmation.
//!
//! Image bytes never pass through the API. A client announces the files it
//! wants to upload, receives one signed write target per file, and PUTs the
//! bytes straight to object storage. The pending rows created here become
//! durable images when a later gallery read finds their objects in storage
//! (see [`confirm_pending`]).

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use futures::future::join_all;
use lumen_core::error::CoreError;
use lumen_core::realtime::RealtimeMessage;
use lumen_core::types::DbId;
use lumen_core::upload::{
    extension_for, object_key, sanitize_filename, validate_descriptors, UploadDescriptor,
};
use lumen_db::models::image::{Image, NewPendingImage};
use lumen_db::repositories::ImageRepo;
use lumen_events::{EventBus, GalleryEvent};
use lumen_storage::ObjectMeta;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::handlers::load_owned_gallery;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Request body for `POST /galleries/{id}/uploads`.
#[derive(Debug, Deserialize)]
pub struct NegotiateUploadsRequest {
    pub files: Vec<UploadDescriptor>,
}

/// One negotiated upload, returned in request order.
#[derive(Debug, Serialize)]
pub struct UploadTarget {
    /// Durable id of the image once the upload is confirmed.
    pub image_id: DbId,
    /// Time-limited URL to PUT the file body to.
    pub signed_url: String,
    /// Headers that must accompany the PUT.
    pub headers: Vec<(String, String)>,
    /// When `signed_url` stops being accepted.
    pub expires_at: chrono::DateTime<chrono::Utc>,
    /// Where the image will be readable once stored.
    pub public_url: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/galleries/{id}/uploads
///
/// Validate every descriptor, create one pending image per file, and return
/// a signed write target for each. Nothing is created if any descriptor is
/// rejected. Owner only.
pub async fn negotiate_uploads(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(gallery_id): Path<DbId>,
    Json(input): Json<NegotiateUploadsRequest>,
) -> AppResult<impl IntoResponse> {
    load_owned_gallery(&state.pool, gallery_id, &auth).await?;
    validate_descriptors(&input.files, &state.config.upload_limits)?;

    let mut pending = Vec::with_capacity(input.files.len());
    for file in &input.files {
        let ext = extension_for(&file.content_type).ok_or_else(|| {
            AppError::Core(CoreError::Validation(format!(
                "Unsupported media type '{}'",
                file.content_type
            )))
        })?;
        let key = object_key(gallery_id, ext);
        pending.push(NewPendingImage {
            url: state.storage.public_url(&key),
            object_key: key,
            original_filename: sanitize_filename(&file.name),
            content_type: file.content_type.to_ascii_lowercase(),
            size_bytes: i64::try_from(file.size)
                .map_err(|_| AppError::BadRequest("File size out of range".into()))?,
            width: file.width,
            height: file.height,
        });
    }

    let images =
        ImageRepo::create_pending_batch(&state.pool, gallery_id, &auth.user_id, &pending).await?;

    let mut targets = Vec::with_capacity(images.len());
    for (image, file) in images.into_iter().zip(&input.files) {
        let signed = state
            .storage
            .presign_put(
                &image.object_key,
                &image.content_type,
                file.size,
                state.upload_url_expiry,
            )
            .await?;
        targets.push(UploadTarget {
            image_id: image.id,
            signed_url: signed.url,
            headers: signed.headers,
            expires_at: signed.expires_at,
            public_url: image.url,
        });
    }

    tracing::info!(
        gallery_id,
        user_id = %auth.user_id,
        count = targets.len(),
        "Uploads negotiated"
    );

    Ok(DataResponse::created(targets))
}

// ---------------------------------------------------------------------------
// Confirmation
// ---------------------------------------------------------------------------

/// Promote every pending upload of `gallery_id` whose object now exists in
/// storage, publishing `image_ready` for each. Returns the number confirmed.
///
/// Uploads whose objects are missing stay pending. A storage lookup failure
/// is logged and treated as missing so reads keep working while storage is
/// degraded.
pub(crate) async fn confirm_pending(state: &AppState, gallery_id: DbId) -> AppResult<usize> {
    let pending = ImageRepo::list_pending_by_gallery(&state.pool, gallery_id).await?;
    if pending.is_empty() {
        return Ok(0);
    }

    let lookups = join_all(
        pending
            .iter()
            .map(|image| state.storage.head(&image.object_key)),
    )
    .await;

    let mut confirmed = 0;
    for (image, lookup) in pending.iter().zip(lookups) {
        let meta = match lookup {
            Ok(Some(meta)) => meta,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(image_id = image.id, error = %e, "Storage lookup failed");
                continue;
            }
        };

        if confirm_stored(&state.pool, &state.event_bus, image, &meta).await? {
            confirmed += 1;
        }
    }

    Ok(confirmed)
}

/// Promote one pending upload whose object is in storage and publish
/// `image_ready` to its gallery. Returns `false` if another caller confirmed
/// it first.
pub(crate) async fn confirm_stored(
    pool: &PgPool,
    event_bus: &EventBus,
    image: &Image,
    meta: &ObjectMeta,
) -> Result<bool, sqlx::Error> {
    let Some(ready) = ImageRepo::confirm(pool, image.id, meta.size).await? else {
        return Ok(false);
    };

    tracing::info!(gallery_id = ready.gallery_id, image_id = ready.id, "Upload confirmed");
    let actor = ready.uploader_id.clone();
    event_bus.publish(
        GalleryEvent::new(RealtimeMessage::ImageReady {
            gallery_id: ready.gallery_id,
            image: ready.into_durable(0),
        })
        .with_actor(actor),
    );
    Ok(true)
}
