//! Handlers for image comments.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use lumen_core::realtime::RealtimeMessage;
use lumen_core::types::DbId;
use lumen_db::models::comment::CreateComment;
use lumen_db::repositories::CommentRepo;
use lumen_events::GalleryEvent;

use crate::error::{AppError, AppResult};
use crate::handlers::load_ready_image;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum comment length, in characters.
const MAX_COMMENT_CHARS: usize = 4000;

/// GET /api/v1/images/{id}/comments
pub async fn list_comments(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(image_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    load_ready_image(&state.pool, image_id).await?;
    let comments = CommentRepo::list_by_image(&state.pool, image_id).await?;
    Ok(DataResponse::ok(comments))
}

/// POST /api/v1/images/{id}/comments
///
/// Publishes `comment_added` with the new total so viewers can update counts.
pub async fn create_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(image_id): Path<DbId>,
    Json(input): Json<CreateComment>,
) -> AppResult<impl IntoResponse> {
    let body = input.body.trim();
    if body.is_empty() {
        return Err(AppError::BadRequest("Comment must not be empty".into()));
    }
    if body.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::BadRequest(format!(
            "Comment must be at most {MAX_COMMENT_CHARS} characters"
        )));
    }

    let image = load_ready_image(&state.pool, image_id).await?;
    let comment = CommentRepo::create(
        &state.pool,
        image_id,
        &auth.user_id,
        &CreateComment {
            body: body.to_string(),
        },
    )
    .await?;
    let comment_count = CommentRepo::count_by_image(&state.pool, image_id).await?;

    tracing::info!(image_id, comment_id = comment.id, user_id = %auth.user_id, "Comment added");

    state.event_bus.publish(
        GalleryEvent::new(RealtimeMessage::CommentAdded {
            gallery_id: image.gallery_id,
            image_id,
            comment_count,
        })
        .with_actor(auth.user_id),
    );

    Ok(DataResponse::created(comment))
}
