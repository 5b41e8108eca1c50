//! Route definitions for individual images, mounted at `/images`.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::{comments, images};
use crate::state::AppState;

/// ```text
/// PATCH  /{id}             -> update_image (owner)
/// DELETE /{id}             -> delete_image (owner)
/// POST   /{id}/star        -> star_image
/// DELETE /{id}/star        -> unstar_image
/// GET    /{id}/comments    -> list_comments
/// POST   /{id}/comments    -> create_comment
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}",
            patch(images::update_image).delete(images::delete_image),
        )
        .route(
            "/{id}/star",
            post(images::star_image).delete(images::unstar_image),
        )
        .route(
            "/{id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
}
