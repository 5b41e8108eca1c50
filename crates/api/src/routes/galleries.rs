//! Route definitions for galleries, mounted at `/galleries`.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{galleries, images, uploads};
use crate::state::AppState;

/// ```text
/// GET    /                 -> list_galleries
/// POST   /                 -> create_gallery
/// GET    /{id}             -> get_gallery
/// PATCH  /{id}             -> update_gallery (owner)
/// DELETE /{id}             -> delete_gallery (owner)
/// GET    /{id}/images      -> list_gallery_images
/// POST   /{id}/uploads     -> negotiate_uploads (owner)
/// PUT    /{id}/order       -> reorder_gallery (owner)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(galleries::list_galleries).post(galleries::create_gallery),
        )
        .route(
            "/{id}",
            get(galleries::get_gallery)
                .patch(galleries::update_gallery)
                .delete(galleries::delete_gallery),
        )
        .route("/{id}/images", get(images::list_gallery_images))
        .route("/{id}/uploads", post(uploads::negotiate_uploads))
        .route("/{id}/order", put(images::reorder_gallery))
}
