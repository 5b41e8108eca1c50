pub mod galleries;
pub mod health;
pub mod images;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws?token=                                       WebSocket (realtime push)
///
/// /galleries                                       list, create
/// /galleries/{id}                                  get, update, delete
/// /galleries/{id}/images                           gallery read (confirms landed uploads)
/// /galleries/{id}/uploads                          upload negotiation (POST)
/// /galleries/{id}/order                            reorder (PUT)
///
/// /images/{id}                                     caption (PATCH), delete
/// /images/{id}/star                                star (POST), unstar (DELETE)
/// /images/{id}/comments                            list, create
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // WebSocket endpoint.
        .route("/ws", get(ws::ws_handler))
        // Galleries and their image collections.
        .nest("/galleries", galleries::router())
        // Image-scoped actions (caption, stars, comments).
        .nest("/images", images::router())
}
