use std::sync::Arc;

use lumen_storage::ObjectStorage;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: lumen_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Object storage for uploaded images.
    pub storage: Arc<dyn ObjectStorage>,
    /// Lifetime of signed upload URLs.
    pub upload_url_expiry: std::time::Duration,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Centralized event bus for publishing gallery events.
    pub event_bus: Arc<lumen_events::EventBus>,
}
