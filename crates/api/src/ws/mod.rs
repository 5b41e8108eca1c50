//! WebSocket infrastructure for realtime gallery updates.
//!
//! Provides connection management with per-gallery subscriptions, heartbeat
//! monitoring, and the HTTP upgrade handler used by Axum routes.

mod handler;
pub mod manager;

pub use handler::ws_handler;
pub use manager::{WsManager, HEARTBEAT_INTERVAL};
