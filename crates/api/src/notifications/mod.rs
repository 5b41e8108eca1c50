//! Realtime event routing.
//!
//! The [`NotificationRouter`] subscribes to the event bus and pushes each
//! gallery event to the WebSocket connections watching that gallery.

pub mod router;

pub use router::NotificationRouter;
