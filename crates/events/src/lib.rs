//! Lumen event bus.
//!
//! - [`EventBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`GalleryEvent`] -- envelope around a [`RealtimeMessage`] with the
//!   acting user and a timestamp.
//!
//! [`RealtimeMessage`]: lumen_core::realtime::RealtimeMessage

pub mod bus;

pub use bus::{EventBus, GalleryEvent};
