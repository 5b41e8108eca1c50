//! User-facing toast notifications.
//!
//! Failed uploads and rolled-back optimistic changes surface as toasts.
//! Anything that renders them subscribes to the [`Notifier`].

use serde::Serialize;
use tokio::sync::broadcast;

/// Severity of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastLevel {
    Info,
    Error,
}

/// A transient message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub level: ToastLevel,
    pub title: String,
    pub body: String,
}

impl Toast {
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Info,
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            title: title.into(),
            body: body.into(),
        }
    }
}

const TOAST_CAPACITY: usize = 64;

/// Fan-out of toasts to whoever is displaying them.
#[derive(Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Toast>,
}

impl Notifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(TOAST_CAPACITY);
        Self { sender }
    }

    /// Show a toast. Toasts with no subscriber are only logged.
    pub fn notify(&self, toast: Toast) {
        match toast.level {
            ToastLevel::Info => tracing::info!(title = %toast.title, body = %toast.body, "Toast"),
            ToastLevel::Error => tracing::warn!(title = %toast.title, body = %toast.body, "Toast"),
        }
        let _ = self.sender.send(toast);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.sender.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
