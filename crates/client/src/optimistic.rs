//! Tentative local changes that are rolled back when the server refuses them.

use std::fmt::Display;
use std::future::Future;

use crate::notify::{Notifier, Toast};

/// Apply a change locally, then confirm it with the server.
///
/// `apply_change` makes the tentative change and returns whatever is needed
/// to undo it. If `request` fails, `restore` receives that snapshot and an
/// error toast titled `title` is shown. On success the snapshot is dropped.
pub async fn apply<S, T, E, Fut>(
    notifier: &Notifier,
    title: &str,
    apply_change: impl FnOnce() -> S,
    request: Fut,
    restore: impl FnOnce(S),
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let prior = apply_change();
    match request.await {
        Ok(value) => Ok(value),
        Err(err) => {
            restore(prior);
            notifier.notify(Toast::error(title, err.to_string()));
            Err(err)
        }
    }
}
