//! Periodic removal of deleted and abandoned images.
//!
//! Two kinds of rows are purged, both from object storage and the database:
//!
//! - images soft-deleted more than `retention_days` ago;
//! - pending uploads that were negotiated more than `stale_pending_hours`
//!   ago and whose object never reached storage (the client gave up or the
//!   transfer failed).
//!
//! A stale pending upload whose object did land is confirmed instead, the
//! same way a gallery read would.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use lumen_db::models::image::Image;
use lumen_db::repositories::ImageRepo;
use lumen_events::EventBus;
use lumen_storage::ObjectStorage;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::handlers::uploads::confirm_stored;

/// Default retention of soft-deleted images: 30 days.
const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Default age after which an unconfirmed upload is abandoned: 24 hours.
const DEFAULT_STALE_PENDING_HOURS: i64 = 24;

/// Default interval between purge runs: 1 hour.
const DEFAULT_INTERVAL_SECS: u64 = 3600;

/// Maximum rows handled per category per run.
const BATCH_SIZE: i64 = 500;

/// Purge job settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeConfig {
    pub retention_days: i64,
    pub stale_pending_hours: i64,
    pub interval: Duration,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_RETENTION_DAYS,
            stale_pending_hours: DEFAULT_STALE_PENDING_HOURS,
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
        }
    }
}

impl PurgeConfig {
    /// Load settings from `PURGE_RETENTION_DAYS`, `STALE_PENDING_HOURS` and
    /// `PURGE_INTERVAL_SECS`, falling back to defaults for unset or invalid values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            retention_days: std::env::var("PURGE_RETENTION_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.retention_days),
            stale_pending_hours: std::env::var("STALE_PENDING_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.stale_pending_hours),
            interval: std::env::var("PURGE_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.interval),
        }
    }
}

/// Outcome of a single purge pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeReport {
    pub deleted_purged: usize,
    pub stale_purged: usize,
    /// Stale pending uploads found in storage and confirmed.
    pub stale_confirmed: usize,
}

/// Run the purge loop until `cancel` is triggered.
pub async fn run(
    pool: PgPool,
    storage: Arc<dyn ObjectStorage>,
    event_bus: Arc<EventBus>,
    config: PurgeConfig,
    cancel: CancellationToken,
) {
    tracing::info!(
        retention_days = config.retention_days,
        stale_pending_hours = config.stale_pending_hours,
        interval_secs = config.interval.as_secs(),
        "Image purge job started"
    );

    let mut interval = tokio::time::interval(config.interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Image purge job stopping");
                break;
            }
            _ = interval.tick() => {
                match purge_once(&pool, storage.as_ref(), &event_bus, &config).await {
                    Ok(report) if report != PurgeReport::default() => {
                        tracing::info!(
                            deleted = report.deleted_purged,
                            stale = report.stale_purged,
                            confirmed = report.stale_confirmed,
                            "Image purge: removed rows"
                        );
                    }
                    Ok(_) => tracing::debug!("Image purge: nothing to remove"),
                    Err(e) => tracing::error!(error = %e, "Image purge: run failed"),
                }
            }
        }
    }
}

/// Run a single purge pass.
///
/// An image whose storage object cannot be deleted keeps its row so the next
/// pass retries it. A stale pending upload whose storage lookup fails is
/// left for the next pass as well.
pub async fn purge_once(
    pool: &PgPool,
    storage: &dyn ObjectStorage,
    event_bus: &EventBus,
    config: &PurgeConfig,
) -> Result<PurgeReport, sqlx::Error> {
    let now = Utc::now();

    let deleted_cutoff = now - chrono::Duration::days(config.retention_days);
    let deleted = ImageRepo::list_deleted_before(pool, deleted_cutoff, BATCH_SIZE).await?;

    let stale_cutoff = now - chrono::Duration::hours(config.stale_pending_hours);
    let stale = ImageRepo::list_stale_pending(pool, stale_cutoff, BATCH_SIZE).await?;

    let lookups = join_all(stale.iter().map(|image| storage.head(&image.object_key))).await;
    let mut abandoned = Vec::new();
    let mut stale_confirmed = 0;
    for (image, lookup) in stale.into_iter().zip(lookups) {
        match lookup {
            Ok(Some(meta)) => {
                if confirm_stored(pool, event_bus, &image, &meta).await? {
                    stale_confirmed += 1;
                }
            }
            Ok(None) => abandoned.push(image),
            Err(e) => tracing::warn!(
                image_id = image.id,
                error = %e,
                "Image purge: storage lookup failed, will retry"
            ),
        }
    }

    Ok(PurgeReport {
        deleted_purged: remove_all(pool, storage, &deleted).await?,
        stale_purged: remove_all(pool, storage, &abandoned).await?,
        stale_confirmed,
    })
}

async fn remove_all(
    pool: &PgPool,
    storage: &dyn ObjectStorage,
    images: &[Image],
) -> Result<usize, sqlx::Error> {
    let mut removed = 0;
    for image in images {
        if let Err(e) = storage.delete(&image.object_key).await {
            tracing::warn!(
                image_id = image.id,
                object_key = %image.object_key,
                error = %e,
                "Image purge: storage delete failed, will retry"
            );
            continue;
        }
        if ImageRepo::hard_delete(pool, image.id).await? {
            removed += 1;
        }
    }
    Ok(removed)
}
