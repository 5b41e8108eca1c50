//! Object storage for uploaded images.
//!
//! Browsers never stream image bytes through the API server. The server
//! hands out time-limited signed write targets, the client uploads
//! directly to storage, and the server later confirms the object exists.
//!
//! - [`ObjectStorage`] -- the provider-neutral trait the API depends on.
//! - [`s3::S3Storage`] -- S3-compatible backend (Cloudflare R2 in production).
//! - [`memory::MemoryStorage`] -- in-process backend for tests and local runs.
//! - [`config::StorageConfig`] -- environment-driven backend selection.

pub mod config;
pub mod memory;
pub mod s3;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

pub use config::{build_storage, StorageConfig};
pub use memory::MemoryStorage;
pub use s3::S3Storage;

/// A pre-authorized, time-limited write endpoint for a single object.
#[derive(Debug, Clone, Serialize)]
pub struct SignedTarget {
    /// URL the client must `PUT` the object body to.
    pub url: String,
    /// Headers that were signed and must accompany the upload.
    pub headers: Vec<(String, String)>,
    /// When the signature stops being accepted.
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// Metadata of an object that exists in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectMeta {
    pub size: Option<i64>,
}

/// Errors from a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Building a presigned request failed.
    #[error("Presign failed: {0}")]
    Presign(String),

    /// The storage provider rejected or failed a request.
    #[error("Storage request failed: {0}")]
    Request(String),

    /// Backend configuration is missing or invalid.
    #[error("Storage configuration error: {0}")]
    Config(String),
}

/// Provider-neutral object storage operations used by the API.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Presign a single-object `PUT` for `key` with the declared content
    /// type and size.
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        size: u64,
        expires_in: Duration,
    ) -> Result<SignedTarget, StorageError>;

    /// Public, CDN-backed read URL for `key`.
    fn public_url(&self, key: &str) -> String;

    /// Look up an object. `Ok(None)` means it does not exist (yet).
    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StorageError>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Join a base URL and an object key with exactly one slash between them.
pub(crate) fn join_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key.trim_start_matches('/'))
}
