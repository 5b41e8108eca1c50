use std::sync::Arc;
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;

use crate::{MemoryStorage, ObjectStorage, S3Storage, StorageError};

/// Default lifetime of a signed upload URL.
const DEFAULT_UPLOAD_URL_EXPIRY_SECS: u64 = 600;

/// Which storage backend to construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    S3 {
        bucket: String,
        endpoint: Option<String>,
        region: String,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
    },
    Memory,
}

/// Storage configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// CDN origin used to build public read URLs.
    pub cdn_base_url: String,
    /// Lifetime of a signed upload URL.
    pub upload_url_expiry: Duration,
}

impl StorageConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                       |
    /// |------------------------------|-------------------------------|
    /// | `STORAGE_BACKEND`            | `s3` (`memory` for local dev) |
    /// | `STORAGE_BUCKET`             | required for `s3`             |
    /// | `STORAGE_ENDPOINT`           | provider default              |
    /// | `STORAGE_REGION`             | `auto`                        |
    /// | `STORAGE_ACCESS_KEY_ID`      | ambient AWS credentials       |
    /// | `STORAGE_SECRET_ACCESS_KEY`  | ambient AWS credentials       |
    /// | `CDN_BASE_URL`               | `http://localhost:3000/media` |
    /// | `UPLOAD_URL_EXPIRY_SECS`     | `600`                         |
    pub fn from_env() -> Result<Self, StorageError> {
        let backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "s3".into())
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "s3" => StorageBackend::S3 {
                bucket: std::env::var("STORAGE_BUCKET").map_err(|_| {
                    StorageError::Config("STORAGE_BUCKET must be set for the s3 backend".into())
                })?,
                endpoint: std::env::var("STORAGE_ENDPOINT").ok(),
                region: std::env::var("STORAGE_REGION").unwrap_or_else(|_| "auto".into()),
                access_key_id: std::env::var("STORAGE_ACCESS_KEY_ID").ok(),
                secret_access_key: std::env::var("STORAGE_SECRET_ACCESS_KEY").ok(),
            },
            other => {
                return Err(StorageError::Config(format!(
                    "Unknown STORAGE_BACKEND '{other}'. Must be one of: s3, memory"
                )))
            }
        };

        let cdn_base_url = std::env::var("CDN_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000/media".into());

        let expiry_secs: u64 = match std::env::var("UPLOAD_URL_EXPIRY_SECS") {
            Ok(raw) => raw.parse().map_err(|_| {
                StorageError::Config("UPLOAD_URL_EXPIRY_SECS must be a valid u64".into())
            })?,
            Err(_) => DEFAULT_UPLOAD_URL_EXPIRY_SECS,
        };

        Ok(Self {
            backend,
            cdn_base_url,
            upload_url_expiry: Duration::from_secs(expiry_secs),
        })
    }
}

/// Construct the configured backend.
pub async fn build_storage(config: &StorageConfig) -> Result<Arc<dyn ObjectStorage>, StorageError> {
    match &config.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory object storage; uploads are not persisted");
            Ok(Arc::new(MemoryStorage::new(config.cdn_base_url.clone())))
        }
        StorageBackend::S3 {
            bucket,
            endpoint,
            region,
            access_key_id,
            secret_access_key,
        } => {
            let mut loader =
                aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.clone()));

            match (access_key_id, secret_access_key) {
                (Some(key), Some(secret)) => {
                    loader = loader.credentials_provider(Credentials::new(
                        key.clone(),
                        secret.clone(),
                        None,
                        None,
                        "lumen-env",
                    ));
                }
                (None, None) => {}
                _ => {
                    return Err(StorageError::Config(
                        "STORAGE_ACCESS_KEY_ID and STORAGE_SECRET_ACCESS_KEY must be set together"
                            .into(),
                    ))
                }
            }

            let sdk_config = loader.load().await;
            let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
            if let Some(endpoint) = endpoint {
                builder = builder.endpoint_url(endpoint).force_path_style(true);
            }
            let client = aws_sdk_s3::Client::from_conf(builder.build());

            tracing::info!(
                bucket = %bucket,
                endpoint = endpoint.as_deref().unwrap_or("default"),
                "S3 object storage configured"
            );
            Ok(Arc::new(S3Storage::new(
                client,
                bucket.clone(),
                config.cdn_base_url.clone(),
            )))
        }
    }
}
