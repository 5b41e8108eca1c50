use lumen_core::upload::{UploadLimits, DEFAULT_MAX_FILES_PER_REQUEST, DEFAULT_MAX_FILE_BYTES};

use crate::auth::jwt::JwtConfig;
use crate::background::purge::PurgeConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on post-shutdown cleanup of background tasks (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// JWT validation settings for identity-provider session tokens.
    pub jwt: JwtConfig,
    /// Limits enforced by the upload negotiation endpoint.
    pub upload_limits: UploadLimits,
    /// Retention and scheduling for the background purge job.
    pub purge: PurgeConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                    |
    /// |---------------------------|----------------------------|
    /// | `HOST`                    | `0.0.0.0`                  |
    /// | `PORT`                    | `3000`                     |
    /// | `CORS_ORIGINS`            | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`   | `30`                       |
    /// | `MAX_UPLOAD_BYTES`        | `26214400` (25 MiB)        |
    /// | `MAX_UPLOADS_PER_REQUEST` | `50`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let max_file_bytes: u64 = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| DEFAULT_MAX_FILE_BYTES.to_string())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid u64");

        let max_files_per_request: usize = std::env::var("MAX_UPLOADS_PER_REQUEST")
            .unwrap_or_else(|_| DEFAULT_MAX_FILES_PER_REQUEST.to_string())
            .parse()
            .expect("MAX_UPLOADS_PER_REQUEST must be a valid usize");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            upload_limits: UploadLimits {
                max_file_bytes,
                max_files_per_request,
            },
            purge: PurgeConfig::from_env(),
        }
    }
}
