use std::time::Duration;

/// Default delay before a superseded preview is released.
pub const DEFAULT_PREVIEW_RELEASE_GRACE_MS: u64 = 300;

/// Default size of each chunk streamed to a signed write target (256 KiB).
pub const DEFAULT_TRANSFER_CHUNK_BYTES: usize = 256 * 1024;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API, including `/api/v1`.
    pub api_url: String,
    /// URL of the realtime WebSocket endpoint.
    pub ws_url: String,
    /// How long a superseded preview stays registered, so an image element
    /// swapping to the durable URL never shows a blank frame.
    pub preview_release_grace: Duration,
    /// Chunk size for streamed uploads; also the progress granularity.
    pub transfer_chunk_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000/api/v1".into(),
            ws_url: "ws://localhost:3000/api/v1/ws".into(),
            preview_release_grace: Duration::from_millis(DEFAULT_PREVIEW_RELEASE_GRACE_MS),
            transfer_chunk_bytes: DEFAULT_TRANSFER_CHUNK_BYTES,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                          |
    /// |-----------------------------|----------------------------------|
    /// | `LUMEN_API_URL`             | `http://localhost:3000/api/v1`   |
    /// | `LUMEN_WS_URL`              | `ws://localhost:3000/api/v1/ws`  |
    /// | `PREVIEW_RELEASE_GRACE_MS`  | `300`                            |
    /// | `TRANSFER_CHUNK_BYTES`      | `262144`                         |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let preview_release_grace_ms: u64 = std::env::var("PREVIEW_RELEASE_GRACE_MS")
            .unwrap_or_else(|_| DEFAULT_PREVIEW_RELEASE_GRACE_MS.to_string())
            .parse()
            .expect("PREVIEW_RELEASE_GRACE_MS must be a valid u64");

        let transfer_chunk_bytes: usize = std::env::var("TRANSFER_CHUNK_BYTES")
            .unwrap_or_else(|_| DEFAULT_TRANSFER_CHUNK_BYTES.to_string())
            .parse()
            .expect("TRANSFER_CHUNK_BYTES must be a valid usize");
        assert!(transfer_chunk_bytes > 0, "TRANSFER_CHUNK_BYTES must be positive");

        Self {
            api_url: std::env::var("LUMEN_API_URL").unwrap_or(defaults.api_url),
            ws_url: std::env::var("LUMEN_WS_URL").unwrap_or(defaults.ws_url),
            preview_release_grace: Duration::from_millis(preview_release_grace_ms),
            transfer_chunk_bytes,
        }
    }
}
