//! Backend seams of the client flow.
//!
//! - [`GalleryApi`] -- the Lumen REST endpoints the flow calls.
//! - [`Transport`] -- moving file bytes to a signed write target.
//!
//! [`HttpBackend`] and [`HttpTransport`] implement them over [`reqwest`];
//! tests substitute in-process fakes.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use lumen_core::image::DurableImage;
use lumen_core::types::DbId;
use lumen_core::upload::UploadDescriptor;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, TransferError};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// A signed write target handed out by upload negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTarget {
    /// Durable id the image will have once confirmed.
    pub image_id: DbId,
    pub signed_url: String,
    pub public_url: String,
    /// Headers that were signed and must accompany the PUT.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

/// Star state returned by the star endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StarState {
    pub image_id: DbId,
    pub starred: bool,
    pub changed: bool,
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: String,
    code: Option<String>,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// The REST endpoints the client flow depends on.
#[async_trait]
pub trait GalleryApi: Send + Sync {
    /// Negotiate signed write targets, one per descriptor, in order.
    async fn negotiate(
        &self,
        gallery_id: DbId,
        files: &[UploadDescriptor],
    ) -> Result<Vec<UploadTarget>, ApiError>;

    /// Read the gallery's durable images in authoritative order.
    async fn list_images(&self, gallery_id: DbId) -> Result<Vec<DurableImage>, ApiError>;

    /// Star (`true`) or unstar (`false`) an image for the current user.
    async fn set_star(&self, image_id: DbId, starred: bool) -> Result<StarState, ApiError>;

    /// Persist a complete new order of the gallery's durable images.
    async fn reorder(&self, gallery_id: DbId, image_ids: &[DbId]) -> Result<(), ApiError>;
}

/// Callback receiving `(bytes_sent, total_bytes)` as a transfer streams.
pub type ProgressFn<'a> = dyn Fn(u64, u64) + Send + Sync + 'a;

/// Moves a file body to a signed write target.
#[async_trait]
pub trait Transport: Send + Sync {
    /// PUT `body` to `target`, calling `progress` as chunks are handed to
    /// the connection. Resolves `Ok` only on a 2xx answer.
    async fn put(
        &self,
        target: &UploadTarget,
        content_type: &str,
        body: Bytes,
        progress: &ProgressFn<'_>,
    ) -> Result<(), TransferError>;
}

// ---------------------------------------------------------------------------
// HttpBackend
// ---------------------------------------------------------------------------

/// [`GalleryApi`] over HTTP with a bearer session token.
pub struct HttpBackend {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl HttpBackend {
    /// * `api_url` - base URL including `/api/v1`, e.g. `https://lumen.example/api/v1`.
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, token)
    }

    /// Reuse an existing [`reqwest::Client`] (shares its connection pool).
    pub fn with_client(
        client: reqwest::Client,
        api_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    // ---- private helpers ----

    /// Turn a non-2xx response into [`ApiError::Status`], keeping the
    /// server's error envelope when there is one.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => (envelope.code, envelope.error),
            Err(_) => (None, body),
        };
        Err(ApiError::Status {
            status: status.as_u16(),
            code,
            message,
        })
    }

    async fn parse_data<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        let envelope: DataEnvelope<T> = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl GalleryApi for HttpBackend {
    async fn negotiate(
        &self,
        gallery_id: DbId,
        files: &[UploadDescriptor],
    ) -> Result<Vec<UploadTarget>, ApiError> {
        let response = self
            .client
            .post(self.url(&format!("/galleries/{gallery_id}/uploads")))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "files": files }))
            .send()
            .await?;
        Self::parse_data(response).await
    }

    async fn list_images(&self, gallery_id: DbId) -> Result<Vec<DurableImage>, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/galleries/{gallery_id}/images")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::parse_data(response).await
    }

    async fn set_star(&self, image_id: DbId, starred: bool) -> Result<StarState, ApiError> {
        let url = self.url(&format!("/images/{image_id}/star"));
        let request = if starred {
            self.client.post(url)
        } else {
            self.client.delete(url)
        };
        let response = request.bearer_auth(&self.token).send().await?;
        Self::parse_data(response).await
    }

    async fn reorder(&self, gallery_id: DbId, image_ids: &[DbId]) -> Result<(), ApiError> {
        let response = self
            .client
            .put(self.url(&format!("/galleries/{gallery_id}/order")))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "image_ids": image_ids }))
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

/// [`Transport`] that streams the body to the signed URL in fixed-size chunks.
pub struct HttpTransport {
    client: reqwest::Client,
    chunk_bytes: usize,
}

impl HttpTransport {
    pub fn new(chunk_bytes: usize) -> Self {
        Self::with_client(reqwest::Client::new(), chunk_bytes)
    }

    pub fn with_client(client: reqwest::Client, chunk_bytes: usize) -> Self {
        Self {
            client,
            chunk_bytes: chunk_bytes.max(1),
        }
    }
}

/// Split `body` into zero-copy chunks of at most `chunk_bytes`.
pub(crate) fn chunk(body: &Bytes, chunk_bytes: usize) -> Vec<Bytes> {
    let chunk_bytes = chunk_bytes.max(1);
    (0..body.len())
        .step_by(chunk_bytes)
        .map(|start| body.slice(start..(start + chunk_bytes).min(body.len())))
        .collect()
}

#[async_trait]
impl Transport for HttpTransport {
    async fn put(
        &self,
        target: &UploadTarget,
        content_type: &str,
        body: Bytes,
        progress: &ProgressFn<'_>,
    ) -> Result<(), TransferError> {
        let total = body.len() as u64;
        let chunks = chunk(&body, self.chunk_bytes);

        // The stream is driven by the connection, so reporting progress as
        // each chunk is pulled tracks what has been handed to the socket.
        let (report_tx, mut report_rx) = tokio::sync::mpsc::unbounded_channel::<u64>();
        let mut sent = 0u64;
        let body_stream = stream::iter(chunks.into_iter().map(move |piece| {
            sent += piece.len() as u64;
            let _ = report_tx.send(sent);
            Ok::<Bytes, std::io::Error>(piece)
        }));

        let mut request = self
            .client
            .put(&target.signed_url)
            .header(reqwest::header::CONTENT_LENGTH, total)
            .body(reqwest::Body::wrap_stream(body_stream));
        let mut has_content_type = false;
        for (name, value) in &target.headers {
            has_content_type |= name.eq_ignore_ascii_case("content-type");
            request = request.header(name.as_str(), value.as_str());
        }
        if !has_content_type {
            request = request.header(reqwest::header::CONTENT_TYPE, content_type);
        }

        let send = request.send();
        tokio::pin!(send);
        let response = loop {
            tokio::select! {
                Some(sent) = report_rx.recv() => progress(sent, total),
                result = &mut send => break result,
            }
        };
        while let Ok(sent) = report_rx.try_recv() {
            progress(sent, total);
        }

        let response = response.map_err(|e| TransferError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(TransferError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}
