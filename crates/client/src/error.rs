//! Error types for the client flow.

/// Failure talking to the Lumen API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("API error ({status}): {message}")]
    Status {
        status: u16,
        /// Machine-readable code from the error envelope, if present.
        code: Option<String>,
        message: String,
    },

    /// The response did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// The image is not in the local collection, so no request was sent.
    #[error("Image with id {0} is not visible")]
    NotVisible(lumen_core::types::DbId),
}

impl ApiError {
    /// HTTP status of a rejected request, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure moving bytes to a signed write target.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The storage provider answered with a non-2xx status.
    #[error("Storage rejected the upload with status {0}")]
    Status(u16),

    /// The connection failed before a response arrived.
    #[error("Upload transport failed: {0}")]
    Transport(String),
}

/// Why one file's upload chain stopped.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The backend refused to hand out a write target.
    #[error("Upload was not accepted: {0}")]
    Negotiation(#[source] ApiError),

    /// The bytes did not reach storage.
    #[error("Upload failed: {0}")]
    Transfer(#[from] TransferError),

    /// The entry was dismissed or is not in a state that allows the action.
    #[error("No retryable upload with id {0}")]
    NotRetryable(uuid::Uuid),
}

/// Failure of the realtime connection.
#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("Realtime connection failed: {0}")]
    Connection(String),

    #[error("Realtime protocol error: {0}")]
    Protocol(String),
}
