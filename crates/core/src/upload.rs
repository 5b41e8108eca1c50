//! Upload descriptors, limits, and object key naming.
//!
//! A client announces each file it wants to upload with an
//! [`UploadDescriptor`]; the server validates the whole batch before
//! creating any pending image rows or signed write targets.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default maximum size of a single uploaded file (25 MiB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 25 * 1024 * 1024;

/// Default maximum number of files accepted by one negotiation request.
pub const DEFAULT_MAX_FILES_PER_REQUEST: usize = 50;

/// Maximum length of an original filename, in characters.
pub const MAX_FILENAME_CHARS: usize = 255;

/// Media types accepted for upload, with the extension used for object keys.
pub const ACCEPTED_MEDIA_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
    ("image/avif", "avif"),
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One file a client intends to upload.
///
/// `width`/`height` are the dimensions the client decoded locally. They are
/// optional because local decode may fail for formats the client cannot read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
}

/// Per-request upload limits enforced by the negotiation endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_file_bytes: u64,
    pub max_files_per_request: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_files_per_request: DEFAULT_MAX_FILES_PER_REQUEST,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Return the object-key extension for an accepted media type.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    ACCEPTED_MEDIA_TYPES
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(content_type))
        .map(|(_, ext)| *ext)
}

/// Validate a single descriptor against `limits`.
pub fn validate_descriptor(
    descriptor: &UploadDescriptor,
    limits: &UploadLimits,
) -> Result<(), CoreError> {
    if descriptor.name.trim().is_empty() {
        return Err(CoreError::Validation("File name must not be empty".into()));
    }
    if descriptor.name.chars().count() > MAX_FILENAME_CHARS {
        return Err(CoreError::Validation(format!(
            "File name must be at most {MAX_FILENAME_CHARS} characters"
        )));
    }
    if extension_for(&descriptor.content_type).is_none() {
        let accepted: Vec<&str> = ACCEPTED_MEDIA_TYPES.iter().map(|(m, _)| *m).collect();
        return Err(CoreError::Validation(format!(
            "Unsupported media type '{}' for '{}'. Must be one of: {}",
            descriptor.content_type,
            descriptor.name,
            accepted.join(", ")
        )));
    }
    if descriptor.size == 0 {
        return Err(CoreError::Validation(format!(
            "File '{}' is empty",
            descriptor.name
        )));
    }
    if descriptor.size > limits.max_file_bytes {
        return Err(CoreError::Validation(format!(
            "File '{}' is {} bytes; the limit is {} bytes",
            descriptor.name, descriptor.size, limits.max_file_bytes
        )));
    }
    for (label, value) in [("width", descriptor.width), ("height", descriptor.height)] {
        if matches!(value, Some(v) if v <= 0) {
            return Err(CoreError::Validation(format!(
                "File '{}' has a non-positive {label}",
                descriptor.name
            )));
        }
    }
    Ok(())
}

/// Validate a whole negotiation batch. Nothing is created unless every
/// descriptor passes.
pub fn validate_descriptors(
    descriptors: &[UploadDescriptor],
    limits: &UploadLimits,
) -> Result<(), CoreError> {
    if descriptors.is_empty() {
        return Err(CoreError::Validation(
            "At least one file must be requested".into(),
        ));
    }
    if descriptors.len() > limits.max_files_per_request {
        return Err(CoreError::Validation(format!(
            "At most {} files may be requested at once, got {}",
            limits.max_files_per_request,
            descriptors.len()
        )));
    }
    descriptors
        .iter()
        .try_for_each(|d| validate_descriptor(d, limits))
}

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

/// Build the storage key for a new object in `gallery_id`.
///
/// Keys never contain the client-supplied filename, only a fresh UUID, so
/// two uploads of the same file never collide.
pub fn object_key(gallery_id: DbId, extension: &str) -> String {
    format!("galleries/{gallery_id}/{}.{extension}", uuid::Uuid::new_v4())
}

/// Reduce a client-supplied filename to its final path component with
/// control characters removed.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name);
    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.chars().take(MAX_FILENAME_CHARS).collect()
    }
}
