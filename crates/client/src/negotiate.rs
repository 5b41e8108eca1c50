//! Asking the backend for a signed write target.

use lumen_core::dimensions::Dimensions;
use lumen_core::types::DbId;
use lumen_core::upload::UploadDescriptor;

use crate::api::{GalleryApi, UploadTarget};
use crate::error::{ApiError, UploadError};
use crate::preview::SelectedFile;

/// Describe `file` for negotiation. Dimensions are only sent when they
/// were actually decoded.
pub fn descriptor_for(file: &SelectedFile, decoded: Option<Dimensions>) -> UploadDescriptor {
    UploadDescriptor {
        name: file.name.clone(),
        content_type: file.content_type.clone(),
        size: file.size(),
        width: decoded.and_then(|d| i32::try_from(d.width).ok()),
        height: decoded.and_then(|d| i32::try_from(d.height).ok()),
    }
}

/// Negotiate a write target for a single file.
///
/// A rejection is returned as [`UploadError::Negotiation`]; nothing is
/// retried here.
pub async fn negotiate(
    api: &dyn GalleryApi,
    gallery_id: DbId,
    file: &SelectedFile,
    decoded: Option<Dimensions>,
) -> Result<UploadTarget, UploadError> {
    let descriptor = descriptor_for(file, decoded);
    let mut targets = api
        .negotiate(gallery_id, std::slice::from_ref(&descriptor))
        .await
        .map_err(UploadError::Negotiation)?;

    if targets.len() != 1 {
        return Err(UploadError::Negotiation(ApiError::Decode(format!(
            "expected 1 upload target, got {}",
            targets.len()
        ))));
    }
    let target = targets.remove(0);
    tracing::debug!(gallery_id, image_id = target.image_id, file = %file.name, "Upload negotiated");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn descriptor_omits_undecoded_dimensions() {
        let file = SelectedFile::new("a.png", "image/png", Bytes::from_static(b"1234"));

        let plain = descriptor_for(&file, None);
        assert_eq!(plain.size, 4);
        assert_eq!((plain.width, plain.height), (None, None));

        let sized = descriptor_for(&file, Some(Dimensions::new(800, 600)));
        assert_eq!((sized.width, sized.height), (Some(800), Some(600)));
    }
}
