//! Image encoding: `DynamicImage` → base64 PNG artifact payload.
//!
//! The extraction service accepts page images as base64 strings embedded in
//! the JSON request body. PNG is chosen over JPEG because it is lossless —
//! crisp text matters far more than file size when a vision model is reading
//! a densely printed juror pool sheet.

use crate::pipeline::{ArtifactKind, RawPageArtifact};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page as a base64-PNG image artifact.
pub fn encode_page(
    page_number: usize,
    img: &DynamicImage,
) -> Result<RawPageArtifact, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded page {} → {} bytes base64", page_number, b64.len());

    Ok(RawPageArtifact {
        page_number,
        kind: ArtifactKind::Image,
        payload: b64,
    })
}

/// Wrap an already-encoded image file as a single-page artifact.
///
/// Used for direct JPEG/PNG uploads, which skip rasterisation entirely: the
/// whole file becomes page 1.
pub fn encode_image_file(bytes: &[u8]) -> RawPageArtifact {
    RawPageArtifact {
        page_number: 1,
        kind: ArtifactKind::Image,
        payload: STANDARD.encode(bytes),
    }
}
