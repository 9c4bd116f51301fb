//! Frame encoding: `DynamicImage` → JPEG bytes → base64 `ImageData`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// Encode a frame as JPEG at the given quality (1–100).
///
/// Alpha is dropped first; the JPEG encoder rejects RGBA input.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode_image(&rgb)?;
    debug!(
        "Encoded {}x{} frame → {} bytes JPEG",
        rgb.width(),
        rgb.height(),
        buf.len()
    );
    Ok(buf)
}

/// Wrap JPEG bytes for a multimodal request.
pub fn jpeg_image_data(jpeg: &[u8]) -> ImageData {
    ImageData::new(STANDARD.encode(jpeg), "image/jpeg")
}
