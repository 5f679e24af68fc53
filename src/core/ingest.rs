// Image ingestion - turns paths, uploaded bytes and base64 strings into RGB buffers

use crate::models::pose::{ExtractResult, ImageInfo, PoseError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{Pixel, Rgb, RgbImage};
use std::path::Path;

/// A decoded image in the channel order the landmark model expects (RGB)
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub pixels: RgbImage,
    pub info: ImageInfo,
}

impl DecodedImage {
    fn new(pixels: RgbImage) -> Self {
        let info = ImageInfo {
            width: pixels.width(),
            height: pixels.height(),
            channels: Rgb::<u8>::CHANNEL_COUNT,
        };
        Self { pixels, info }
    }
}

/// Decode an image file from disk
pub fn decode_path(path: &Path) -> ExtractResult<DecodedImage> {
    let bytes = std::fs::read(path).map_err(|e| {
        PoseError::Decode(format!("Could not read image from {}: {}", path.display(), e))
    })?;
    decode_bytes(&bytes)
}

/// Decode an encoded raster image (JPEG, PNG, ...) held in memory
pub fn decode_bytes(bytes: &[u8]) -> ExtractResult<DecodedImage> {
    if bytes.is_empty() {
        return Err(PoseError::Decode("no image data".to_string()));
    }

    let image = image::load_from_memory(bytes).map_err(|e| PoseError::Decode(e.to_string()))?;
    Ok(DecodedImage::new(image.to_rgb8()))
}

/// Decode a base64 image, optionally prefixed with a data-URL header
/// (`data:image/png;base64,...`). Line breaks and other ASCII whitespace
/// inside the payload are ignored.
pub fn decode_base64(encoded: &str) -> ExtractResult<DecodedImage> {
    let payload: String = strip_data_url(encoded).split_ascii_whitespace().collect();
    if payload.is_empty() {
        return Err(PoseError::Decode("no image data in base64 input".to_string()));
    }

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| PoseError::Decode(format!("invalid base64 image: {}", e)))?;
    decode_bytes(&bytes)
}

/// Everything after the first comma, or the whole string when there is none
pub fn strip_data_url(encoded: &str) -> &str {
    match encoded.split_once(',') {
        Some((_, payload)) => payload,
        None => encoded,
    }
}
