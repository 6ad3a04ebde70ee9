//! Bounded image capture for inference payloads.
//!
//! Uploaded images are downscaled to a maximum edge length before being
//! shipped to the inference service, which keeps request sizes and API
//! costs bounded without visibly affecting the analysis.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, ImageFormat};
use tracing::info;

use crate::error::AiError;
use crate::gateway::types::InlineData;

/// Maximum dimension (width or height) for captured images.
pub const MAX_CAPTURE_DIMENSION: u32 = 512;

/// Convert raw image bytes into a base64 PNG data URL, downscaling so the
/// longest edge is at most `max_dimension` pixels.
///
/// # Errors
/// Fails with a descriptive message when the bytes cannot be decoded as an
/// image; the orchestrator surfaces that message as the run error.
pub fn image_to_data_url(image_bytes: &[u8], max_dimension: u32) -> Result<String, AiError> {
    let img = image::load_from_memory(image_bytes).map_err(|e| {
        AiError::Image(format!(
            "Unable to read the uploaded image for AI analysis: {}",
            e
        ))
    })?;

    let resized = resize_if_needed(img, max_dimension);
    info!(
        "Captured image for analysis: {}x{}",
        resized.width(),
        resized.height()
    );

    let mut buffer = Cursor::new(Vec::new());
    resized
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| AiError::Image(format!("Failed to encode captured image: {}", e)))?;

    let encoded = STANDARD.encode(buffer.into_inner());
    Ok(format!("data:image/png;base64,{}", encoded))
}

/// Split a data URL into the inline payload shipped on the wire.
///
/// Never fails: a malformed header falls back to `image/png` and an
/// empty payload, matching how the service treats unknown input.
pub fn data_url_to_inline(data_url: &str) -> InlineData {
    let (header, payload) = data_url.split_once(',').unwrap_or((data_url, ""));

    let mime_type = header
        .strip_prefix("data:")
        .and_then(|h| h.split(';').next())
        .filter(|m| !m.is_empty())
        .unwrap_or("image/png")
        .to_string();

    InlineData {
        mime_type,
        data: payload.to_string(),
    }
}

fn resize_if_needed(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    if width <= max_dimension && height <= max_dimension {
        return img;
    }

    let scale = max_dimension as f32 / width.max(height) as f32;
    let new_width = (width as f32 * scale).max(1.0) as u32;
    let new_height = (height as f32 * scale).max(1.0) as u32;
    img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
}
