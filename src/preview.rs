//! Test-image preview — pure transform from file bytes to a data URL.
//!
//! Validates that the chosen file really is an image before any network
//! call, then hands the webview a `data:` URL it can drop straight into an
//! `<img>` tag. The original bytes are kept verbatim; nothing is
//! re-encoded.

use base64::Engine;
use image::ImageFormat;

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("Not a recognized image format")]
    UnrecognizedFormat,

    #[error("Image failed to decode: {0}")]
    DecodeFailed(String),
}

/// Build a `data:{mime};base64,...` preview for image bytes.
pub fn image_preview_data_url(bytes: &[u8]) -> Result<String, PreviewError> {
    let format = image::guess_format(bytes).map_err(|_| PreviewError::UnrecognizedFormat)?;

    // Cheap full-decode check so a truncated file fails here, not in the
    // webview with a broken image icon.
    image::load_from_memory_with_format(bytes, format)
        .map_err(|e| PreviewError::DecodeFailed(e.to_string()))?;

    let mime = mime_for(format);
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{};base64,{}", mime, encoded))
}

fn mime_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        _ => "application/octet-stream",
    }
}
