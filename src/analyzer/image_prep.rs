//! Shrink wallpapers before upload to keep the token count down

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use tracing::debug;

use crate::errors::AnalysisError;

const JPEG_QUALITY: u8 = 85;

/// Image bytes ready to embed in a data URI
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

impl PreparedImage {
    pub fn data_uri(&self) -> String {
        use base64::Engine;
        format!(
            "data:{};base64,{}",
            self.mime_type,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Downscale to at most `max_height` pixels tall, keeping the aspect
/// ratio, and re-encode as JPEG. Images that already fit are passed
/// through untouched.
pub fn prepare(bytes: &[u8], max_height: u32) -> Result<PreparedImage, AnalysisError> {
    let format = image::guess_format(bytes)?;
    let img = image::load_from_memory_with_format(bytes, format)?;
    let (width, height) = img.dimensions();

    if height <= max_height {
        return Ok(PreparedImage {
            bytes: bytes.to_vec(),
            mime_type: mime_type(format),
        });
    }

    let new_width = ((u64::from(width) * u64::from(max_height)) / u64::from(height)).max(1) as u32;
    let resized = img.resize_exact(new_width, max_height, FilterType::Triangle);

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    DynamicImage::ImageRgb8(resized.to_rgb8()).write_with_encoder(encoder)?;

    debug!(
        "Resized {}x{} -> {}x{} ({} -> {} bytes)",
        width,
        height,
        new_width,
        max_height,
        bytes.len(),
        out.len()
    );

    Ok(PreparedImage {
        bytes: out,
        mime_type: "image/jpeg",
    })
}

fn mime_type(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        _ => "image/jpeg",
    }
}
