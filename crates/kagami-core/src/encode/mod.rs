//! Image encoding for Kagami.
//!
//! This module provides functionality for:
//! - Encoding to JPEG with a quality setting (RGB only, no alpha)
//! - Encoding to PNG (lossless, quality does not apply)
//! - Encoding to lossy WebP with a quality setting (alpha preserved)
//!
//! [`encode_raster`] is the single entry point the conversion pipeline uses;
//! it takes an RGBA raster and picks the codec for an [`OutputFormat`].

mod format;
mod jpeg;
mod png;
mod webp;

use thiserror::Error;

use crate::decode::DecodedImage;

pub use self::format::OutputFormat;
pub use self::jpeg::encode_jpeg;
pub use self::png::encode_png;
pub use self::webp::encode_webp;

/// Errors that can occur during encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes, got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// The codec rejected the raster or its parameters
    #[error("{format} encoding failed: {message}")]
    EncodingFailed {
        format: OutputFormat,
        message: String,
    },
}

/// Encode an RGBA raster to `format`.
///
/// `quality` (1-100) is converted to a lossy factor for JPEG and WebP and not
/// passed to the PNG encoder at all. For JPEG the alpha channel is discarded,
/// so the raster must already be opaque.
pub fn encode_raster(
    image: &DecodedImage,
    format: OutputFormat,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    match (format, format.quality_factor(quality)) {
        (OutputFormat::Jpeg, Some(factor)) => {
            let rgb = strip_alpha(&image.pixels);
            encode_jpeg(&rgb, image.width, image.height, percent(factor))
        }
        (OutputFormat::Webp, Some(factor)) => {
            encode_webp(&image.pixels, image.width, image.height, factor)
        }
        _ => encode_png(&image.pixels, image.width, image.height),
    }
}

fn percent(factor: f32) -> u8 {
    (factor * 100.0).round().clamp(1.0, 100.0) as u8
}

fn strip_alpha(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
    }
    rgb
}

/// Validate dimensions and buffer length for `channels` bytes per pixel.
pub(crate) fn check_buffer(
    pixels: &[u8],
    width: u32,
    height: u32,
    channels: usize,
) -> Result<(), EncodeError> {
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    let expected = (width as usize) * (height as usize) * channels;
    if pixels.len() != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: pixels.len(),
        });
    }
    Ok(())
}
