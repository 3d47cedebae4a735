//! PNG encoding (lossless, no quality parameter).

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use super::{check_buffer, EncodeError, OutputFormat};

/// Encode RGBA pixel data to PNG bytes.
///
/// Uses the encoder's default compression and filter settings so identical
/// rasters always produce identical files.
pub fn encode_png(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, EncodeError> {
    check_buffer(pixels, width, height, 4)?;

    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(pixels, width, height, ExtendedColorType::Rgba8)
        .map_err(|e| EncodeError::EncodingFailed {
            format: OutputFormat::Png,
            message: e.to_string(),
        })?;

    Ok(buffer)
}
