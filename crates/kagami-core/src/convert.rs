//! The conversion pipeline: decode, resample, composite, encode.
//!
//! One call converts one source image. The steps run synchronously and report
//! coarse progress milestones through a callback so a worker can forward them.
//!
//! # Compositing
//!
//! The output surface is allocated before drawing. For JPEG, which has no
//! alpha channel, the surface starts opaque white and the resampled source is
//! blended over it, so transparent regions come out white rather than black.
//! For PNG and WebP the surface starts fully transparent and the source is
//! copied as-is.

use thiserror::Error;
use tracing::debug;

use crate::decode::{decode_image, resample, DecodeError, DecodedImage};
use crate::encode::{encode_raster, EncodeError, OutputFormat};
use crate::options::ConversionOptions;

/// Largest output surface we agree to allocate (16384 x 16384).
pub const MAX_OUTPUT_PIXELS: u64 = 16_384 * 16_384;

/// Progress milestones reported by [`convert_with_progress`].
pub mod milestone {
    pub const DECODE_STARTED: u8 = 10;
    pub const DECODED: u8 = 30;
    pub const SURFACE_READY: u8 = 50;
    pub const RESAMPLED: u8 = 70;
    pub const ENCODED: u8 = 90;
}

/// Errors from a single conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The source could not be decoded.
    #[error("Failed to decode image: {0}")]
    Decode(#[from] DecodeError),

    /// No drawing surface could be obtained for the output size.
    #[error("Failed to prepare output surface: {0}")]
    Render(String),

    /// The encoder rejected the raster or its parameters.
    #[error("Failed to encode image: {0}")]
    Encode(#[from] EncodeError),
}

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
}

/// Convert `source` according to `options`.
pub fn convert(source: &[u8], options: &ConversionOptions) -> Result<ConvertedImage, ConvertError> {
    convert_with_progress(source, options, |_| {})
}

/// Convert `source`, calling `on_progress` with each [`milestone`] reached.
///
/// Milestones are strictly increasing. The final 100% is left to the caller,
/// which knows when the result has actually been delivered.
pub fn convert_with_progress<F>(
    source: &[u8],
    options: &ConversionOptions,
    mut on_progress: F,
) -> Result<ConvertedImage, ConvertError>
where
    F: FnMut(u8),
{
    on_progress(milestone::DECODE_STARTED);
    let decoded = decode_image(source)?;
    on_progress(milestone::DECODED);

    let (width, height) = options.target_dimensions(decoded.width, decoded.height);
    debug!(
        src_width = decoded.width,
        src_height = decoded.height,
        width,
        height,
        format = %options.format,
        "resolved output size"
    );

    let mut surface = Surface::allocate(width, height, options.format)?;
    on_progress(milestone::SURFACE_READY);

    let resampled = resample(&decoded, width, height, options.filter)
        .map_err(|e| ConvertError::Render(e.to_string()))?;
    drop(decoded);
    surface.draw(&resampled);
    drop(resampled);
    on_progress(milestone::RESAMPLED);

    let raster = surface.into_image();
    let bytes = encode_raster(&raster, options.format, options.quality)?;
    on_progress(milestone::ENCODED);

    Ok(ConvertedImage {
        bytes,
        width,
        height,
        format: options.format,
    })
}

/// An RGBA drawing target with a format-dependent background.
struct Surface {
    image: DecodedImage,
    opaque: bool,
}

impl Surface {
    fn allocate(width: u32, height: u32, format: OutputFormat) -> Result<Self, ConvertError> {
        let pixels = u64::from(width) * u64::from(height);
        if width == 0 || height == 0 || pixels > MAX_OUTPUT_PIXELS {
            return Err(ConvertError::Render(format!(
                "{width}x{height} exceeds the {MAX_OUTPUT_PIXELS} pixel surface limit"
            )));
        }

        let len = usize::try_from(pixels * 4)
            .map_err(|_| ConvertError::Render(format!("{width}x{height} is too large")))?;
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(len)
            .map_err(|e| ConvertError::Render(e.to_string()))?;

        let opaque = !format.has_alpha();
        let fill = if opaque { 255 } else { 0 };
        buffer.resize(len, fill);

        Ok(Self {
            image: DecodedImage::new(width, height, buffer),
            opaque,
        })
    }

    /// Draw `source` (already at the surface size) with source-over blending.
    fn draw(&mut self, source: &DecodedImage) {
        debug_assert_eq!(source.pixels.len(), self.image.pixels.len());

        // Source-over onto fully transparent pixels, or of an opaque source,
        // is the source itself
        if !self.opaque || !source.has_transparency() {
            self.image.pixels.copy_from_slice(&source.pixels);
            return;
        }

        for (dst, src) in self
            .image
            .pixels
            .chunks_exact_mut(4)
            .zip(source.pixels.chunks_exact(4))
        {
            let alpha = u32::from(src[3]);
            if alpha == 255 {
                dst[..3].copy_from_slice(&src[..3]);
            } else if alpha > 0 {
                let inv = 255 - alpha;
                for c in 0..3 {
                    let blended = u32::from(src[c]) * alpha + u32::from(dst[c]) * inv;
                    dst[c] = ((blended + 127) / 255) as u8;
                }
            }
            dst[3] = 255;
        }
    }

    fn into_image(self) -> DecodedImage {
        self.image
    }
}
