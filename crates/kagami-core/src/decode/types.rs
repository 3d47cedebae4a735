//! Core types for image decoding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for image decoding operations.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The bytes are not in a format we can decode (svg, tiff, garbage...).
    #[error("Invalid or unsupported image format")]
    InvalidFormat,

    /// The image file is corrupted or incomplete.
    #[error("Corrupted or incomplete image file: {0}")]
    CorruptedFile(String),

    /// The decoder refused to allocate the raster.
    #[error("Image too large to decode: {0}")]
    TooLarge(String),
}

/// Filter type for resampling operations.
///
/// Every variant is at least bilinear; nearest-neighbour is deliberately not
/// offered for conversion output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterType {
    /// Bilinear interpolation (fast, acceptable quality).
    Bilinear,
    /// Catmull-Rom cubic interpolation (sharper than bilinear).
    CatmullRom,
    /// Lanczos3 interpolation (slower, highest quality).
    #[default]
    Lanczos3,
}

impl FilterType {
    /// Convert to the image crate's FilterType.
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            FilterType::Bilinear => image::imageops::FilterType::Triangle,
            FilterType::CatmullRom => image::imageops::FilterType::CatmullRom,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// How a camera says the stored pixels must be turned to display upright.
///
/// Discriminants are the EXIF `Orientation` tag values; anything outside
/// 1..=8 reads as [`Orientation::Normal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Orientation {
    #[default]
    Normal = 1,
    FlipHorizontal = 2,
    Rotate180 = 3,
    FlipVertical = 4,
    /// Mirrored, then a quarter turn counter-clockwise.
    Transpose = 5,
    Rotate90CW = 6,
    /// Mirrored, then a quarter turn clockwise.
    Transverse = 7,
    Rotate270CW = 8,
}

impl Orientation {
    /// Quarter turns display the image with width and height exchanged.
    pub fn swaps_dimensions(self) -> bool {
        (self as u8) >= 5
    }
}

impl From<u32> for Orientation {
    fn from(tag: u32) -> Self {
        use Orientation::*;
        [
            Normal,
            FlipHorizontal,
            Rotate180,
            FlipVertical,
            Transpose,
            Rotate90CW,
            Transverse,
            Rotate270CW,
        ]
        .into_iter()
        .find(|o| u32::from(*o as u8) == tag)
        .unwrap_or_default()
    }
}

/// An RGBA raster, 4 bytes per pixel, straight alpha, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize * 4);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn from_rgba_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self::new(width, height, img.into_raw())
    }

    /// Borrowed view for `image::imageops`; `None` if the buffer is short.
    pub fn as_rgba_image(&self) -> Option<image::ImageBuffer<image::Rgba<u8>, &[u8]>> {
        image::ImageBuffer::from_raw(self.width, self.height, self.pixels.as_slice())
    }

    /// Whether any pixel is not fully opaque.
    pub fn has_transparency(&self) -> bool {
        self.pixels.chunks_exact(4).any(|px| px[3] != u8::MAX)
    }
}
