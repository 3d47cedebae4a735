//! Image decoding for Kagami.
//!
//! This module provides functionality for:
//! - Decoding JPEG, PNG, WebP, GIF and BMP sources into RGBA rasters
//! - Applying EXIF orientation so output matches the source preview
//! - Resampling rasters to a resolved output size
//!
//! # Architecture
//!
//! Decoding runs inside the conversion worker (a Web Worker in the browser,
//! an OS thread natively). All operations are synchronous and single-threaded.
//!
//! # Examples
//!
//! ```ignore
//! use kagami_core::decode::{decode_image, resample, FilterType};
//!
//! let bytes = std::fs::read("photo.png").unwrap();
//! let image = decode_image(&bytes).unwrap();
//! let half = resample(&image, image.width / 2, image.height / 2, FilterType::Lanczos3).unwrap();
//! ```

mod resize;
mod source;
mod types;

pub use resize::resample;
pub use source::{decode_image, get_orientation, probe_dimensions};
pub use types::{DecodeError, DecodedImage, FilterType, Orientation};
