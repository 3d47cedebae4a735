//! Source image decoding with EXIF orientation handling.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageError, ImageReader};

use super::{DecodeError, DecodedImage, Orientation};

/// Decode any supported source image (JPEG, PNG, WebP, GIF, BMP) into RGBA.
///
/// The container format is sniffed from the bytes; the MIME type the browser
/// declared for the file is not consulted. EXIF orientation is applied so the
/// raster matches what the user sees in a thumbnail. Animated GIFs yield
/// their first frame.
///
/// # Errors
///
/// * `DecodeError::InvalidFormat` if the bytes are not a recognised raster format
/// * `DecodeError::TooLarge` if the decoder's allocation limits are exceeded
/// * `DecodeError::CorruptedFile` for truncated or malformed data
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    let img = sniff(bytes)?.decode().map_err(map_image_error)?;
    let upright = apply_orientation(img, get_orientation(bytes));
    Ok(DecodedImage::from_rgba_image(upright.into_rgba8()))
}

/// Displayed `(width, height)` of a source, read from its header only.
pub fn probe_dimensions(bytes: &[u8]) -> Result<(u32, u32), DecodeError> {
    let (width, height) = sniff(bytes)?
        .into_dimensions()
        .map_err(map_image_error)?;
    Ok(if get_orientation(bytes).swaps_dimensions() {
        (height, width)
    } else {
        (width, height)
    })
}

/// A reader for `bytes` whose container format was recognised.
fn sniff(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, DecodeError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;
    match reader.format() {
        Some(_) => Ok(reader),
        None => Err(DecodeError::InvalidFormat),
    }
}

fn map_image_error(err: ImageError) -> DecodeError {
    match err {
        ImageError::Unsupported(_) => DecodeError::InvalidFormat,
        ImageError::Limits(e) => DecodeError::TooLarge(e.to_string()),
        other => DecodeError::CorruptedFile(other.to_string()),
    }
}

/// EXIF orientation of a JPEG/PNG/WebP container, `Normal` when absent.
pub fn get_orientation(bytes: &[u8]) -> Orientation {
    Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()
        .and_then(|exif| {
            exif.get_field(Tag::Orientation, In::PRIMARY)?
                .value
                .get_uint(0)
        })
        .map(Orientation::from)
        .unwrap_or_default()
}

fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => img,
        Orientation::FlipHorizontal => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipVertical => img.flipv(),
        Orientation::Transpose => img.rotate90().fliph(),
        Orientation::Rotate90CW => img.rotate90(),
        Orientation::Transverse => img.rotate270().fliph(),
        Orientation::Rotate270CW => img.rotate270(),
    }
}
