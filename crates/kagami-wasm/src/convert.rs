//! One-shot conversion bindings.
//!
//! # Example
//!
//! ```typescript
//! import { convert_image, output_filename } from '@kagami/wasm';
//!
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const out = convert_image(bytes, { format: 'jpeg', quality: 85 });
//! const blob = new Blob([out.bytes()], { type: out.mime_type });
//! save(blob, output_filename(file.name, 'jpeg'));
//! ```

use crate::types::{options_from_js, parse_format, JsConvertedImage};
use kagami_core::{archive, dimensions, present};
use wasm_bindgen::prelude::*;

/// Convert one image synchronously on the calling thread.
///
/// # Arguments
///
/// * `bytes` - Encoded source image (JPEG, PNG, WebP, GIF or BMP)
/// * `options` - `{ format, quality, resize, filter }`; `null` for defaults
///
/// # Errors
///
/// Returns the pipeline's error message if the source cannot be decoded,
/// the output surface cannot be allocated, or encoding fails.
#[wasm_bindgen]
pub fn convert_image(bytes: &[u8], options: JsValue) -> Result<JsConvertedImage, JsValue> {
    let options = options_from_js(options)?;
    let out = kagami_core::convert(bytes, &options).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(JsConvertedImage::new(out.width, out.height, out.format, out.bytes))
}

/// Output size for a source of `original_width` x `original_height`.
///
/// Returns `[width, height]`. Zero or missing targets count as absent.
#[wasm_bindgen]
pub fn resolve_dimensions(
    original_width: u32,
    original_height: u32,
    target_width: Option<u32>,
    target_height: Option<u32>,
    maintain_aspect_ratio: bool,
) -> Vec<u32> {
    let (width, height) = dimensions::resolve_dimensions(
        original_width,
        original_height,
        target_width,
        target_height,
        maintain_aspect_ratio,
    );
    vec![width, height]
}

/// Download name for `original` converted to `format`.
///
/// # Errors
///
/// Returns an error if `format` is not `jpeg`, `png` or `webp`.
#[wasm_bindgen]
pub fn output_filename(original: &str, format: &str) -> Result<String, JsValue> {
    let format = parse_format(format).map_err(|e| JsValue::from_str(&e))?;
    Ok(archive::output_filename(original, format))
}

/// Whether a file with this MIME type should be admitted.
#[wasm_bindgen]
pub fn is_accepted_mime_type(mime_type: &str) -> bool {
    present::is_accepted_mime_type(mime_type)
}

/// `accept` attribute value for a file input.
#[wasm_bindgen]
pub fn accepted_extensions() -> String {
    present::ACCEPTED_EXTENSIONS.to_string()
}

/// Human-readable size such as `1.5 KB`.
#[wasm_bindgen]
pub fn format_file_size(bytes: f64) -> String {
    present::format_file_size(bytes.max(0.0) as usize)
}
