//! WASM-compatible wrapper types.
//!
//! This module holds the JavaScript-facing result types and the helpers that
//! turn JS values into core types.

use kagami_core::{ConversionOptions, OutputFormat};
use wasm_bindgen::prelude::*;

/// A converted image handed back to JavaScript.
#[wasm_bindgen]
pub struct JsConvertedImage {
    width: u32,
    height: u32,
    format: OutputFormat,
    bytes: Vec<u8>,
}

impl JsConvertedImage {
    pub(crate) fn new(width: u32, height: u32, format: OutputFormat, bytes: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format,
            bytes,
        }
    }
}

#[wasm_bindgen]
impl JsConvertedImage {
    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// MIME type of the encoded bytes, e.g. `image/webp`.
    #[wasm_bindgen(getter)]
    pub fn mime_type(&self) -> String {
        self.format.mime_type().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn byte_length(&self) -> usize {
        self.bytes.len()
    }

    /// Returns the encoded file as a Uint8Array.
    ///
    /// Note: This creates a copy in JavaScript memory.
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// Explicitly free WASM memory.
    ///
    /// This is optional - wasm-bindgen's finalizer will handle cleanup automatically.
    pub fn free(self) {}
}

/// A named file ready for download (single job or archive).
#[wasm_bindgen]
pub struct JsOutputFile {
    filename: String,
    mime_type: String,
    bytes: Vec<u8>,
}

impl JsOutputFile {
    pub(crate) fn new(filename: String, mime_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            filename,
            mime_type: mime_type.to_string(),
            bytes,
        }
    }
}

#[wasm_bindgen]
impl JsOutputFile {
    #[wasm_bindgen(getter)]
    pub fn filename(&self) -> String {
        self.filename.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn mime_type(&self) -> String {
        self.mime_type.clone()
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    pub fn free(self) {}
}

/// Read `{ format, quality, resize, filter }` from JS.
///
/// `undefined` and `null` mean the defaults; missing fields fall back
/// individually.
pub(crate) fn options_from_js(value: JsValue) -> Result<ConversionOptions, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(ConversionOptions::default());
    }
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("Invalid conversion options: {}", e)))
}

/// Parse a format name such as `"jpeg"` or `"webp"`.
pub(crate) fn parse_format(name: &str) -> Result<OutputFormat, String> {
    OutputFormat::from_name(name).ok_or_else(|| format!("Unsupported output format: {name}"))
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_options_default_on_null() {
        let opts = options_from_js(JsValue::NULL).unwrap();
        assert_eq!(opts, ConversionOptions::default());
    }

    #[wasm_bindgen_test]
    fn test_options_from_object() {
        let value = js_sys::JSON::parse(
            r#"{"format":"jpeg","quality":60,"resize":{"width":400,"maintainAspectRatio":true}}"#,
        )
        .unwrap();
        let opts = options_from_js(value).unwrap();
        assert_eq!(opts.format, OutputFormat::Jpeg);
        assert_eq!(opts.quality, 60);
        assert_eq!(opts.target_dimensions(800, 600), (400, 300));
    }

    #[wasm_bindgen_test]
    fn test_options_rejects_bad_format() {
        let value = js_sys::JSON::parse(r#"{"format":"tiff"}"#).unwrap();
        assert!(options_from_js(value).is_err());
    }
}
