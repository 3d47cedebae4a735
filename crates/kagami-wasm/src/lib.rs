//! Kagami WASM - WebAssembly bindings for Kagami
//!
//! This crate exposes the kagami-core conversion pipeline and batch queue to
//! JavaScript/TypeScript applications.
//!
//! # Module Structure
//!
//! - `types` - WASM-compatible result types and option parsing
//! - `convert` - One-shot conversion and naming helpers
//! - `worker` - Entry point for the Web Worker that runs conversions
//! - `queue` - The page-side batch queue
//!
//! # Usage
//!
//! ```typescript
//! import init, { convert_image } from '@kagami/wasm';
//!
//! // Initialize WASM module (must call first)
//! await init();
//!
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const out = convert_image(bytes, { format: 'webp', quality: 80 });
//! console.log(`Converted to ${out.width}x${out.height}, ${out.byte_length} bytes`);
//! ```

use wasm_bindgen::prelude::*;

mod convert;
mod queue;
mod types;
mod worker;

// Re-export public types
pub use convert::{
    accepted_extensions, convert_image, format_file_size, is_accepted_mime_type, output_filename,
    resolve_dimensions,
};
pub use queue::JsConversionQueue;
pub use types::{JsConvertedImage, JsOutputFile};
pub use worker::run_worker_job;

/// Initialize the WASM module (called automatically on load)
///
/// Routes panics and `tracing` output to the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(version(), env!("CARGO_PKG_VERSION"));
    }
}
