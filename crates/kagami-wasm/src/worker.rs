//! Web Worker side of the conversion protocol.
//!
//! A worker script receives `{ id, ticket, bytes, options }` from the page and
//! calls [`run_worker_job`], passing a callback that forwards each event with
//! `postMessage`. Events are plain objects echoing the request's `ticket`:
//!
//! - `{ type: "progress", id, ticket, percent }`
//! - `{ type: "complete", id, ticket, output, width, height }` (`output` is a `Uint8Array`)
//! - `{ type: "error", id, ticket, message }`
//!
//! # Example
//!
//! ```typescript
//! import init, { run_worker_job } from '@kagami/wasm';
//!
//! self.onmessage = async ({ data }) => {
//!   await init();
//!   run_worker_job(data.id, data.ticket, data.bytes, data.options, (event) => {
//!     const transfer = event.type === 'complete' ? [event.output.buffer] : [];
//!     self.postMessage(event, transfer);
//!   });
//! };
//! ```

use std::sync::Arc;

use js_sys::{Function, Object, Reflect, Uint8Array};
use kagami_core::{handle_request, JobId, WorkerEvent, WorkerRequest};
use wasm_bindgen::prelude::*;

use crate::types::options_from_js;

/// Run one conversion and report it through `on_event`.
///
/// Exactly one terminal event (`complete` or `error`) is delivered, after any
/// number of `progress` events.
///
/// # Errors
///
/// Returns an error only if `options` cannot be read or `on_event` throws;
/// conversion failures are reported as `error` events instead.
#[wasm_bindgen]
pub fn run_worker_job(
    id: String,
    ticket: u32,
    bytes: Vec<u8>,
    options: JsValue,
    on_event: &Function,
) -> Result<(), JsValue> {
    let options = options_from_js(options)?;
    let request = WorkerRequest::Convert {
        id: JobId::from(id),
        ticket,
        source: Arc::from(bytes),
        options,
    };

    let mut callback_error = None;
    handle_request(request, |event| {
        if callback_error.is_some() {
            return;
        }
        let result = event_to_js(&event).and_then(|obj| on_event.call1(&JsValue::NULL, &obj));
        if let Err(e) = result {
            callback_error = Some(e);
        }
    });

    match callback_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn event_to_js(event: &WorkerEvent) -> Result<JsValue, JsValue> {
    let obj = Object::new();
    let set = |key: &str, value: JsValue| Reflect::set(&obj, &JsValue::from_str(key), &value);

    set("id", JsValue::from_str(event.id().as_str()))?;
    set("ticket", JsValue::from(event.ticket()))?;
    match event {
        WorkerEvent::Progress { percent, .. } => {
            set("type", JsValue::from_str("progress"))?;
            set("percent", JsValue::from(*percent))?;
        }
        WorkerEvent::Complete {
            output,
            width,
            height,
            ..
        } => {
            set("type", JsValue::from_str("complete"))?;
            set("output", Uint8Array::from(output.as_slice()).into())?;
            set("width", JsValue::from(*width))?;
            set("height", JsValue::from(*height))?;
        }
        WorkerEvent::Failed { message, .. } => {
            set("type", JsValue::from_str("error"))?;
            set("message", JsValue::from_str(message))?;
        }
    }
    Ok(obj.into())
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(5, 5, image::Rgba([1, 2, 3, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn collect(bytes: Vec<u8>) -> Vec<String> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let closure = Closure::<dyn FnMut(JsValue)>::new(move |event: JsValue| {
            let kind = Reflect::get(&event, &JsValue::from_str("type"))
                .unwrap()
                .as_string()
                .unwrap();
            let ticket = Reflect::get(&event, &JsValue::from_str("ticket")).unwrap();
            assert_eq!(ticket.as_f64(), Some(4.0));
            sink.borrow_mut().push(kind);
        });
        let callback: &Function = closure.as_ref().unchecked_ref();
        run_worker_job("job-1".to_string(), 4, bytes, JsValue::NULL, callback).unwrap();
        let result = seen.borrow().clone();
        result
    }

    #[wasm_bindgen_test]
    fn test_success_events() {
        let kinds = collect(png_bytes());
        assert_eq!(kinds.last().map(String::as_str), Some("complete"));
        assert!(kinds[..kinds.len() - 1].iter().all(|k| k == "progress"));
    }

    #[wasm_bindgen_test]
    fn test_failure_event() {
        let kinds = collect(b"garbage".to_vec());
        assert_eq!(kinds.last().map(String::as_str), Some("error"));
    }

    #[wasm_bindgen_test]
    fn test_event_to_js_failed() {
        let obj = event_to_js(&WorkerEvent::Failed {
            id: JobId::from("x"),
            ticket: 2,
            message: "bad".to_string(),
        })
        .unwrap();
        let message = Reflect::get(&obj, &JsValue::from_str("message")).unwrap();
        assert_eq!(message.as_string().as_deref(), Some("bad"));
    }
}
