//! Page side of the batch queue.
//!
//! [`JsConversionQueue`] owns the job records. It hands each request to a JS
//! `post` callback (usually wrapping `worker.postMessage`) as a message
//! `{ id, ticket, bytes, options }`. The page feeds the worker's events back
//! through `handle_progress`, `handle_complete` and `handle_failed`, passing
//! the `ticket` each event carries. Events whose ticket is not the current
//! dispatch's are ignored.
//!
//! # Example
//!
//! ```typescript
//! const worker = new Worker(new URL('./convert.worker.ts', import.meta.url));
//! const queue = new JsConversionQueue((message) =>
//!   worker.postMessage(message, [message.bytes.buffer]));
//!
//! worker.onmessage = ({ data }) => {
//!   switch (data.type) {
//!     case 'progress': queue.handle_progress(data.id, data.ticket, data.percent); break;
//!     case 'complete': queue.handle_complete(data.id, data.ticket, data.output, data.width, data.height); break;
//!     case 'error': queue.handle_failed(data.id, data.ticket, data.message); break;
//!   }
//!   render(queue.snapshots());
//! };
//!
//! for (const file of files) {
//!   queue.add_file(file.name, file.type, new Uint8Array(await file.arrayBuffer()));
//! }
//! queue.convert_all();
//! ```

use js_sys::{Function, Object, Reflect, Uint8Array};
use kagami_core::{
    ConversionQueue, Dispatch, DispatchError, JobId, WorkerEvent, WorkerRequest,
};
use tracing::debug;
use wasm_bindgen::prelude::*;

use crate::types::{options_from_js, JsOutputFile};

/// Posts requests to a Web Worker through a JS callback
/// `(message: { id, ticket, bytes, options }) => void`.
struct JsDispatcher {
    post: Function,
}

fn rejected(e: JsValue) -> DispatchError {
    DispatchError::Rejected(format!("{:?}", e))
}

impl Dispatch for JsDispatcher {
    fn dispatch(&mut self, request: WorkerRequest) -> Result<(), DispatchError> {
        let WorkerRequest::Convert {
            id,
            ticket,
            source,
            options,
        } = request;
        let options = serde_wasm_bindgen::to_value(&options)
            .map_err(|e| DispatchError::Rejected(e.to_string()))?;
        debug!(%id, ticket, bytes = source.len(), "posting request to worker");

        let message = Object::new();
        let fields = [
            ("id", JsValue::from_str(id.as_str())),
            ("ticket", JsValue::from(ticket)),
            ("bytes", Uint8Array::from(source.as_ref()).into()),
            ("options", options),
        ];
        for (key, value) in fields {
            Reflect::set(&message, &JsValue::from_str(key), &value).map_err(rejected)?;
        }

        self.post
            .call1(&JsValue::NULL, &message)
            .map(|_| ())
            .map_err(rejected)
    }
}

/// The batch conversion queue for the page.
#[wasm_bindgen]
pub struct JsConversionQueue {
    inner: ConversionQueue<JsDispatcher>,
}

#[wasm_bindgen]
impl JsConversionQueue {
    /// Create a queue that posts requests through `post`.
    #[wasm_bindgen(constructor)]
    pub fn new(post: Function) -> JsConversionQueue {
        JsConversionQueue {
            inner: ConversionQueue::new(JsDispatcher { post }),
        }
    }

    /// Admit a file and return its job id.
    pub fn add_file(&mut self, name: String, mime_type: String, bytes: Vec<u8>) -> String {
        self.inner.add_file(name, mime_type, bytes).to_string()
    }

    /// Queue every Pending job.
    pub fn convert_all(&mut self) {
        self.inner.convert_all();
    }

    /// Queue the given Pending jobs in order.
    pub fn enqueue(&mut self, ids: Vec<String>) {
        let ids: Vec<JobId> = ids.into_iter().map(JobId::from).collect();
        self.inner.enqueue_all(&ids);
    }

    pub fn handle_progress(&mut self, id: String, ticket: u32, percent: u8) {
        self.inner.handle_event(WorkerEvent::Progress {
            id: JobId::from(id),
            ticket,
            percent,
        });
    }

    pub fn handle_complete(
        &mut self,
        id: String,
        ticket: u32,
        output: Vec<u8>,
        width: u32,
        height: u32,
    ) {
        self.inner.handle_event(WorkerEvent::Complete {
            id: JobId::from(id),
            ticket,
            output,
            width,
            height,
        });
    }

    /// Report a failed job. Also used to give up on a job that timed out.
    pub fn handle_failed(&mut self, id: String, ticket: u32, message: String) {
        self.inner.handle_event(WorkerEvent::Failed {
            id: JobId::from(id),
            ticket,
            message,
        });
    }

    /// Ticket of the job being converted, for timeouts raised by the page.
    #[wasm_bindgen(getter)]
    pub fn in_flight_ticket(&self) -> Option<u32> {
        self.inner.in_flight_ticket()
    }

    /// Remove a job. Returns false if it was not tracked.
    pub fn remove(&mut self, id: String) -> bool {
        self.inner.remove(&JobId::from(id)).is_some()
    }

    /// Convert a finished or failed job again.
    ///
    /// # Errors
    ///
    /// Returns an error if the job is unknown or currently converting.
    pub fn retry(&mut self, id: String) -> Result<(), JsValue> {
        self.inner
            .retry(&JobId::from(id))
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Replace the options used for jobs dispatched from now on.
    ///
    /// # Errors
    ///
    /// Returns an error if the options are malformed or out of range.
    pub fn set_options(&mut self, options: JsValue) -> Result<(), JsValue> {
        let options = options_from_js(options)?;
        options
            .validate()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.inner.set_options(options);
        Ok(())
    }

    pub fn options(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.inner.options())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Array of `{ id, name, status, progress, sourceSize, outputSize, errorMessage, sizeChangePercent }`.
    pub fn snapshots(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.snapshots())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// `{ total, pending, processing, completed, failed }`.
    pub fn summary(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.summary())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(getter)]
    pub fn is_converting(&self) -> bool {
        self.inner.is_converting()
    }

    #[wasm_bindgen(getter)]
    pub fn len(&self) -> usize {
        self.inner.jobs().len()
    }

    #[wasm_bindgen(getter)]
    pub fn is_empty(&self) -> bool {
        self.inner.jobs().is_empty()
    }

    /// The converted file of one job.
    ///
    /// # Errors
    ///
    /// Returns an error if the job is unknown or has no output.
    pub fn download(&self, id: String) -> Result<JsOutputFile, JsValue> {
        let id = JobId::from(id);
        let file = self
            .inner
            .download(&id)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        let mime_type = self
            .inner
            .job(&id)
            .and_then(|job| job.output_format)
            .unwrap_or(self.inner.options().format)
            .mime_type();
        Ok(JsOutputFile::new(file.filename, mime_type, file.bytes.to_vec()))
    }

    /// A ZIP of every completed job.
    ///
    /// # Errors
    ///
    /// Returns an error if no job has completed.
    pub fn export_archive(&self) -> Result<JsOutputFile, JsValue> {
        let archive = self
            .inner
            .export_archive()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(JsOutputFile::new(archive.filename, "application/zip", archive.bytes))
    }
}
