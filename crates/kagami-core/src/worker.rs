//! The conversion worker: message protocol and execution context.
//!
//! A worker receives [`WorkerRequest`]s and answers with a stream of
//! [`WorkerEvent`]s. Every request produces zero or more `Progress` events
//! followed by exactly one terminal event (`Complete` or `Failed`).
//!
//! Each request carries a `ticket` that is unique per dispatch and echoed on
//! every event it produces. The same job can be dispatched more than once
//! (after a retry), so the queue matches events on `(id, ticket)`.
//!
//! [`handle_request`] is the whole worker body and holds no state. Natively
//! it runs on a dedicated thread owned by [`ConversionWorker`]; in the
//! browser the wasm bindings call it from inside a Web Worker.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::convert::convert_with_progress;
use crate::job::JobId;
use crate::options::ConversionOptions;

/// A message from the controlling context to the worker.
#[derive(Debug, Clone)]
pub enum WorkerRequest {
    Convert {
        id: JobId,
        ticket: u32,
        source: Arc<[u8]>,
        options: ConversionOptions,
    },
}

impl WorkerRequest {
    pub fn id(&self) -> &JobId {
        match self {
            WorkerRequest::Convert { id, .. } => id,
        }
    }

    pub fn ticket(&self) -> u32 {
        match self {
            WorkerRequest::Convert { ticket, .. } => *ticket,
        }
    }
}

/// A message from the worker back to the controlling context.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Progress {
        id: JobId,
        ticket: u32,
        percent: u8,
    },
    Complete {
        id: JobId,
        ticket: u32,
        output: Vec<u8>,
        width: u32,
        height: u32,
    },
    Failed {
        id: JobId,
        ticket: u32,
        message: String,
    },
}

impl WorkerEvent {
    pub fn id(&self) -> &JobId {
        match self {
            WorkerEvent::Progress { id, .. }
            | WorkerEvent::Complete { id, .. }
            | WorkerEvent::Failed { id, .. } => id,
        }
    }

    /// Ticket of the dispatch this event belongs to.
    pub fn ticket(&self) -> u32 {
        match self {
            WorkerEvent::Progress { ticket, .. }
            | WorkerEvent::Complete { ticket, .. }
            | WorkerEvent::Failed { ticket, .. } => *ticket,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkerEvent::Progress { .. })
    }
}

/// Run one request to completion, reporting through `emit`.
///
/// Pipeline errors and panics are turned into a `Failed` event, so the
/// caller always sees exactly one terminal event. Every event carries the
/// request's ticket.
///
/// Catching panics needs unwinding. On `wasm32-unknown-unknown` a panic
/// aborts instead, so a panicking job takes the whole Web Worker down and
/// no terminal event is sent. The page has to notice that through the
/// worker's `error` event or a timeout and report the job as failed itself.
pub fn handle_request<F>(request: WorkerRequest, mut emit: F)
where
    F: FnMut(WorkerEvent),
{
    let WorkerRequest::Convert {
        id,
        ticket,
        source,
        options,
    } = request;

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        convert_with_progress(&source, &options, |percent| {
            emit(WorkerEvent::Progress {
                id: id.clone(),
                ticket,
                percent,
            })
        })
    }));

    let terminal = match result {
        Ok(Ok(converted)) => {
            debug!(%id, ticket, bytes = converted.bytes.len(), "conversion finished");
            WorkerEvent::Complete {
                id,
                ticket,
                output: converted.bytes,
                width: converted.width,
                height: converted.height,
            }
        }
        Ok(Err(err)) => {
            warn!(%id, ticket, error = %err, "conversion failed");
            WorkerEvent::Failed {
                id,
                ticket,
                message: err.to_string(),
            }
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(%id, ticket, %message, "conversion panicked");
            WorkerEvent::Failed {
                id,
                ticket,
                message,
            }
        }
    };
    emit(terminal);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("Conversion aborted: {detail}")
}

/// Failure to hand a request to the worker.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The worker has shut down and no longer accepts requests.
    #[error("Worker is not running")]
    Disconnected,

    /// The host environment refused the message.
    #[error("Failed to post message to worker: {0}")]
    Rejected(String),
}

/// Something that delivers requests to a worker.
///
/// Events travel back separately and are fed to
/// [`ConversionQueue::handle_event`](crate::queue::ConversionQueue::handle_event)
/// by whoever owns the queue.
pub trait Dispatch {
    fn dispatch(&mut self, request: WorkerRequest) -> Result<(), DispatchError>;
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::ConversionWorker;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::io;
    use std::thread::{self, JoinHandle};

    use crossbeam::channel::{self, Receiver, Sender};
    use tracing::debug;

    use super::{handle_request, Dispatch, DispatchError, WorkerEvent, WorkerRequest};

    /// A dedicated OS thread running [`handle_request`] for each request.
    ///
    /// Requests are processed one at a time in arrival order. Dropping the
    /// worker closes its request channel and waits for the current job.
    pub struct ConversionWorker {
        requests: Option<Sender<WorkerRequest>>,
        thread: Option<JoinHandle<()>>,
    }

    impl ConversionWorker {
        /// Start the worker thread.
        ///
        /// Returns the worker and the receiving end of its event stream.
        ///
        /// # Errors
        ///
        /// Returns the OS error if the thread cannot be spawned.
        pub fn spawn() -> io::Result<(Self, Receiver<WorkerEvent>)> {
            let (request_tx, request_rx) = channel::unbounded::<WorkerRequest>();
            let (event_tx, event_rx) = channel::unbounded::<WorkerEvent>();

            let thread = thread::Builder::new()
                .name("kagami-worker".to_string())
                .spawn(move || {
                    for request in request_rx {
                        debug!(id = %request.id(), ticket = request.ticket(), "worker picked up request");
                        handle_request(request, |event| {
                            // The receiver may be gone; there is nobody left to tell
                            let _ = event_tx.send(event);
                        });
                    }
                })?;

            Ok((
                Self {
                    requests: Some(request_tx),
                    thread: Some(thread),
                },
                event_rx,
            ))
        }
    }

    impl Dispatch for ConversionWorker {
        fn dispatch(&mut self, request: WorkerRequest) -> Result<(), DispatchError> {
            let sender = self.requests.as_ref().ok_or(DispatchError::Disconnected)?;
            sender
                .send(request)
                .map_err(|_| DispatchError::Disconnected)
        }
    }

    impl Drop for ConversionWorker {
        fn drop(&mut self) {
            drop(self.requests.take());
            if let Some(thread) = self.thread.take() {
                let _ = thread.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::OutputFormat;
    use image::{DynamicImage, ImageFormat, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Arc<[u8]> {
        let img = RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner().into()
    }

    fn run(request: WorkerRequest) -> Vec<WorkerEvent> {
        let mut events = Vec::new();
        handle_request(request, |e| events.push(e));
        events
    }

    #[test]
    fn test_success_ends_with_complete() {
        let events = run(WorkerRequest::Convert {
            id: JobId::from("a"),
            ticket: 7,
            source: png_bytes(6, 4),
            options: ConversionOptions::new(OutputFormat::Png, 80),
        });

        assert!(events.iter().all(|e| e.ticket() == 7));
        let (last, progress) = events.split_last().unwrap();
        match last {
            WorkerEvent::Complete {
                id, width, height, output, ..
            } => {
                assert_eq!(id.as_str(), "a");
                assert_eq!((*width, *height), (6, 4));
                assert!(!output.is_empty());
            }
            other => panic!("expected Complete, got {other:?}"),
        }
        assert!(progress.iter().all(|e| !e.is_terminal()));
        let percents: Vec<u8> = progress
            .iter()
            .filter_map(|e| match e {
                WorkerEvent::Progress { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect();
        assert!(percents.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_decode_failure_ends_with_failed() {
        let events = run(WorkerRequest::Convert {
            id: JobId::from("bad"),
            ticket: 3,
            source: Arc::from(&b"garbage"[..]),
            options: ConversionOptions::default(),
        });

        let terminal: Vec<_> = events.iter().filter(|e| e.is_terminal()).collect();
        assert_eq!(terminal.len(), 1);
        match terminal[0] {
            WorkerEvent::Failed {
                id,
                ticket,
                message,
            } => {
                assert_eq!(id.as_str(), "bad");
                assert_eq!(*ticket, 3);
                assert!(message.starts_with("Failed to decode image"), "{message}");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn test_panic_message_extraction() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("boom"));
        assert_eq!(panic_message(owned.as_ref()), "Conversion aborted: boom");

        let borrowed: Box<dyn Any + Send> = Box::new("static boom");
        assert_eq!(panic_message(borrowed.as_ref()), "Conversion aborted: static boom");

        let other: Box<dyn Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(other.as_ref()), "Conversion aborted: unknown panic");
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_native_worker_processes_in_order() {
        let (mut worker, events) = ConversionWorker::spawn().unwrap();
        for (ticket, name) in ["one", "two"].into_iter().enumerate() {
            worker
                .dispatch(WorkerRequest::Convert {
                    id: JobId::from(name),
                    ticket: ticket as u32,
                    source: png_bytes(3, 3),
                    options: ConversionOptions::new(OutputFormat::Png, 80),
                })
                .unwrap();
        }

        let mut completed = Vec::new();
        while completed.len() < 2 {
            let event = events
                .recv_timeout(std::time::Duration::from_secs(30))
                .unwrap();
            if event.is_terminal() {
                completed.push((event.id().clone(), event.ticket()));
            }
        }
        assert_eq!(
            completed,
            vec![(JobId::from("one"), 0), (JobId::from("two"), 1)]
        );
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_drop_joins_worker() {
        let (worker, events) = ConversionWorker::spawn().unwrap();
        drop(worker);
        // Thread exited, so the event sender is gone
        assert!(events.recv().is_err());
    }
}
