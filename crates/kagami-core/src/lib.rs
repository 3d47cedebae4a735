//! Kagami Core - batch image conversion
//!
//! This crate converts raster images between JPEG, PNG and WebP, optionally
//! resizing them, and manages a batch of conversions that run one at a time
//! on a worker.
//!
//! - [`convert`]: the single-image pipeline (decode, resample, composite, encode)
//! - [`worker`]: the request/event protocol and the native worker thread
//! - [`queue`]: the sequential batch queue driving a worker
//! - [`archive`]: ZIP export of finished conversions

pub mod archive;
pub mod convert;
pub mod decode;
pub mod dimensions;
pub mod encode;
pub mod job;
pub mod options;
pub mod present;
pub mod queue;
pub mod worker;

pub use archive::{
    archive_filename, build_archive, build_archive_on, output_filename, Archive, ArchiveError,
};
pub use convert::{convert, convert_with_progress, ConvertError, ConvertedImage, MAX_OUTPUT_PIXELS};
pub use decode::{decode_image, DecodeError, DecodedImage, FilterType};
pub use dimensions::resolve_dimensions;
pub use encode::{EncodeError, OutputFormat};
pub use job::{BatchSummary, ConversionJob, JobId, JobSnapshot, JobStatus};
pub use options::{ConversionOptions, OptionsError, ResizeIntent, DEFAULT_QUALITY};
pub use present::{format_file_size, is_accepted_mime_type, size_change_percent};
pub use queue::{ConversionQueue, OutputFile, QueueError, QueueState};
#[cfg(not(target_arch = "wasm32"))]
pub use worker::ConversionWorker;
pub use worker::{handle_request, Dispatch, DispatchError, WorkerEvent, WorkerRequest};
