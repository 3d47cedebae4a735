//! Job records tracked by the conversion queue.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::encode::OutputFormat;
use crate::present::size_change_percent;

/// Unique identifier of one admitted source image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// A fresh random (v4 UUID) identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

/// One source image and, once converted, its output.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub id: JobId,
    /// Original file name, used to derive download names.
    pub name: String,
    /// MIME type declared by the browser; informational only.
    pub mime_type: String,
    pub source: Arc<[u8]>,
    pub status: JobStatus,
    /// 0-100.
    pub progress: u8,
    pub output: Option<Vec<u8>>,
    /// Format requested when the job was dispatched.
    pub output_format: Option<OutputFormat>,
    pub output_dimensions: Option<(u32, u32)>,
    pub error_message: Option<String>,
}

impl ConversionJob {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, source: impl Into<Arc<[u8]>>) -> Self {
        Self {
            id: JobId::generate(),
            name: name.into(),
            mime_type: mime_type.into(),
            source: source.into(),
            status: JobStatus::Pending,
            progress: 0,
            output: None,
            output_format: None,
            output_dimensions: None,
            error_message: None,
        }
    }

    pub fn source_size(&self) -> usize {
        self.source.len()
    }

    pub fn output_size(&self) -> Option<usize> {
        self.output.as_ref().map(Vec::len)
    }

    /// Completed with a non-empty output.
    pub fn has_output(&self) -> bool {
        self.status == JobStatus::Completed && self.output.as_ref().is_some_and(|o| !o.is_empty())
    }

    /// Return to `Pending`, dropping any previous result.
    pub(crate) fn reset(&mut self) {
        self.status = JobStatus::Pending;
        self.progress = 0;
        self.output = None;
        self.output_format = None;
        self.output_dimensions = None;
        self.error_message = None;
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let output_size = self.output_size();
        JobSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            status: self.status,
            progress: self.progress,
            source_size: self.source_size(),
            output_size,
            error_message: self.error_message.clone(),
            size_change_percent: output_size.map(|out| size_change_percent(self.source_size(), out)),
        }
    }
}

/// What a UI needs to render one job row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: JobId,
    pub name: String,
    pub status: JobStatus,
    pub progress: u8,
    pub source_size: usize,
    pub output_size: Option<usize>,
    pub error_message: Option<String>,
    /// Negative when the output is smaller than the source.
    pub size_change_percent: Option<f64>,
}

/// Completed-vs-errored split of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_jobs<'a>(jobs: impl IntoIterator<Item = &'a ConversionJob>) -> Self {
        jobs.into_iter().fold(Self::default(), |mut acc, job| {
            acc.total += 1;
            match job.status {
                JobStatus::Pending => acc.pending += 1,
                JobStatus::Processing => acc.processing += 1,
                JobStatus::Completed => acc.completed += 1,
                JobStatus::Error => acc.failed += 1,
            }
            acc
        })
    }
}
