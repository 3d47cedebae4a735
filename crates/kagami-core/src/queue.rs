//! Sequential conversion queue.
//!
//! The queue owns every job record and a FIFO backlog of job ids waiting to
//! be converted. At most one job is in flight: it is handed to the worker
//! through a [`Dispatch`] implementation and the next one is only dispatched
//! once the worker's terminal event for it comes back through
//! [`ConversionQueue::handle_event`].
//!
//! Every dispatch gets a fresh ticket. Only events carrying the in-flight
//! job's id and ticket are applied, so a late result from an earlier run of
//! the same job (given up on, then retried) cannot land on the current one.
//!
//! All mutation goes through `&mut self`, so callers feed events in the order
//! they arrive and never need a lock.

use std::collections::VecDeque;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::archive::{build_archive, output_filename, Archive, ArchiveError};
use crate::job::{BatchSummary, ConversionJob, JobId, JobSnapshot, JobStatus};
use crate::options::ConversionOptions;
use crate::worker::{Dispatch, WorkerEvent, WorkerRequest};

/// Highest progress a job can show before its result is in.
const MAX_PENDING_PROGRESS: u8 = 99;

/// Errors from per-job queue operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Unknown job: {0}")]
    UnknownJob(JobId),

    #[error("Job {0} has no converted output")]
    NotCompleted(JobId),

    #[error("Job {0} is being converted")]
    InFlight(JobId),
}

/// Whether the queue is working through its backlog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Idle,
    Draining,
}

/// A converted file ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile<'a> {
    pub filename: String,
    pub bytes: &'a [u8],
}

/// Jobs plus the backlog that feeds them to a worker one at a time.
pub struct ConversionQueue<D> {
    jobs: Vec<ConversionJob>,
    backlog: VecDeque<JobId>,
    in_flight: Option<(JobId, u32)>,
    next_ticket: u32,
    options: ConversionOptions,
    dispatcher: D,
}

impl<D: Dispatch> ConversionQueue<D> {
    pub fn new(dispatcher: D) -> Self {
        Self::with_options(dispatcher, ConversionOptions::default())
    }

    pub fn with_options(dispatcher: D, options: ConversionOptions) -> Self {
        Self {
            jobs: Vec::new(),
            backlog: VecDeque::new(),
            in_flight: None,
            next_ticket: 0,
            options,
            dispatcher,
        }
    }

    /// Admit one source file as a Pending job.
    pub fn add_file(
        &mut self,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> JobId {
        let job = ConversionJob::new(name, mime_type, bytes);
        let id = job.id.clone();
        debug!(%id, name = %job.name, size = job.source_size(), "job added");
        self.jobs.push(job);
        id
    }

    /// Admit several files, returning their ids in the same order.
    pub fn add_files<I, N, M, B>(&mut self, files: I) -> Vec<JobId>
    where
        I: IntoIterator<Item = (N, M, B)>,
        N: Into<String>,
        M: Into<String>,
        B: Into<Arc<[u8]>>,
    {
        files
            .into_iter()
            .map(|(name, mime_type, bytes)| self.add_file(name, mime_type, bytes))
            .collect()
    }

    /// Queue Pending jobs for conversion and start if idle.
    ///
    /// Ids that are unknown, not Pending, or already queued are skipped.
    pub fn enqueue_all<'a, I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = &'a JobId>,
    {
        for id in ids {
            let pending = self
                .job(id)
                .is_some_and(|job| job.status == JobStatus::Pending);
            if pending && !self.backlog.contains(id) {
                self.backlog.push_back(id.clone());
            }
        }

        if self.in_flight.is_none() {
            self.dispatch_next();
        }
    }

    /// Queue every Pending job in the order it was added.
    pub fn convert_all(&mut self) {
        let pending: Vec<JobId> = self
            .jobs
            .iter()
            .filter(|job| job.status == JobStatus::Pending)
            .map(|job| job.id.clone())
            .collect();
        info!(count = pending.len(), format = %self.options.format, "converting batch");
        self.enqueue_all(&pending);
    }

    /// Dispatch the head of the backlog, or go idle if it is empty.
    ///
    /// Does nothing while a job is in flight. A job whose request cannot be
    /// delivered is marked Error and the next one is tried.
    pub fn dispatch_next(&mut self) {
        if self.in_flight.is_some() {
            return;
        }

        while let Some(id) = self.backlog.pop_front() {
            let Some(index) = self.index_of(&id) else {
                continue;
            };
            let job = &mut self.jobs[index];
            job.status = JobStatus::Processing;
            job.progress = 0;
            job.error_message = None;
            job.output_format = Some(self.options.format);

            let ticket = self.next_ticket;
            self.next_ticket = self.next_ticket.wrapping_add(1);
            let request = WorkerRequest::Convert {
                id: id.clone(),
                ticket,
                source: Arc::clone(&job.source),
                options: self.options.clone(),
            };

            match self.dispatcher.dispatch(request) {
                Ok(()) => {
                    debug!(%id, ticket, "job dispatched");
                    self.in_flight = Some((id, ticket));
                    return;
                }
                Err(err) => {
                    warn!(%id, ticket, error = %err, "dispatch failed");
                    let job = &mut self.jobs[index];
                    job.status = JobStatus::Error;
                    job.output_format = None;
                    job.error_message = Some(err.to_string());
                }
            }
        }

        debug!("backlog drained");
    }

    /// Apply a worker event.
    ///
    /// Only events of the current dispatch count: anything else (an unknown
    /// id, or a ticket from an earlier run of the same job) is ignored. A
    /// terminal event of the current dispatch advances the queue even if its
    /// job was removed in the meantime.
    pub fn handle_event(&mut self, event: WorkerEvent) {
        let current = self
            .in_flight
            .as_ref()
            .is_some_and(|(id, ticket)| id == event.id() && *ticket == event.ticket());
        if !current {
            debug!(id = %event.id(), ticket = event.ticket(), "ignoring event outside the current dispatch");
            return;
        }
        let terminal = event.is_terminal();

        match event {
            WorkerEvent::Progress { id, percent, .. } => match self.job_mut(&id) {
                Some(job) if job.status == JobStatus::Processing => {
                    job.progress = job.progress.max(percent.min(MAX_PENDING_PROGRESS));
                }
                _ => debug!(%id, percent, "ignoring progress for detached job"),
            },
            WorkerEvent::Complete {
                id,
                output,
                width,
                height,
                ..
            } => match self.job_mut(&id) {
                Some(job) if job.status == JobStatus::Processing => {
                    info!(%id, bytes = output.len(), width, height, "job completed");
                    job.status = JobStatus::Completed;
                    job.progress = 100;
                    job.output = Some(output);
                    job.output_dimensions = Some((width, height));
                }
                _ => debug!(%id, "ignoring result for detached job"),
            },
            WorkerEvent::Failed { id, message, .. } => match self.job_mut(&id) {
                Some(job) if job.status == JobStatus::Processing => {
                    warn!(%id, %message, "job failed");
                    job.status = JobStatus::Error;
                    job.progress = 0;
                    job.output_format = None;
                    job.error_message = Some(message);
                }
                _ => debug!(%id, "ignoring failure for detached job"),
            },
        }

        if terminal {
            self.in_flight = None;
            self.dispatch_next();
        }
    }

    /// Drop a job and its buffers.
    ///
    /// A queued job will not be dispatched. If it is in flight, its result
    /// is discarded when it arrives.
    pub fn remove(&mut self, id: &JobId) -> Option<ConversionJob> {
        self.backlog.retain(|queued| queued != id);
        let index = self.index_of(id)?;
        debug!(%id, "job removed");
        Some(self.jobs.remove(index))
    }

    /// Reset a finished job to Pending and queue it again.
    ///
    /// # Errors
    ///
    /// `UnknownJob` if the id is not tracked, `InFlight` if the job is being
    /// converted right now.
    pub fn retry(&mut self, id: &JobId) -> Result<(), QueueError> {
        let job = self
            .job_mut(id)
            .ok_or_else(|| QueueError::UnknownJob(id.clone()))?;
        match job.status {
            JobStatus::Processing => return Err(QueueError::InFlight(id.clone())),
            JobStatus::Completed | JobStatus::Error => job.reset(),
            JobStatus::Pending => {}
        }
        self.enqueue_all([id]);
        Ok(())
    }

    /// Drop every job and the backlog.
    pub fn clear(&mut self) {
        info!(count = self.jobs.len(), "clearing queue");
        self.jobs.clear();
        self.backlog.clear();
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Replace the options used for jobs dispatched from now on.
    pub fn set_options(&mut self, options: ConversionOptions) {
        self.options = options;
    }

    pub fn jobs(&self) -> &[ConversionJob] {
        &self.jobs
    }

    pub fn job(&self, id: &JobId) -> Option<&ConversionJob> {
        self.jobs.iter().find(|job| &job.id == id)
    }

    pub fn snapshots(&self) -> Vec<JobSnapshot> {
        self.jobs.iter().map(ConversionJob::snapshot).collect()
    }

    pub fn snapshot(&self, id: &JobId) -> Option<JobSnapshot> {
        self.job(id).map(ConversionJob::snapshot)
    }

    pub fn state(&self) -> QueueState {
        if self.in_flight.is_some() {
            QueueState::Draining
        } else {
            QueueState::Idle
        }
    }

    pub fn is_converting(&self) -> bool {
        self.state() == QueueState::Draining
    }

    /// Id of the job the worker is currently converting, if any.
    pub fn in_flight(&self) -> Option<&JobId> {
        self.in_flight.as_ref().map(|(id, _)| id)
    }

    /// Ticket of the current dispatch, if a job is in flight.
    pub fn in_flight_ticket(&self) -> Option<u32> {
        self.in_flight.as_ref().map(|(_, ticket)| *ticket)
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary::from_jobs(&self.jobs)
    }

    /// The converted bytes of a job and the name to save them under.
    ///
    /// # Errors
    ///
    /// `UnknownJob` if the id is not tracked, `NotCompleted` if the job has
    /// no output.
    pub fn download(&self, id: &JobId) -> Result<OutputFile<'_>, QueueError> {
        let job = self
            .job(id)
            .ok_or_else(|| QueueError::UnknownJob(id.clone()))?;
        match (&job.output, job.status) {
            (Some(bytes), JobStatus::Completed) if !bytes.is_empty() => Ok(OutputFile {
                filename: output_filename(
                    &job.name,
                    job.output_format.unwrap_or(self.options.format),
                ),
                bytes,
            }),
            _ => Err(QueueError::NotCompleted(id.clone())),
        }
    }

    /// Bundle every completed job into a dated ZIP archive.
    pub fn export_archive(&self) -> Result<Archive, ArchiveError> {
        build_archive(&self.jobs, self.options.format)
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    fn index_of(&self, id: &JobId) -> Option<usize> {
        self.jobs.iter().position(|job| &job.id == id)
    }

    fn job_mut(&mut self, id: &JobId) -> Option<&mut ConversionJob> {
        self.jobs.iter_mut().find(|job| &job.id == id)
    }
}
