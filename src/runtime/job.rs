use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};

use serde::Serialize;
use serde_json::Value;

use crate::model::ImageState;
use crate::transforms::{Transform, TransformError, TransformKind, TransformOutput};

use super::{FileId, Result, SessionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct JobId(u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Lifecycle of the in-flight job as seen from the main context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobStatus {
    Pending,
    Running,
}

/// Returned by a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobHandle {
    pub id: JobId,
    pub kind: TransformKind,
    pub file: FileId,
}

/// A terminal job, drained from the completion channel.
#[derive(Debug)]
pub struct FinishedJob {
    pub handle: JobHandle,
    /// Input the job ran against; becomes the undo entry on accept.
    pub original: ImageState,
    pub outcome: std::result::Result<TransformOutput, TransformError>,
}

enum WorkerMessage {
    Started(JobId),
    Finished(FinishedJob),
}

struct ActiveJob {
    handle: JobHandle,
    status: JobStatus,
    worker: JoinHandle<()>,
}

/// Runs at most one transform at a time on a background thread.
pub struct JobRunner {
    sender: Sender<WorkerMessage>,
    receiver: Receiver<WorkerMessage>,
    next_id: u64,
    active: Option<ActiveJob>,
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRunner")
            .field("next_id", &self.next_id)
            .field("active", &self.status())
            .finish()
    }
}

impl JobRunner {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self {
            sender,
            receiver,
            next_id: 1,
            active: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    pub fn status(&self) -> Option<(JobHandle, JobStatus)> {
        self.active.as_ref().map(|job| (job.handle, job.status))
    }

    /// Starts `transform` on a worker thread. The input is moved into the
    /// worker; its voxel buffer is shared, never copied.
    pub fn submit(
        &mut self,
        transform: Arc<dyn Transform>,
        file: FileId,
        input: ImageState,
        params: Value,
    ) -> Result<JobHandle> {
        if self.active.is_some() {
            return Err(SessionError::Busy);
        }

        let handle = JobHandle {
            id: JobId(self.next_id),
            kind: transform.kind(),
            file,
        };
        let sender = self.sender.clone();
        let worker = thread::Builder::new()
            .name(format!("transform-{}", handle.id.0))
            .spawn(move || {
                let _ = sender.send(WorkerMessage::Started(handle.id));
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    transform.apply(&input, &params)
                }))
                .unwrap_or_else(|payload| Err(TransformError::Panicked(panic_message(payload))));
                let _ = sender.send(WorkerMessage::Finished(FinishedJob {
                    handle,
                    original: input,
                    outcome,
                }));
            })
            .map_err(|error| SessionError::Worker(error.to_string()))?;

        self.next_id += 1;
        self.active = Some(ActiveJob {
            handle,
            status: JobStatus::Pending,
            worker,
        });
        tracing::info!(job_id = %handle.id, kind = %handle.kind, file = %file, "job submitted");
        Ok(handle)
    }

    /// Non-blocking drain of the completion channel.
    pub fn poll(&mut self) -> Result<Option<FinishedJob>> {
        loop {
            match self.receiver.try_recv() {
                Ok(message) => {
                    if let Some(finished) = self.handle_message(message) {
                        return Ok(Some(finished));
                    }
                }
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => {
                    return Err(SessionError::Worker("completion channel closed".to_string()));
                }
            }
        }
    }

    /// Blocks until the active job finishes. Returns `None` when idle.
    pub fn wait(&mut self) -> Result<Option<FinishedJob>> {
        while self.active.is_some() {
            let message = self
                .receiver
                .recv()
                .map_err(|error| SessionError::Worker(error.to_string()))?;
            if let Some(finished) = self.handle_message(message) {
                return Ok(Some(finished));
            }
        }
        Ok(None)
    }

    fn handle_message(&mut self, message: WorkerMessage) -> Option<FinishedJob> {
        let active_id = self.active.as_ref().map(|job| job.handle.id);
        match message {
            WorkerMessage::Started(id) => {
                if let Some(job) = self.active.as_mut().filter(|job| job.handle.id == id) {
                    job.status = JobStatus::Running;
                    tracing::debug!(job_id = %id, "job running");
                }
                None
            }
            WorkerMessage::Finished(finished) if Some(finished.handle.id) == active_id => {
                if let Some(job) = self.active.take() {
                    // The worker has already sent its last message.
                    let _ = job.worker.join();
                }
                match &finished.outcome {
                    Ok(output) => tracing::info!(
                        job_id = %finished.handle.id,
                        kind = %finished.handle.kind,
                        shape = ?output.state.shape(),
                        "job succeeded"
                    ),
                    Err(error) => tracing::warn!(
                        job_id = %finished.handle.id,
                        kind = %finished.handle.kind,
                        error = %error,
                        "job failed"
                    ),
                }
                Some(finished)
            }
            WorkerMessage::Finished(stale) => {
                tracing::debug!(job_id = %stale.handle.id, "dropping stale job result");
                None
            }
        }
    }
}

pub(super) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
