//! Core data types passed between the pool, the pipeline and its plug-ins.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Cursor, Read};
use tokio_util::sync::CancellationToken;

use crate::error::{PipelineError, PipelineResult};
use crate::pool::WorkerId;

/// A named input stream submitted to the pool.
///
/// Owned by the submitter until enqueued, then by the worker that dequeues it.
pub struct ImageTask {
    /// Task identity, usually the source path
    pub name: String,

    /// Encoded image bytes
    pub input: Box<dyn Read + Send>,
}

impl ImageTask {
    pub fn new(name: impl Into<String>, input: impl Read + Send + 'static) -> Self {
        Self {
            name: name.into(),
            input: Box::new(input),
        }
    }

    /// Build a task over an in-memory buffer.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(name, Cursor::new(bytes))
    }
}

impl fmt::Debug for ImageTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageTask")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Per-invocation context handed to collectors and transforms.
///
/// Built explicitly by the worker for every task.
#[derive(Debug, Clone)]
pub struct TaskContext {
    /// Worker running the task
    pub worker: WorkerId,

    /// Task identity
    pub task: String,

    /// Shared cancellation signal of the run
    pub cancel: CancellationToken,
}

impl TaskContext {
    pub fn new(worker: WorkerId, task: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            worker,
            task: task.into(),
            cancel,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail with [`PipelineError::Cancelled`] if the run was cancelled.
    pub fn check_cancelled(&self) -> PipelineResult<()> {
        if self.is_cancelled() {
            return Err(PipelineError::Cancelled {
                task: self.task.clone(),
            });
        }
        Ok(())
    }
}

/// A per-task failure, attributed to the task and the worker that ran it.
#[derive(Debug)]
pub struct ErrorRecord {
    pub worker: WorkerId,
    pub task: String,
    pub error: PipelineError,
}

impl ErrorRecord {
    /// The transform error behind an abort, or the error itself.
    pub fn cause(&self) -> &PipelineError {
        match &self.error {
            PipelineError::Aborted { source, .. } => source,
            other => other,
        }
    }
}

/// Processing statistics for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProcessingStats {
    /// Tasks committed
    pub succeeded: usize,

    /// Tasks reported to the error sink
    pub failed: usize,

    /// Processing rate in images per second
    pub images_per_second: f64,

    /// Wall time since the pool started, in seconds
    pub total_seconds: f64,
}
