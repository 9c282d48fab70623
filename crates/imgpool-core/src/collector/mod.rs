//! Transactional output collectors.
//!
//! A [`Collector`] hands out one [`CollectorSession`] per task. The session
//! receives the transformed bytes through `std::io::Write` and then either
//! publishes them (`commit`) or throws them away (`abort`). `close` only
//! releases resources.
//!
//! The pipeline never drives a raw session: it wraps it in a
//! [`SessionGuard`], which allows exactly one of commit/abort and releases
//! the session on every exit path, unwinding included.

mod fs;
mod memory;

pub use fs::FsCollector;
pub use memory::{MemoryCollector, ResultCollection};

use std::io::{self, Write};

use crate::error::{PipelineError, PipelineResult};
use crate::types::TaskContext;

/// Per-task output target.
pub trait CollectorSession: Write + Send {
    /// Publish everything written so far. Requires at least one write.
    fn commit(&mut self) -> PipelineResult<()>;

    /// Discard everything written so far. Safe with no writes.
    fn abort(&mut self) -> PipelineResult<()>;

    /// Release resources. Idempotent, does not imply success.
    fn close(&mut self) -> PipelineResult<()>;
}

/// Factory of collector sessions.
pub trait Collector: Send + Sync {
    fn acquire(&self, ctx: &TaskContext) -> PipelineResult<Box<dyn CollectorSession>>;
}

impl<F> Collector for F
where
    F: Fn(&TaskContext) -> PipelineResult<Box<dyn CollectorSession>> + Send + Sync,
{
    fn acquire(&self, ctx: &TaskContext) -> PipelineResult<Box<dyn CollectorSession>> {
        self(ctx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Open,
    Committed,
    Aborted,
}

impl SessionState {
    fn as_str(self) -> &'static str {
        match self {
            SessionState::Open => "open",
            SessionState::Committed => "committed",
            SessionState::Aborted => "aborted",
        }
    }
}

/// Scoped ownership of a session.
///
/// Dropping a guard that was neither committed nor aborted aborts it; every
/// guard closes its session on drop.
pub struct SessionGuard {
    session: Box<dyn CollectorSession>,
    task: String,
    state: SessionState,
    closed: bool,
}

impl SessionGuard {
    pub fn new(session: Box<dyn CollectorSession>, task: impl Into<String>) -> Self {
        Self {
            session,
            task: task.into(),
            state: SessionState::Open,
            closed: false,
        }
    }

    pub fn commit(&mut self) -> PipelineResult<()> {
        self.finish(SessionState::Committed)?;
        self.session.commit()
    }

    pub fn abort(&mut self) -> PipelineResult<()> {
        self.finish(SessionState::Aborted)?;
        self.session.abort()
    }

    pub fn close(&mut self) -> PipelineResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.session.close()
    }

    pub fn is_finished(&self) -> bool {
        self.state != SessionState::Open
    }

    fn finish(&mut self, next: SessionState) -> PipelineResult<()> {
        if self.state != SessionState::Open {
            return Err(PipelineError::SessionFinished {
                task: self.task.clone(),
                state: self.state.as_str(),
            });
        }
        self.state = next;
        Ok(())
    }
}

impl Write for SessionGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.is_finished() || self.closed {
            return Err(io::Error::other(format!(
                "session for {} is {}",
                self.task,
                self.state.as_str()
            )));
        }
        self.session.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.session.flush()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.is_finished() {
            if let Err(e) = self.abort() {
                tracing::warn!(task = %self.task, "Abort on release failed: {e}");
            }
        }
        if let Err(e) = self.close() {
            tracing::warn!(task = %self.task, "Session close failed: {e}");
        }
    }
}
