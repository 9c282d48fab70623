//! Filesystem collector: stage into a temporary file, rename on commit.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::{Collector, CollectorSession};
use crate::error::{PipelineError, PipelineResult};
use crate::types::TaskContext;

/// Writes each task's output to `<output_dir>/<file name of the task>`.
///
/// Output is staged in a hidden temporary file in the same directory, so a
/// commit is an atomic rename and an abort leaves nothing behind.
#[derive(Debug, Clone)]
pub struct FsCollector {
    output_dir: PathBuf,
}

impl FsCollector {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl Collector for FsCollector {
    fn acquire(&self, ctx: &TaskContext) -> PipelineResult<Box<dyn CollectorSession>> {
        let file_name = Path::new(&ctx.task)
            .file_name()
            .ok_or_else(|| PipelineError::Collector {
                task: ctx.task.clone(),
                message: "task name has no file name component".to_string(),
            })?;
        let target = self.output_dir.join(file_name);

        let file = tempfile::Builder::new()
            .prefix(".imgpool-")
            .suffix(".part")
            .tempfile_in(&self.output_dir)
            .map_err(|e| PipelineError::Collector {
                task: ctx.task.clone(),
                message: format!("cannot create staging file in {:?}: {e}", self.output_dir),
            })?;

        Ok(Box::new(FsSession {
            file: Some(file),
            target,
            task: ctx.task.clone(),
            written: false,
        }))
    }
}

struct FsSession {
    file: Option<NamedTempFile>,
    target: PathBuf,
    task: String,
    written: bool,
}

impl FsSession {
    fn released(&self) -> io::Error {
        io::Error::other(format!("session for {} already released", self.task))
    }
}

impl Write for FsSession {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(file) => {
                self.written = true;
                file.write(buf)
            }
            None => Err(self.released()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl CollectorSession for FsSession {
    fn commit(&mut self) -> PipelineResult<()> {
        if !self.written {
            return Err(PipelineError::EmptyCommit {
                task: self.task.clone(),
            });
        }
        let mut file = self.file.take().ok_or_else(|| self.released())?;
        file.flush()?;
        file.persist(&self.target)
            .map_err(|e| PipelineError::Collector {
                task: self.task.clone(),
                message: format!("cannot persist {:?}: {}", self.target, e.error),
            })?;
        tracing::trace!(task = %self.task, target = ?self.target, "Output persisted");
        Ok(())
    }

    fn abort(&mut self) -> PipelineResult<()> {
        if let Some(file) = self.file.take() {
            file.close()?;
        }
        Ok(())
    }

    fn close(&mut self) -> PipelineResult<()> {
        // Dropping an unpersisted staging file deletes it.
        self.file.take();
        Ok(())
    }
}
