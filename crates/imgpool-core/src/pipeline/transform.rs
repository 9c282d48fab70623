//! The transform plug-in contract.

use std::io::{Read, Write};

use crate::error::PipelineResult;
use crate::types::TaskContext;

/// Streams one task's input into its output.
///
/// Runs on the blocking thread pool. Long-running implementations must poll
/// `ctx.cancel` at a fine granularity and fail with
/// [`PipelineError::Cancelled`](crate::error::PipelineError::Cancelled) once
/// it fires.
pub trait Transform: Send + Sync {
    fn apply(
        &self,
        ctx: &TaskContext,
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> PipelineResult<()>;
}

impl<F> Transform for F
where
    F: Fn(&TaskContext, &mut dyn Read, &mut dyn Write) -> PipelineResult<()> + Send + Sync,
{
    fn apply(
        &self,
        ctx: &TaskContext,
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> PipelineResult<()> {
        self(ctx, input, output)
    }
}

/// Copies input to output unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Transform for Passthrough {
    fn apply(
        &self,
        ctx: &TaskContext,
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> PipelineResult<()> {
        ctx.check_cancelled()?;
        std::io::copy(input, output)?;
        Ok(())
    }
}
