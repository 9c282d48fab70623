//! Error types for the imgpool pipeline.
//!
//! Errors are split by where they surface: pool misuse and submission
//! failures are returned to the caller synchronously, while per-task
//! failures never leave the worker and are handed to the error sink.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised when creating a pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("worker count must be > 0")]
    InvalidWorkers,

    #[error("channel capacity must be > 0")]
    InvalidCapacity,
}

/// A rejected submission. The task was not enqueued.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// The caller's token or the pool's shared token fired first
    #[error("submission cancelled")]
    Cancelled,

    /// The pool has started closing
    #[error("pool is in closing state")]
    Closed,
}

/// Per-task failures. Each one is isolated to the task that produced it.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The collector could not provide a session for the task
    #[error("Collector error for {task}: {message}")]
    Collector { task: String, message: String },

    /// Image decoding failed
    #[error("Decode error for {task}: {message}")]
    Decode { task: String, message: String },

    /// Image encoding failed
    #[error("Encode error for {task}: {message}")]
    Encode { task: String, message: String },

    /// The decoded format has no encoder
    #[error("Unsupported format for {task}: {format}")]
    UnsupportedFormat { task: String, format: String },

    /// Image dimensions exceed limit
    #[error("Image too large: {task} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        task: String,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// File exceeds size limit
    #[error("File too large: {path} ({actual} bytes > {limit} bytes max)")]
    FileTooLarge {
        path: PathBuf,
        actual: u64,
        limit: u64,
    },

    /// The shared cancellation signal fired mid-operation
    #[error("Processing of {task} cancelled")]
    Cancelled { task: String },

    /// The transform panicked; its session was released during unwinding
    #[error("Transform panicked for {task}: {message}")]
    Panicked { task: String, message: String },

    /// A transform failure, together with the abort failure if any
    #[error("image processing failed: {source}{}", abort_suffix(.abort))]
    Aborted {
        #[source]
        source: Box<PipelineError>,
        abort: Option<Box<PipelineError>>,
    },

    /// Commit or abort called on a session that already finished
    #[error("Session for {task} already {state}")]
    SessionFinished { task: String, state: &'static str },

    /// Commit requested before anything was written
    #[error("Nothing written for {task}, refusing to commit")]
    EmptyCommit { task: String },

    /// I/O failure while streaming task data
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn abort_suffix(abort: &Option<Box<PipelineError>>) -> String {
    match abort {
        Some(e) => format!(" (abort also failed: {e})"),
        None => String::new(),
    }
}

impl PipelineError {
    /// Whether this failure stems from the shared cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        match self {
            PipelineError::Cancelled { .. } => true,
            PipelineError::Aborted { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
