//! imgpool core - bounded, cancellable worker pool for per-image pipelines.
//!
//! Every task submitted to an [`ImagePool`] runs as a small transaction:
//!
//! ```text
//! acquire collector session → transform(input → session) → commit | abort
//! ```
//!
//! Failures are routed to an error sink tagged with the worker and task
//! that produced them. A shared [`CancellationToken`](tokio_util::sync::CancellationToken)
//! stops workers between tasks and is polled by transforms mid-task.
//!
//! # Usage
//!
//! ```rust,ignore
//! use imgpool_core::{ImagePipeline, ImageTask, InvertTransform, MemoryCollector, ResultCollection};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let results = ResultCollection::new();
//!     let cancel = CancellationToken::new();
//!     let pool = ImagePipeline::new(InvertTransform::default(), MemoryCollector::new(results.clone()))
//!         .spawn(4, 4, cancel.clone())?;
//!
//!     pool.submit(ImageTask::new("a.png", std::fs::File::open("a.png")?), &cancel).await?;
//!     if !pool.join().await {
//!         println!("{} images inverted", results.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod collector;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod pool;
pub mod types;

// Re-exports for convenient access
pub use collector::{Collector, CollectorSession, FsCollector, MemoryCollector, ResultCollection};
pub use config::Config;
pub use error::{ConfigError, PipelineError, PipelineResult, PoolError, SubmitError};
pub use pipeline::{
    open_image, DiscoveredFile, ErrorSink, FileDiscovery, ImagePipeline, ImagePool,
    InvertTransform, Transform,
};
pub use pool::{Pool, WorkerId};
pub use types::{ErrorRecord, ImageTask, ProcessingStats, TaskContext};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
