//! Binds a transform and a collector into the routine run by pool workers.
//!
//! For every task a worker:
//! 1. builds a [`TaskContext`] (worker + task identity),
//! 2. acquires a collector session, abandoning the task if that fails,
//! 3. streams the input through the transform into the session on the
//!    blocking thread pool,
//! 4. aborts on transform failure, commits on success.
//!
//! Failures go to the error sink, tagged with worker and task, and nowhere
//! else. They never stop the pool or touch other tasks.

use std::any::Any;
use std::io::Read;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::collector::{Collector, SessionGuard};
use crate::config::PoolConfig;
use crate::error::{PipelineError, PipelineResult, PoolError, SubmitError};
use crate::pool::{Pool, WorkerId};
use crate::types::{ErrorRecord, ImageTask, ProcessingStats, TaskContext};

use super::transform::Transform;

/// Receives one [`ErrorRecord`] per failed task. Must not block.
pub type ErrorSink = Arc<dyn Fn(ErrorRecord) + Send + Sync>;

/// Default sink: log through `tracing`.
pub fn log_error_sink() -> ErrorSink {
    Arc::new(|record: ErrorRecord| {
        tracing::error!(
            worker = %record.worker,
            task = %record.task,
            error = %record.error,
            "Image pool error has occurred"
        );
    })
}

/// An unstarted pipeline: a transform, a collector and an error sink.
pub struct ImagePipeline {
    transform: Arc<dyn Transform>,
    collector: Arc<dyn Collector>,
    sink: ErrorSink,
}

impl ImagePipeline {
    pub fn new(transform: impl Transform + 'static, collector: impl Collector + 'static) -> Self {
        Self {
            transform: Arc::new(transform),
            collector: Arc::new(collector),
            sink: log_error_sink(),
        }
    }

    /// Replace the default logging sink.
    pub fn with_error_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(ErrorRecord) + Send + Sync + 'static,
    {
        self.sink = Arc::new(sink);
        self
    }

    /// Start `workers` workers behind a channel of `capacity` tasks.
    pub fn spawn(
        self,
        workers: usize,
        capacity: usize,
        cancel: CancellationToken,
    ) -> Result<ImagePool, PoolError> {
        let counters = Arc::new(Counters::new());
        let binder = Arc::new(Binder {
            transform: self.transform,
            collector: self.collector,
            sink: self.sink,
            cancel: cancel.clone(),
            counters: counters.clone(),
        });

        let pool = Pool::new(workers, capacity, cancel, move |worker, task| {
            let binder = binder.clone();
            async move { binder.run(worker, task).await }
        })?;

        Ok(ImagePool { pool, counters })
    }

    /// Start a pool sized from configuration.
    pub fn spawn_with_config(
        self,
        config: &PoolConfig,
        cancel: CancellationToken,
    ) -> Result<ImagePool, PoolError> {
        self.spawn(config.workers, config.effective_capacity(), cancel)
    }
}

/// A running pool of image tasks.
pub struct ImagePool {
    pool: Pool<ImageTask>,
    counters: Arc<Counters>,
}

impl ImagePool {
    /// Enqueue a task. See [`Pool::submit`].
    pub async fn submit(
        &self,
        task: ImageTask,
        cancel: &CancellationToken,
    ) -> Result<(), SubmitError> {
        self.pool.submit(task, cancel).await
    }

    /// Drain, wait for workers, report cancellation. See [`Pool::join`].
    pub async fn join(&self) -> bool {
        self.pool.join().await
    }

    pub fn stats(&self) -> ProcessingStats {
        self.counters.snapshot()
    }

    pub fn workers(&self) -> usize {
        self.pool.workers()
    }
}

struct Counters {
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    started: Instant,
}

impl Counters {
    fn new() -> Self {
        Self {
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            started: Instant::now(),
        }
    }

    fn snapshot(&self) -> ProcessingStats {
        let succeeded = self.succeeded.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let total_seconds = self.started.elapsed().as_secs_f64();
        let images_per_second = if total_seconds > 0.0 {
            (succeeded + failed) as f64 / total_seconds
        } else {
            0.0
        };
        ProcessingStats {
            succeeded,
            failed,
            images_per_second,
            total_seconds,
        }
    }
}

struct Binder {
    transform: Arc<dyn Transform>,
    collector: Arc<dyn Collector>,
    sink: ErrorSink,
    cancel: CancellationToken,
    counters: Arc<Counters>,
}

impl Binder {
    async fn run(&self, worker: WorkerId, task: ImageTask) {
        let ctx = TaskContext::new(worker, task.name, self.cancel.clone());
        let start = Instant::now();
        tracing::debug!(worker = %ctx.worker, task = %ctx.task, "Processing task");

        match self.process(&ctx, task.input).await {
            Ok(()) => {
                self.counters.succeeded.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    worker = %ctx.worker,
                    task = %ctx.task,
                    "Committed in {:?}",
                    start.elapsed()
                );
            }
            Err(error) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                self.report(ErrorRecord {
                    worker: ctx.worker,
                    task: ctx.task,
                    error,
                });
            }
        }
    }

    async fn process(&self, ctx: &TaskContext, input: Box<dyn Read + Send>) -> PipelineResult<()> {
        let session = self.collector.acquire(ctx)?;
        let mut guard = SessionGuard::new(session, ctx.task.clone());

        let transform = self.transform.clone();
        let blocking_ctx = ctx.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let mut input = input;
            let result = transform.apply(&blocking_ctx, &mut input, &mut guard);
            (guard, result)
        });

        // On panic the guard was dropped while unwinding, which released it.
        let (mut guard, result) = handle.await.map_err(|e| PipelineError::Panicked {
            task: ctx.task.clone(),
            message: if e.is_panic() {
                panic_message(e.into_panic())
            } else {
                "blocking task cancelled".to_string()
            },
        })?;

        match result {
            Ok(()) => guard.commit(),
            Err(source) => Err(PipelineError::Aborted {
                source: Box::new(source),
                abort: guard.abort().err().map(Box::new),
            }),
        }
    }

    fn report(&self, record: ErrorRecord) {
        let worker = record.worker;
        if catch_unwind(AssertUnwindSafe(|| (self.sink)(record))).is_err() {
            tracing::error!(worker = %worker, "Error sink panicked");
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{CollectorSession, MemoryCollector, ResultCollection};
    use crate::pipeline::Passthrough;
    use std::io::{self, Write};
    use std::sync::Mutex;
    use std::time::Duration;

    fn recording_sink() -> (Arc<Mutex<Vec<ErrorRecord>>>, impl Fn(ErrorRecord) + Send + Sync) {
        let records = Arc::new(Mutex::new(Vec::new()));
        let sink = records.clone();
        (records, move |record: ErrorRecord| sink.lock().unwrap().push(record))
    }

    /// Session whose commit always fails.
    struct FailingCommit;

    impl Write for FailingCommit {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CollectorSession for FailingCommit {
        fn commit(&mut self) -> PipelineResult<()> {
            Err(PipelineError::Collector {
                task: "?".into(),
                message: "read-only".into(),
            })
        }
        fn abort(&mut self) -> PipelineResult<()> {
            Ok(())
        }
        fn close(&mut self) -> PipelineResult<()> {
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_passthrough_commits_every_task() {
        let collection = ResultCollection::new();
        let (records, sink) = recording_sink();
        let pool = ImagePipeline::new(Passthrough, MemoryCollector::new(collection.clone()))
            .with_error_sink(sink)
            .spawn(3, 2, CancellationToken::new())
            .unwrap();

        let caller = CancellationToken::new();
        for i in 0..10 {
            let task = ImageTask::from_bytes(format!("t{i}"), vec![i as u8; 4]);
            pool.submit(task, &caller).await.unwrap();
        }
        assert!(!pool.join().await);

        assert_eq!(collection.len(), 10);
        assert_eq!(collection.get("t7"), Some(vec![7u8; 4]));
        assert!(records.lock().unwrap().is_empty());
        assert_eq!(pool.stats().succeeded, 10);
    }

    #[tokio::test]
    async fn test_collector_failure_skips_transform() {
        let transformed = Arc::new(AtomicUsize::new(0));
        let counter = transformed.clone();
        let transform = move |_: &TaskContext,
                              _: &mut dyn Read,
                              _: &mut dyn Write|
              -> PipelineResult<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        let collector = |ctx: &TaskContext| -> PipelineResult<Box<dyn CollectorSession>> {
            Err(PipelineError::Collector {
                task: ctx.task.clone(),
                message: "quota".into(),
            })
        };
        let (records, sink) = recording_sink();
        let pool = ImagePipeline::new(transform, collector)
            .with_error_sink(sink)
            .spawn(1, 1, CancellationToken::new())
            .unwrap();

        pool.submit(ImageTask::from_bytes("x", vec![1]), &CancellationToken::new())
            .await
            .unwrap();
        pool.join().await;

        assert_eq!(transformed.load(Ordering::SeqCst), 0);
        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].task, "x");
        assert!(matches!(records[0].error, PipelineError::Collector { .. }));
    }

    #[tokio::test]
    async fn test_failed_transform_aborts_and_siblings_commit() {
        let transform = |ctx: &TaskContext,
                         input: &mut dyn Read,
                         output: &mut dyn Write|
         -> PipelineResult<()> {
            let mut bytes = Vec::new();
            input.read_to_end(&mut bytes)?;
            output.write_all(&bytes)?;
            if ctx.task == "bad" {
                return Err(PipelineError::Decode {
                    task: ctx.task.clone(),
                    message: "corrupt".into(),
                });
            }
            Ok(())
        };
        let collection = ResultCollection::new();
        let (records, sink) = recording_sink();
        let pool = ImagePipeline::new(transform, MemoryCollector::new(collection.clone()))
            .with_error_sink(sink)
            .spawn(2, 2, CancellationToken::new())
            .unwrap();

        let caller = CancellationToken::new();
        for name in ["a", "bad", "b"] {
            pool.submit(ImageTask::from_bytes(name, b"data".to_vec()), &caller)
                .await
                .unwrap();
        }
        assert!(!pool.join().await);

        assert_eq!(collection.names(), vec!["a", "b"]);
        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].task, "bad");
        assert!(matches!(records[0].cause(), PipelineError::Decode { .. }));
        assert_eq!(pool.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_commit_failure_is_reported() {
        let collector = |_: &TaskContext| -> PipelineResult<Box<dyn CollectorSession>> {
            Ok(Box::new(FailingCommit))
        };
        let (records, sink) = recording_sink();
        let pool = ImagePipeline::new(Passthrough, collector)
            .with_error_sink(sink)
            .spawn(1, 1, CancellationToken::new())
            .unwrap();

        pool.submit(ImageTask::from_bytes("ro", vec![1]), &CancellationToken::new())
            .await
            .unwrap();
        pool.join().await;

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert!(matches!(records[0].error, PipelineError::Collector { .. }));
    }

    #[tokio::test]
    async fn test_panicking_transform_is_isolated() {
        let transform = |ctx: &TaskContext,
                         _: &mut dyn Read,
                         output: &mut dyn Write|
         -> PipelineResult<()> {
            output.write_all(b"partial")?;
            if ctx.task == "boom" {
                panic!("transform exploded");
            }
            Ok(())
        };
        let collection = ResultCollection::new();
        let (records, sink) = recording_sink();
        let pool = ImagePipeline::new(transform, MemoryCollector::new(collection.clone()))
            .with_error_sink(sink)
            .spawn(1, 4, CancellationToken::new())
            .unwrap();

        let caller = CancellationToken::new();
        for name in ["boom", "fine"] {
            pool.submit(ImageTask::from_bytes(name, vec![]), &caller)
                .await
                .unwrap();
        }
        assert!(!pool.join().await);

        assert_eq!(collection.names(), vec!["fine"]);
        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        match &records[0].error {
            PipelineError::Panicked { task, message } => {
                assert_eq!(task, "boom");
                assert!(message.contains("exploded"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_panicking_sink_does_not_stop_pool() {
        let transform = |ctx: &TaskContext,
                         _: &mut dyn Read,
                         _: &mut dyn Write|
         -> PipelineResult<()> {
            Err(PipelineError::Decode {
                task: ctx.task.clone(),
                message: "nope".into(),
            })
        };
        let pool = ImagePipeline::new(transform, MemoryCollector::default())
            .with_error_sink(|_| panic!("sink bug"))
            .spawn(1, 1, CancellationToken::new())
            .unwrap();

        let caller = CancellationToken::new();
        for name in ["a", "b", "c"] {
            pool.submit(ImageTask::from_bytes(name, vec![]), &caller)
                .await
                .unwrap();
        }
        let joined = tokio::time::timeout(Duration::from_secs(5), pool.join()).await;
        assert_eq!(joined.ok(), Some(false));
        assert_eq!(pool.stats().failed, 3);
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_message(Box::new(42)), "unknown panic");
    }
}
