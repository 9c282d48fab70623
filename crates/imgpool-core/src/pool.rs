//! Bounded, cancellable worker pool.
//!
//! A fixed number of tokio tasks pull work items from one bounded
//! `async-channel`. Its `Receiver` is `Clone`, so every worker owns a handle
//! and no worker holds a lock while waiting for the next item.
//!
//! Shutdown comes in two flavours:
//! - [`Pool::join`] closes the channel; workers drain what was already
//!   admitted and exit.
//! - The shared [`CancellationToken`] stops workers before they start their
//!   next item. Queued items are dropped; in-flight routines are expected to
//!   observe the same token and return early.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::{PoolError, SubmitError};

/// Identity of a worker inside one pool, `0..workers`.
///
/// Only used for attribution in logs and error records, never for routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub usize);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A pool of workers sharing one bounded task channel.
///
/// Workers are spawned eagerly in [`Pool::new`] and run until the channel is
/// closed and drained, or the shared cancellation token fires.
pub struct Pool<T> {
    sender: async_channel::Sender<T>,
    tracker: TaskTracker,
    cancel: CancellationToken,
    workers: usize,
    outcome: OnceCell<bool>,
}

impl<T: Send + 'static> Pool<T> {
    /// Spawn `workers` workers that each await `routine(worker, task)` for
    /// every task they dequeue.
    ///
    /// A slow routine only stalls the worker running it. The routine has no
    /// error channel back to the pool: per-task failure handling is its own
    /// business.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<F, Fut>(
        workers: usize,
        capacity: usize,
        cancel: CancellationToken,
        routine: F,
    ) -> Result<Self, PoolError>
    where
        F: Fn(WorkerId, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if workers == 0 {
            return Err(PoolError::InvalidWorkers);
        }
        if capacity == 0 {
            return Err(PoolError::InvalidCapacity);
        }

        let (sender, receiver) = async_channel::bounded::<T>(capacity);
        let routine = Arc::new(routine);
        let tracker = TaskTracker::new();

        for index in 0..workers {
            tracker.spawn(worker_loop(
                WorkerId(index),
                receiver.clone(),
                routine.clone(),
                cancel.clone(),
            ));
        }
        // The worker set is fixed; `wait()` resolves once all of them exit.
        tracker.close();

        tracing::debug!(workers, capacity, "Pool started");

        Ok(Self {
            sender,
            tracker,
            cancel,
            workers,
            outcome: OnceCell::new(),
        })
    }

    /// Enqueue a task, waiting for channel capacity if needed.
    ///
    /// Returns as soon as the first of these happens: the task is admitted,
    /// `cancel` fires, the pool's shared token fires, or the pool starts
    /// closing. A rejected task is dropped and pool state is unchanged.
    pub async fn submit(&self, task: T, cancel: &CancellationToken) -> Result<(), SubmitError> {
        if self.sender.is_closed() {
            return Err(SubmitError::Closed);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SubmitError::Cancelled),
            _ = self.cancel.cancelled() => Err(SubmitError::Cancelled),
            sent = self.sender.send(task) => sent.map_err(|_| SubmitError::Closed),
        }
    }

    /// Stop accepting submissions, wait for every worker to exit, and report
    /// whether the shared cancellation token fired.
    ///
    /// Idempotent: later calls wait for the first one and return its result.
    pub async fn join(&self) -> bool {
        *self
            .outcome
            .get_or_init(|| async {
                // Wakes blocked submitters; receivers still drain what is queued.
                self.sender.close();
                self.tracker.wait().await;

                let cancelled = self.cancel.is_cancelled();
                tracing::debug!(workers = self.workers, cancelled, "Pool joined");
                cancelled
            })
            .await
    }
}

impl<T> Pool<T> {
    /// Number of workers spawned at creation.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Tasks admitted but not yet picked up by a worker.
    pub fn queued(&self) -> usize {
        self.sender.len()
    }

    /// Whether the pool stopped accepting submissions.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// The shared cancellation token observed by workers.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl<T> Drop for Pool<T> {
    fn drop(&mut self) {
        // An unjoined pool lets its workers drain and exit in the background.
        self.sender.close();
    }
}

async fn worker_loop<T, F, Fut>(
    worker: WorkerId,
    receiver: async_channel::Receiver<T>,
    routine: Arc<F>,
    cancel: CancellationToken,
) where
    F: Fn(WorkerId, T) -> Fut,
    Fut: Future<Output = ()>,
{
    tracing::trace!(%worker, "Worker started");

    loop {
        let task = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            received = receiver.recv() => match received {
                Ok(task) => task,
                Err(_) => break,
            },
        };

        // A task dequeued after cancellation is dropped without running.
        if cancel.is_cancelled() {
            break;
        }

        routine(worker, task).await;
    }

    tracing::trace!(%worker, "Worker exiting");
}
