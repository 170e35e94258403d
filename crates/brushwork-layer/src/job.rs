//! Prerequisite work that must finish before any brush draws.

use std::fmt;
use std::future::Future;

use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle};

use crate::error::LayerError;

type JobResult = Result<(), LayerError>;

enum Pending {
    /// Already running on the tokio runtime the job was queued from.
    Spawned(JoinHandle<JobResult>),
    /// Queued outside a runtime; starts when the queue settles.
    Deferred(BoxFuture<'static, JobResult>),
}

/// An ordered set of in-flight prerequisite jobs.
///
/// Jobs queued from inside a tokio runtime start immediately so their I/O
/// overlaps with the caller building the rest of the layer.
#[derive(Default)]
pub struct JobQueue {
    pending: Vec<Pending>,
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueue")
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    pub fn push<F>(&mut self, job: F)
    where
        F: Future<Output = JobResult> + Send + 'static,
    {
        let pending = match Handle::try_current() {
            Ok(handle) => Pending::Spawned(handle.spawn(job)),
            Err(_) => Pending::Deferred(job.boxed()),
        };
        self.pending.push(pending);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Wait for every queued job. The first failure wins and every job still
    /// running is aborted. Returns the number of jobs that settled.
    pub async fn settle(&mut self) -> Result<usize, LayerError> {
        let pending = std::mem::take(&mut self.pending);
        let count = pending.len();

        // Aborts stragglers when a job fails or the settle itself is dropped.
        let mut running = AbortOnDrop(Vec::new());
        let joins: Vec<BoxFuture<'static, JobResult>> = pending
            .into_iter()
            .map(|job| match job {
                Pending::Spawned(handle) => {
                    running.0.push(handle.abort_handle());
                    async move { handle.await.map_err(LayerError::prerequisite)? }.boxed()
                }
                Pending::Deferred(future) => future,
            })
            .collect();

        try_join_all(joins).await?;
        Ok(count)
    }
}

struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

impl Drop for JobQueue {
    fn drop(&mut self) {
        for job in &self.pending {
            if let Pending::Spawned(handle) = job {
                handle.abort();
            }
        }
    }
}
