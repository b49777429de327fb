//! Task delivery with per-worker retries and cross-worker failover.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use common::protocol::{MapTaskRequest, MapTaskResponse, ReduceTaskRequest, ReduceTaskResponse};

use crate::error::{DispatchError, TransportError};
use crate::worker_info::{WorkType, WorkerInfo, WorkerPool};
use crate::worker_registry::WorkerRegistry;

/// A payload that can be sent to a worker, together with the checks its
/// reply has to pass.
pub trait Task: Serialize + Send + Sync {
    type Output: DeserializeOwned + Send;

    /// Which pool and endpoint the task belongs to.
    const KIND: WorkType;

    fn task_id(&self) -> &str;

    /// Reject replies that decoded fine but do not answer this task.
    fn validate(&self, output: &Self::Output) -> Result<(), String>;
}

impl Task for MapTaskRequest {
    type Output = MapTaskResponse;
    const KIND: WorkType = WorkType::Map;

    fn task_id(&self) -> &str {
        &self.split_id
    }

    fn validate(&self, output: &MapTaskResponse) -> Result<(), String> {
        if output.job_id != self.job_id || output.split_id != self.split_id {
            return Err(format!(
                "expected {}/{}, got {}/{}",
                self.job_id, self.split_id, output.job_id, output.split_id
            ));
        }
        Ok(())
    }
}

impl Task for ReduceTaskRequest {
    type Output = ReduceTaskResponse;
    const KIND: WorkType = WorkType::Reduce;

    fn task_id(&self) -> &str {
        &self.reduce_id
    }

    fn validate(&self, output: &ReduceTaskResponse) -> Result<(), String> {
        if output.job_id != self.job_id || output.reduce_id != self.reduce_id {
            return Err(format!(
                "expected {}/{}, got {}/{}",
                self.job_id, self.reduce_id, output.job_id, output.reduce_id
            ));
        }
        // Every key reduced exactly once: same key set both ways.
        if output.results.len() != self.data.len()
            || !self.data.keys().all(|key| output.results.contains_key(key))
        {
            return Err(format!(
                "{} keys sent but {} reduced, or key sets differ",
                self.data.len(),
                output.results.len()
            ));
        }
        Ok(())
    }
}

/// How hard to try a single worker before moving on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts against one worker, including the first.
    pub attempts_per_worker: u32,

    /// Bound on one delivery attempt.
    pub attempt_timeout: Duration,

    /// Pause after the first failed attempt; doubles after each further one.
    pub backoff: Duration,

    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts_per_worker: 3,
            attempt_timeout: Duration::from_secs(10),
            backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Pause before retry number `retry` (1-based) against the same worker.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

/// Sends tasks to the least-loaded worker that has not failed them yet.
pub struct Dispatcher {
    registry: Arc<WorkerRegistry>,
    policy: RetryPolicy,
}

impl Dispatcher {
    pub fn new(registry: Arc<WorkerRegistry>, policy: RetryPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn registry(&self) -> &Arc<WorkerRegistry> {
        &self.registry
    }

    /// Deliver `task` to a worker of `pool` and return its validated reply.
    ///
    /// Fails with [`DispatchError::WorkerUnavailable`] only after every
    /// worker of the pool has used up its attempts.
    pub async fn dispatch<T: Task>(
        &self,
        task: &T,
        pool: &WorkerPool,
    ) -> Result<T::Output, DispatchError> {
        let task_id = task.task_id();
        let payload = serde_json::to_value(task).map_err(|e| DispatchError::Encode {
            task_id: task_id.to_string(),
            reason: e.to_string(),
        })?;

        let mut tried = HashSet::new();
        let mut attempts = 0;
        let mut last_error = String::from("no worker available");

        while let Some(worker) = self.registry.least_loaded_untried(pool, &tried).await {
            match self.try_worker(task, worker, &payload, &mut attempts).await {
                Ok(output) => {
                    debug!(task_id, worker = %worker, "task delivered");
                    return Ok(output);
                }
                Err(e) => {
                    tried.insert(worker.id);
                    warn!(
                        task_id,
                        worker = %worker,
                        remaining = pool.len() - tried.len(),
                        "worker gave up on task, failing over: {}",
                        e
                    );
                    last_error = format!("{}: {}", worker, e);
                }
            }
        }

        warn!(task_id, kind = %pool.kind(), attempts, "worker pool exhausted");
        Err(DispatchError::WorkerUnavailable {
            kind: pool.kind(),
            task_id: task_id.to_string(),
            workers: tried.len(),
            attempts,
            last_error,
        })
    }

    /// Up to `attempts_per_worker` deliveries to one worker, with backoff.
    async fn try_worker<T: Task>(
        &self,
        task: &T,
        worker: &WorkerInfo,
        payload: &Value,
        attempts: &mut u32,
    ) -> Result<T::Output, TransportError> {
        let max_attempts = self.policy.attempts_per_worker.max(1);
        let mut attempt = 1;

        loop {
            *attempts += 1;
            match self.attempt(task, worker, payload).await {
                Ok(output) => return Ok(output),
                Err(e) if attempt >= max_attempts => return Err(e),
                Err(e) => {
                    let pause = self.policy.backoff_for(attempt);
                    debug!(
                        task_id = task.task_id(),
                        worker = %worker,
                        attempt,
                        ?pause,
                        "attempt failed: {}",
                        e
                    );
                    tokio::time::sleep(pause).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt<T: Task>(
        &self,
        task: &T,
        worker: &WorkerInfo,
        payload: &Value,
    ) -> Result<T::Output, TransportError> {
        let timeout = self.policy.attempt_timeout;
        let send = self
            .registry
            .transport()
            .send_task(worker, T::KIND.task_endpoint(), payload, timeout);

        let raw = tokio::time::timeout(timeout, send)
            .await
            .map_err(|_| TransportError::Timeout(timeout))??;

        let output: T::Output =
            serde_json::from_value(raw).map_err(|e| TransportError::Malformed(e.to_string()))?;
        task.validate(&output).map_err(TransportError::Malformed)?;
        Ok(output)
    }
}
