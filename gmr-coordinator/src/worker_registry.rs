use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::debug;

use common::protocol::WorkerStatus;

use crate::transport::WorkerTransport;
use crate::worker_info::*;

/// Registry for workers.
///
/// Built once at startup from configuration. It never changes afterwards
/// and holds no per-worker state beyond the addresses; loads are probed
/// fresh on every selection.
pub struct WorkerRegistry {
    /// Workers accepting `map_task`.
    map_pool: WorkerPool,

    /// Workers accepting `reduce_task`.
    reduce_pool: WorkerPool,

    transport: Arc<dyn WorkerTransport>,

    /// Upper bound for a single load probe.
    probe_timeout: Duration,
}

impl WorkerRegistry {
    pub fn new(
        map_pool: WorkerPool,
        reduce_pool: WorkerPool,
        transport: Arc<dyn WorkerTransport>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            map_pool,
            reduce_pool,
            transport,
            probe_timeout,
        }
    }

    pub fn pool(&self, kind: WorkType) -> &WorkerPool {
        match kind {
            WorkType::Map => &self.map_pool,
            WorkType::Reduce => &self.reduce_pool,
        }
    }

    pub fn transport(&self) -> &Arc<dyn WorkerTransport> {
        &self.transport
    }

    /// Probe every worker concurrently. A worker that errors or misses the
    /// probe timeout reports `None`.
    pub async fn probe(&self, workers: &[&WorkerInfo]) -> Vec<Option<u32>> {
        let probes = workers.iter().map(|worker| async move {
            let probe = self.transport.probe_load(worker, self.probe_timeout);
            match tokio::time::timeout(self.probe_timeout, probe).await {
                Ok(Ok(report)) => Some(report.tasks_in_progress),
                Ok(Err(e)) => {
                    debug!(worker = %worker, "load probe failed: {}", e);
                    None
                }
                Err(_) => {
                    debug!(worker = %worker, "load probe timed out");
                    None
                }
            }
        });
        join_all(probes).await
    }

    /// The least-loaded worker of `pool`, or the first worker if none answers.
    ///
    /// Only returns `None` for an empty pool.
    pub async fn least_loaded<'p>(&self, pool: &'p WorkerPool) -> Option<&'p WorkerInfo> {
        self.least_loaded_untried(pool, &HashSet::new()).await
    }

    /// Like [`least_loaded`](Self::least_loaded), restricted to workers not
    /// in `tried`. Returns `None` once every worker has been tried.
    pub async fn least_loaded_untried<'p>(
        &self,
        pool: &'p WorkerPool,
        tried: &HashSet<WorkerID>,
    ) -> Option<&'p WorkerInfo> {
        let candidates: Vec<&WorkerInfo> = pool
            .workers()
            .iter()
            .filter(|worker| !tried.contains(&worker.id))
            .collect();

        if candidates.len() <= 1 {
            // Nothing to compare; skip the probe round-trip.
            return candidates.first().copied();
        }

        let loads = self.probe(&candidates).await;
        debug!(pool = %pool.kind(), ?loads, "probed worker loads");
        select_least_loaded(&candidates, &loads)
    }

    /// Live load of every worker in the pool of `kind`.
    pub async fn pool_status(&self, kind: WorkType) -> Vec<WorkerStatus> {
        let workers: Vec<&WorkerInfo> = self.pool(kind).workers().iter().collect();
        let loads = self.probe(&workers).await;

        workers
            .into_iter()
            .zip(loads)
            .map(|(worker, load)| WorkerStatus {
                addr: worker.to_string(),
                tasks_in_progress: load,
            })
            .collect()
    }
}

/// Pick the candidate with the lowest reported load.
///
/// `loads[i]` belongs to `candidates[i]`; `None` means the worker did not
/// answer and is not considered. Ties go to the earliest candidate. If no
/// candidate answered, the first candidate is returned so that a dispatch
/// attempt is always possible.
pub fn select_least_loaded<'w>(
    candidates: &[&'w WorkerInfo],
    loads: &[Option<u32>],
) -> Option<&'w WorkerInfo> {
    candidates
        .iter()
        .zip(loads)
        .filter_map(|(worker, load)| load.map(|load| (load, *worker)))
        // min_by_key keeps the first of equal minima.
        .min_by_key(|(load, _)| *load)
        .map(|(_, worker)| worker)
        .or_else(|| candidates.first().copied())
}
