//! Drives one job from `RUNNING` to a terminal state.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info};

use common::protocol::{JobResult, MapTaskRequest, ReduceTaskRequest};
use common::JobId;

use crate::dispatcher::Dispatcher;
use crate::error::JobError;
use crate::jobs::{JobSpec, JobStore};
use crate::shuffle::{self, IntermediateMap, ReducePartition};
use crate::splitter::{self, Split};
use crate::worker_info::WorkType;

pub struct Orchestrator {
    store: Arc<JobStore>,
    dispatcher: Arc<Dispatcher>,

    /// Upper bound on concurrent dispatches within one phase of one job.
    max_in_flight: usize,
}

impl Orchestrator {
    pub fn new(store: Arc<JobStore>, dispatcher: Arc<Dispatcher>, max_in_flight: usize) -> Self {
        Self {
            store,
            dispatcher,
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Run a queued job and record how it ended. Never returns an error:
    /// every outcome lands in the store.
    pub async fn run(&self, job_id: JobId) {
        let outcome = match self.execute(job_id).await {
            Ok(result) => self.store.complete(&job_id, result),
            Err(e) => {
                error!(job_id = %job_id, "job aborted: {}", e);
                self.store.fail(&job_id, e.to_string())
            }
        };

        if let Err(e) = outcome {
            error!(job_id = %job_id, "could not record job outcome: {}", e);
        }
    }

    /// Split, map, shuffle and reduce. Partial results are dropped on error.
    pub async fn execute(&self, job_id: JobId) -> Result<JobResult, JobError> {
        let spec = self.store.start(&job_id)?;

        let splits = splitter::split(&spec.data, spec.split_size)?;
        info!(job_id = %job_id, splits = splits.len(), "map phase");
        let intermediate = self.process_map_phase(job_id, &spec, splits).await?;

        let partitions = shuffle::partition(intermediate, spec.num_reducers)?;
        info!(
            job_id = %job_id,
            partitions = partitions.len(),
            reducers = spec.num_reducers,
            "reduce phase"
        );
        self.process_reduce_phase(job_id, &spec, partitions).await
    }

    async fn process_map_phase(
        &self,
        job_id: JobId,
        spec: &JobSpec,
        splits: Vec<Split>,
    ) -> Result<IntermediateMap, JobError> {
        let pool = self.dispatcher.registry().pool(WorkType::Map);
        let total = splits.len();
        self.store
            .update_progress(&job_id, |p| p.splits_total = total)?;

        let tasks = splits.into_iter().map(|split| MapTaskRequest {
            job_id,
            split_id: split.split_id(),
            data: split.text,
            map_logic: spec.map_logic.clone(),
        });

        let mut completed = stream::iter(tasks)
            .map(|task| async move { self.dispatcher.dispatch(&task, pool).await })
            .buffer_unordered(self.max_in_flight);

        let mut intermediate = IntermediateMap::new();
        while let Some(reply) = completed.next().await {
            let reply = reply.map_err(|source| JobError::Dispatch {
                stage: WorkType::Map,
                source,
            })?;
            debug!(job_id = %job_id, split_id = %reply.split_id, keys = reply.results.len(), "split mapped");
            shuffle::fold(&mut intermediate, reply.results);
            self.store.update_progress(&job_id, |p| p.splits_done += 1)?;
        }
        Ok(intermediate)
    }

    async fn process_reduce_phase(
        &self,
        job_id: JobId,
        spec: &JobSpec,
        partitions: Vec<ReducePartition>,
    ) -> Result<JobResult, JobError> {
        let pool = self.dispatcher.registry().pool(WorkType::Reduce);
        let total = partitions.len();
        self.store
            .update_progress(&job_id, |p| p.partitions_total = total)?;

        let tasks = partitions.into_iter().map(|partition| ReduceTaskRequest {
            job_id,
            reduce_id: partition.reduce_id(),
            data: partition.entries,
            reduce_logic: spec.reduce_logic.clone(),
        });

        let mut completed = stream::iter(tasks)
            .map(|task| async move { self.dispatcher.dispatch(&task, pool).await })
            .buffer_unordered(self.max_in_flight);

        let mut result = JobResult::new();
        while let Some(reply) = completed.next().await {
            let reply = reply.map_err(|source| JobError::Dispatch {
                stage: WorkType::Reduce,
                source,
            })?;
            debug!(job_id = %job_id, reduce_id = %reply.reduce_id, keys = reply.results.len(), "partition reduced");
            // Partitions own disjoint keys, so nothing is overwritten.
            result.extend(reply.results);
            self.store
                .update_progress(&job_id, |p| p.partitions_done += 1)?;
        }
        Ok(result)
    }
}
