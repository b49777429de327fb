use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};
use uuid::Uuid;

use common::protocol::{
    JobListResponse, JobResultResponse, JobStatusResponse, JobSummary, PoolStatusResponse,
    SubmitJobRequest,
};
use common::{JobId, JobState};

use crate::config::CoordinatorConfig;
use crate::dispatcher::Dispatcher;
use crate::error::SubmitError;
use crate::jobs::{JobSpec, JobStore};
use crate::orchestrator::Orchestrator;
use crate::transport::WorkerTransport;
use crate::worker_info::WorkType;
use crate::worker_registry::WorkerRegistry;

/// The coordinator: accepts jobs, runs them in the background and answers
/// queries about them.
pub struct Coordinator {
    store: Arc<JobStore>,
    orchestrator: Arc<Orchestrator>,
    registry: Arc<WorkerRegistry>,

    /// One task per job orchestration.
    tracker: TaskTracker,
}

impl Coordinator {
    pub fn new(config: &CoordinatorConfig, transport: Arc<dyn WorkerTransport>) -> Self {
        let registry = Arc::new(WorkerRegistry::new(
            config.map_pool.clone(),
            config.reduce_pool.clone(),
            transport,
            config.probe_timeout,
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            config.retry.clone(),
        ));
        let store = Arc::new(JobStore::new());
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::clone(&store),
            dispatcher,
            config.max_in_flight_tasks,
        ));

        Self {
            store,
            orchestrator,
            registry,
            tracker: TaskTracker::new(),
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<WorkerRegistry> {
        &self.registry
    }

    /// Validate and queue a job, then start it in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, request: SubmitJobRequest) -> Result<JobId, SubmitError> {
        let spec = JobSpec::from_request(request)?;
        let job_id = self.store.create(spec);

        let orchestrator = Arc::clone(&self.orchestrator);
        let store = Arc::clone(&self.store);
        self.tracker.spawn(async move {
            // Run on its own task so a panic surfaces here as a JoinError.
            let run = tokio::spawn(async move { orchestrator.run(job_id).await });
            if let Err(e) = run.await {
                error!(job_id = %job_id, "orchestration panicked: {}", e);
                if let Err(e) = store.fail(&job_id, format!("internal error: {}", e)) {
                    warn!(job_id = %job_id, "could not mark job failed: {}", e);
                }
            }
        });

        Ok(job_id)
    }

    pub fn job_status(&self, job_id: &str) -> JobStatusResponse {
        let Some(job) = parse_job_id(job_id).and_then(|id| self.store.get(&id)) else {
            return JobStatusResponse {
                job_id: job_id.to_string(),
                state: JobState::NotFound,
                progress: None,
                error: None,
            };
        };

        JobStatusResponse {
            job_id: job_id.to_string(),
            state: job.state(),
            progress: Some(job.progress()),
            error: job.error().map(str::to_string),
        }
    }

    pub fn job_result(&self, job_id: &str) -> JobResultResponse {
        let Some(job) = parse_job_id(job_id).and_then(|id| self.store.get(&id)) else {
            return JobResultResponse {
                job_id: job_id.to_string(),
                state: JobState::NotFound,
                result: None,
                message: Some(format!("job {} not found", job_id)),
            };
        };

        let (result, message) = match (job.state(), job.result()) {
            (JobState::Done, Some(result)) => (Some(result.as_ref().clone()), None),
            (JobState::Failed, _) => (
                None,
                Some(format!(
                    "job failed: {}",
                    job.error().unwrap_or("unknown error")
                )),
            ),
            (state, _) => (None, Some(format!("job is {}, result not ready", state))),
        };

        JobResultResponse {
            job_id: job_id.to_string(),
            state: job.state(),
            result,
            message,
        }
    }

    pub fn jobs(&self) -> JobListResponse {
        JobListResponse {
            jobs: self
                .store
                .list()
                .into_iter()
                .map(|job| JobSummary {
                    job_id: job.id(),
                    state: job.state(),
                    progress: job.progress(),
                })
                .collect(),
        }
    }

    /// Orchestrations that have not finished yet.
    pub fn jobs_in_flight(&self) -> usize {
        self.tracker.len()
    }

    pub async fn pool_status(&self) -> PoolStatusResponse {
        let (map_workers, reduce_workers) = tokio::join!(
            self.registry.pool_status(WorkType::Map),
            self.registry.pool_status(WorkType::Reduce)
        );
        PoolStatusResponse {
            map_workers,
            reduce_workers,
            jobs_in_flight: self.jobs_in_flight(),
        }
    }

    /// Stop accepting orchestrations and report what is being dropped.
    pub fn shutdown(&self) {
        self.tracker.close();
        let in_flight = self.tracker.len();
        if in_flight > 0 {
            warn!(in_flight, "shutting down with jobs still running");
        } else {
            info!("shutting down, no jobs in flight");
        }
    }
}

fn parse_job_id(raw: &str) -> Option<JobId> {
    Uuid::parse_str(raw.trim()).ok()
}
