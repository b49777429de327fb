use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

use common::protocol::{JobResult, SubmitJobRequest};
use common::{JobId, JobProgress, JobState, LogicDescriptor};

use crate::error::{StoreError, SubmitError};

/// Validated job parameters. Immutable once the job exists.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    /// The raw input text.
    pub data: String,

    /// Tokens per map split.
    pub split_size: usize,

    /// Number of reduce partitions.
    pub num_reducers: usize,

    /// Forwarded to map workers untouched.
    pub map_logic: LogicDescriptor,

    /// Forwarded to reduce workers untouched.
    pub reduce_logic: LogicDescriptor,
}

impl JobSpec {
    /// Generate a job spec from a submission, rejecting unusable sizes.
    pub fn from_request(request: SubmitJobRequest) -> Result<Self, SubmitError> {
        let split_size = usize::try_from(request.split_size)
            .ok()
            .filter(|size| *size > 0)
            .ok_or(SubmitError::InvalidSplitSize(request.split_size))?;
        let num_reducers = usize::try_from(request.num_reducers)
            .ok()
            .filter(|n| *n > 0)
            .ok_or(SubmitError::InvalidReducerCount(request.num_reducers))?;

        Ok(Self {
            data: request.data,
            split_size,
            num_reducers,
            map_logic: request.map_logic,
            reduce_logic: request.reduce_logic,
        })
    }
}

/// A job context.
#[derive(Debug, Clone)]
pub struct Job {
    id: JobId,

    /// Submission sequence number within the store.
    seq: u64,

    spec: Arc<JobSpec>,
    state: JobState,
    progress: JobProgress,

    /// Present only in `DONE`.
    result: Option<Arc<JobResult>>,

    /// Present only in `FAILED`.
    error: Option<String>,

    submitted_at: Instant,
    finished_at: Option<Instant>,
}

impl Job {
    fn new(id: JobId, seq: u64, spec: JobSpec) -> Self {
        Self {
            id,
            seq,
            spec: Arc::new(spec),
            state: JobState::Queued,
            progress: JobProgress::default(),
            result: None,
            error: None,
            submitted_at: Instant::now(),
            finished_at: None,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn spec(&self) -> &Arc<JobSpec> {
        &self.spec
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn progress(&self) -> JobProgress {
        self.progress
    }

    pub fn result(&self) -> Option<&Arc<JobResult>> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Time from submission to the terminal state, once there.
    pub fn elapsed(&self) -> Option<Duration> {
        self.finished_at
            .map(|finished| finished.duration_since(self.submitted_at))
    }

    fn transition(&mut self, to: JobState) -> Result<(), StoreError> {
        let legal = matches!(
            (self.state, to),
            (JobState::Queued, JobState::Running)
                | (JobState::Running, JobState::Done)
                | (JobState::Queued, JobState::Failed)
                | (JobState::Running, JobState::Failed)
        );
        if !legal {
            return Err(StoreError::IllegalTransition {
                job_id: self.id,
                from: self.state,
                to,
            });
        }

        self.state = to;
        if to.is_terminal() {
            self.finished_at = Some(Instant::now());
        }
        Ok(())
    }
}

/// Every job the coordinator has accepted, keyed by id.
///
/// Each job lives in one map entry, so a state change and the result or
/// error that comes with it are written together.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: DashMap<JobId, Job>,
    next_seq: AtomicU64,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job in `QUEUED` and return its id.
    pub fn create(&self, spec: JobSpec) -> JobId {
        let id = Uuid::new_v4();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.jobs.insert(id, Job::new(id, seq, spec));
        info!(job_id = %id, "job queued");
        id
    }

    pub fn state(&self, id: &JobId) -> JobState {
        self.jobs
            .get(id)
            .map(|job| job.state)
            .unwrap_or(JobState::NotFound)
    }

    /// A snapshot of the job.
    pub fn get(&self, id: &JobId) -> Option<Job> {
        self.jobs.get(id).map(|job| job.clone())
    }

    /// Snapshots of every job, oldest submission first.
    pub fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.iter().map(|entry| entry.value().clone()).collect();
        jobs.sort_by_key(|job| job.seq);
        jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// `QUEUED -> RUNNING`. Returns the spec to execute.
    pub fn start(&self, id: &JobId) -> Result<Arc<JobSpec>, StoreError> {
        let mut job = self.jobs.get_mut(id).ok_or(StoreError::NotFound(*id))?;
        job.transition(JobState::Running)?;
        info!(job_id = %id, "job running");
        Ok(Arc::clone(&job.spec))
    }

    /// Apply `update` to the progress of a `RUNNING` job.
    pub fn update_progress<F>(&self, id: &JobId, update: F) -> Result<JobProgress, StoreError>
    where
        F: FnOnce(&mut JobProgress),
    {
        let mut job = self.jobs.get_mut(id).ok_or(StoreError::NotFound(*id))?;
        if job.state != JobState::Running {
            return Err(StoreError::IllegalTransition {
                job_id: *id,
                from: job.state,
                to: JobState::Running,
            });
        }
        update(&mut job.progress);
        Ok(job.progress)
    }

    /// `RUNNING -> DONE`, storing the final result.
    pub fn complete(&self, id: &JobId, result: JobResult) -> Result<(), StoreError> {
        let mut job = self.jobs.get_mut(id).ok_or(StoreError::NotFound(*id))?;
        job.transition(JobState::Done)?;
        let keys = result.len();
        job.result = Some(Arc::new(result));
        info!(job_id = %id, keys, elapsed = ?job.elapsed(), "job done");
        Ok(())
    }

    /// `QUEUED | RUNNING -> FAILED`, recording why.
    pub fn fail(&self, id: &JobId, error: impl Into<String>) -> Result<(), StoreError> {
        let mut job = self.jobs.get_mut(id).ok_or(StoreError::NotFound(*id))?;
        job.transition(JobState::Failed)?;
        let error = error.into();
        info!(job_id = %id, elapsed = ?job.elapsed(), "job failed: {}", error);
        job.error = Some(error);
        Ok(())
    }
}
