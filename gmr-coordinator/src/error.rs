use std::time::Duration;

use thiserror::Error;

use common::{JobId, JobState};

use crate::worker_info::WorkType;

/// A submission the coordinator refuses to create a job for.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("split_size must be greater than 0, got {0}")]
    InvalidSplitSize(i64),

    #[error("num_reducers must be at least 1, got {0}")]
    InvalidReducerCount(i64),
}

/// One failed round-trip to one worker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("worker answered HTTP {0}")]
    Status(u16),

    #[error("unreadable response body: {0}")]
    Body(String),

    /// The worker answered, but with something that cannot be used.
    #[error("malformed worker response: {0}")]
    Malformed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error(
        "worker pool exhausted: all {workers} {kind} workers failed task {task_id} \
         after {attempts} attempts, last error: {last_error}"
    )]
    WorkerUnavailable {
        kind: WorkType,
        task_id: String,
        workers: usize,
        attempts: u32,
        last_error: String,
    },

    #[error("could not encode task {task_id}: {reason}")]
    Encode { task_id: String, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(JobId),

    #[error("job {job_id}: illegal transition {from} -> {to}")]
    IllegalTransition {
        job_id: JobId,
        from: JobState,
        to: JobState,
    },
}

/// Why a job ended up `FAILED`.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("invalid job configuration: {0}")]
    Config(#[from] SubmitError),

    #[error("{stage} stage failed: {source}")]
    Dispatch {
        stage: WorkType,
        #[source]
        source: DispatchError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("the {0} worker pool is empty")]
    EmptyPool(WorkType),

    #[error("invalid worker address `{addr}`: {reason}")]
    InvalidWorkerAddr { addr: String, reason: String },

    #[error("invalid listen address `{0}`")]
    InvalidListenAddr(String),

    #[error("probe timeout {probe:?} must be shorter than dispatch timeout {dispatch:?}")]
    ProbeTimeoutTooLong { probe: Duration, dispatch: Duration },

    #[error("attempts_per_worker must be at least 1")]
    NoAttempts,

    #[error("max_in_flight_tasks must be at least 1")]
    NoConcurrency,
}
