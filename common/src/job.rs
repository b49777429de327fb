use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coordinator-generated job identifier.
pub type JobId = Uuid;

/// Lifecycle state of a job as reported to clients.
///
/// `NotFound` is never stored; it is what a status query answers for an
/// identifier the coordinator has never seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Accepted, orchestration not started yet.
    Queued,

    /// Map or reduce phase in progress.
    Running,

    /// Result available.
    Done,

    /// A task exhausted every worker in its pool.
    Failed,

    NotFound,
}

impl JobState {
    /// `Done` and `Failed` never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Queued => "QUEUED",
            JobState::Running => "RUNNING",
            JobState::Done => "DONE",
            JobState::Failed => "FAILED",
            JobState::NotFound => "NOT_FOUND",
        };
        f.write_str(name)
    }
}

/// How far a running job has come.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub splits_total: usize,
    pub splits_done: usize,
    /// Non-empty reduce partitions only.
    pub partitions_total: usize,
    pub partitions_done: usize,
}

impl fmt::Display for JobProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "map {}/{}, reduce {}/{}",
            self.splits_done, self.splits_total, self.partitions_done, self.partitions_total
        )
    }
}
