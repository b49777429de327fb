//! JSON bodies exchanged between client, coordinator and workers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::job::{JobId, JobProgress, JobState};

pub const DEFAULT_SPLIT_SIZE: i64 = 100;
pub const DEFAULT_NUM_REDUCERS: i64 = 1;

/// Final output of a job: one reduced value per key.
pub type JobResult = BTreeMap<String, Value>;

/// Key to every value emitted for it, in emission order.
pub type KeyValues = BTreeMap<String, Vec<Value>>;

/// Map or reduce logic as chosen by the user.
///
/// The coordinator never looks inside; it forwards the value to workers
/// byte-for-byte equivalent. Only the worker interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicDescriptor(pub Value);

/////////////////////////////////////////////////////////////////////////////
// Coordinator API
/////////////////////////////////////////////////////////////////////////////

fn default_split_size() -> i64 {
    DEFAULT_SPLIT_SIZE
}

fn default_num_reducers() -> i64 {
    DEFAULT_NUM_REDUCERS
}

/// `POST /submit_job`.
///
/// Sizes are signed so that zero and negative values reach validation
/// instead of failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobRequest {
    pub data: String,

    /// Tokens per split.
    #[serde(default = "default_split_size")]
    pub split_size: i64,

    #[serde(default = "default_num_reducers")]
    pub num_reducers: i64,

    pub map_logic: LogicDescriptor,
    pub reduce_logic: LogicDescriptor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub job_id: JobId,
    pub status: String,
}

/// `GET /job_status/{job_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusResponse {
    /// Echoed as given, so unknown identifiers come back verbatim.
    pub job_id: String,
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<JobProgress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `GET /job_result/{job_id}`.
///
/// Exactly one of `result` (state `DONE`) or `message` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResultResponse {
    pub job_id: String,
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: JobId,
    pub state: JobState,
    pub progress: JobProgress,
}

/// `GET /jobs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub addr: String,
    /// `None` when the worker did not answer the probe.
    pub tasks_in_progress: Option<u32>,
}

/// `GET /workers`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolStatusResponse {
    pub map_workers: Vec<WorkerStatus>,
    pub reduce_workers: Vec<WorkerStatus>,
    pub jobs_in_flight: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/////////////////////////////////////////////////////////////////////////////
// Worker contract
/////////////////////////////////////////////////////////////////////////////

/// `POST /map_task`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapTaskRequest {
    pub job_id: JobId,
    pub split_id: String,
    /// Lowercased, whitespace-joined tokens of one split.
    pub data: String,
    pub map_logic: LogicDescriptor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapTaskResponse {
    pub job_id: JobId,
    pub split_id: String,
    pub results: KeyValues,
}

/// `POST /reduce_task`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReduceTaskRequest {
    pub job_id: JobId,
    pub reduce_id: String,
    pub data: KeyValues,
    pub reduce_logic: LogicDescriptor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReduceTaskResponse {
    pub job_id: JobId,
    pub reduce_id: String,
    pub results: JobResult,
}

/// `GET /status` on any worker.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LoadReport {
    pub tasks_in_progress: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn submit_defaults() {
        let req: SubmitJobRequest = serde_json::from_value(json!({
            "data": "a b a",
            "map_logic": {"name": "wc"},
            "reduce_logic": {"name": "sum"},
        }))
        .unwrap();
        assert_eq!(req.split_size, 100);
        assert_eq!(req.num_reducers, 1);
    }

    #[test]
    fn descriptor_is_forwarded_verbatim() {
        let raw = json!({"name": "grep", "args": ["needle"], "extra": {"nested": true}});
        let descriptor: LogicDescriptor = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&descriptor).unwrap(), raw);
    }

    #[test]
    fn status_omits_absent_fields() {
        let body = JobStatusResponse {
            job_id: "nope".to_string(),
            state: JobState::NotFound,
            progress: None,
            error: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"job_id": "nope", "state": "NOT_FOUND"})
        );
    }
}
