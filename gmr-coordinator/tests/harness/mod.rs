//! In-process workers for coordinator tests.
//!
//! Every worker is addressed as `http://<name>` and follows a scripted
//! [`Behaviour`]. Healthy workers run the real transforms from the
//! `workload` crate.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use common::protocol::{
    JobResult, LoadReport, MapTaskRequest, MapTaskResponse, ReduceTaskRequest,
    ReduceTaskResponse, SubmitJobRequest,
};
use common::{JobId, JobState};
use gmr_coordinator::dispatcher::RetryPolicy;
use gmr_coordinator::error::TransportError;
use gmr_coordinator::transport::WorkerTransport;
use gmr_coordinator::worker_info::{WorkType, WorkerInfo, WorkerPool};
use gmr_coordinator::{Coordinator, CoordinatorConfig};
use workload::Descriptor;

#[derive(Debug, Clone, Copy)]
pub enum Behaviour {
    /// Answers probes with `load` and executes every task.
    Healthy { load: u32 },

    /// Refuses every connection.
    Down,

    /// Never answers probes in time, but executes tasks.
    ProbeTimeout,

    /// Fails the first `n` task deliveries with HTTP 500.
    FailFirst { n: u32, load: u32 },

    /// Replies to tasks with a body that is not a task response.
    Malformed { load: u32 },

    /// Panics while handling a task.
    Panic,

    /// Holds every task until [`ScriptedTransport::release`], then executes it.
    Gated { load: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub worker: String,
    pub endpoint: String,
}

pub fn addr(name: &str) -> String {
    format!("http://{}", name)
}

#[derive(Default)]
pub struct ScriptedTransport {
    behaviours: HashMap<String, Behaviour>,
    failures: Mutex<HashMap<String, u32>>,
    calls: Mutex<Vec<Call>>,
    gate_open: AtomicBool,
    gate: Notify,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, behaviour: Behaviour) -> Self {
        self.behaviours.insert(addr(name), behaviour);
        self
    }

    fn behaviour(&self, worker: &WorkerInfo) -> Behaviour {
        self.behaviours
            .get(&worker.to_string())
            .copied()
            .unwrap_or(Behaviour::Healthy { load: 0 })
    }

    /// Let every held and future gated task through.
    pub fn release(&self) {
        self.gate_open.store(true, Ordering::SeqCst);
        self.gate.notify_waiters();
    }

    async fn pass_gate(&self) {
        loop {
            let opened = self.gate.notified();
            if self.gate_open.load(Ordering::SeqCst) {
                return;
            }
            opened.await;
        }
    }

    /// Task deliveries so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, name: &str, endpoint: &str) -> usize {
        let worker = addr(name);
        self.calls()
            .iter()
            .filter(|call| call.worker == worker && call.endpoint == endpoint)
            .count()
    }

    pub fn endpoint_calls(&self, endpoint: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.endpoint == endpoint)
            .count()
    }
}

fn execute(endpoint: &str, payload: &Value) -> Result<Value, TransportError> {
    let unprocessable = |_| TransportError::Status(422);
    match endpoint {
        "map_task" => {
            let task: MapTaskRequest =
                serde_json::from_value(payload.clone()).map_err(|_| TransportError::Status(400))?;
            let descriptor = Descriptor::from_logic(&task.map_logic).map_err(unprocessable)?;
            let results = workload::run_map(&descriptor, &task.data).map_err(unprocessable)?;
            Ok(serde_json::to_value(MapTaskResponse {
                job_id: task.job_id,
                split_id: task.split_id,
                results,
            })
            .unwrap())
        }
        "reduce_task" => {
            let task: ReduceTaskRequest =
                serde_json::from_value(payload.clone()).map_err(|_| TransportError::Status(400))?;
            let descriptor = Descriptor::from_logic(&task.reduce_logic).map_err(unprocessable)?;
            let results = workload::run_reduce(&descriptor, &task.data).map_err(unprocessable)?;
            Ok(serde_json::to_value(ReduceTaskResponse {
                job_id: task.job_id,
                reduce_id: task.reduce_id,
                results,
            })
            .unwrap())
        }
        _ => Err(TransportError::Status(404)),
    }
}

#[async_trait]
impl WorkerTransport for ScriptedTransport {
    async fn probe_load(
        &self,
        worker: &WorkerInfo,
        _timeout: Duration,
    ) -> Result<LoadReport, TransportError> {
        match self.behaviour(worker) {
            Behaviour::Healthy { load }
            | Behaviour::FailFirst { load, .. }
            | Behaviour::Malformed { load }
            | Behaviour::Gated { load } => Ok(LoadReport {
                tasks_in_progress: load,
            }),
            Behaviour::Down => Err(TransportError::Connect("connection refused".to_string())),
            Behaviour::ProbeTimeout => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(LoadReport::default())
            }
            Behaviour::Panic => Ok(LoadReport::default()),
        }
    }

    async fn send_task(
        &self,
        worker: &WorkerInfo,
        endpoint: &str,
        payload: &Value,
        _timeout: Duration,
    ) -> Result<Value, TransportError> {
        let key = worker.to_string();
        self.calls.lock().unwrap().push(Call {
            worker: key.clone(),
            endpoint: endpoint.to_string(),
        });

        match self.behaviour(worker) {
            Behaviour::Healthy { .. } | Behaviour::ProbeTimeout => execute(endpoint, payload),
            Behaviour::Down => Err(TransportError::Connect("connection refused".to_string())),
            Behaviour::FailFirst { n, .. } => {
                let failed = {
                    let mut failures = self.failures.lock().unwrap();
                    let count = failures.entry(key).or_insert(0);
                    *count += 1;
                    *count <= n
                };
                if failed {
                    Err(TransportError::Status(500))
                } else {
                    execute(endpoint, payload)
                }
            }
            Behaviour::Malformed { .. } => Ok(json!({"unexpected": true})),
            Behaviour::Panic => panic!("worker exploded"),
            Behaviour::Gated { .. } => {
                self.pass_gate().await;
                execute(endpoint, payload)
            }
        }
    }
}

/// A config over named workers with fast probes and short backoff.
pub fn config(map: &[&str], reduce: &[&str]) -> CoordinatorConfig {
    let urls = |names: &[&str]| names.iter().map(|n| addr(n)).collect::<Vec<_>>();
    let map_pool = WorkerPool::parse(WorkType::Map, &urls(map)).unwrap();
    let reduce_pool = WorkerPool::parse(WorkType::Reduce, &urls(reduce)).unwrap();

    let mut config = CoordinatorConfig::new(map_pool, reduce_pool);
    config.probe_timeout = Duration::from_millis(50);
    config.retry = RetryPolicy {
        attempts_per_worker: 3,
        attempt_timeout: Duration::from_secs(2),
        backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
    };
    config
}

pub fn coordinator(
    map: &[&str],
    reduce: &[&str],
    transport: ScriptedTransport,
) -> (Arc<Coordinator>, Arc<ScriptedTransport>) {
    let transport = Arc::new(transport);
    let coordinator = Coordinator::new(&config(map, reduce), transport.clone());
    (Arc::new(coordinator), transport)
}

pub fn request(
    data: &str,
    split_size: i64,
    num_reducers: i64,
    map_logic: Value,
    reduce_logic: Value,
) -> SubmitJobRequest {
    serde_json::from_value(json!({
        "data": data,
        "split_size": split_size,
        "num_reducers": num_reducers,
        "map_logic": map_logic,
        "reduce_logic": reduce_logic,
    }))
    .unwrap()
}

pub fn word_count(data: &str, split_size: i64, num_reducers: i64) -> SubmitJobRequest {
    request(
        data,
        split_size,
        num_reducers,
        json!({"name": "wc"}),
        json!({"name": "sum"}),
    )
}

/// Poll until the job reaches a terminal state.
pub async fn wait_for(coordinator: &Coordinator, job_id: JobId) -> JobState {
    let poll = async {
        loop {
            let state = coordinator.store().state(&job_id);
            if state.is_terminal() {
                return state;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(10), poll)
        .await
        .expect("job did not finish in time")
}

pub async fn run_to_result(coordinator: &Coordinator, request: SubmitJobRequest) -> JobResult {
    let job_id = coordinator.submit(request).unwrap();
    assert_eq!(wait_for(coordinator, job_id).await, JobState::Done);
    coordinator
        .job_result(&job_id.to_string())
        .result
        .expect("DONE job without result")
}
