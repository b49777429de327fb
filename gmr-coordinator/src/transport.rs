//! The network seam between the coordinator and its workers.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use common::protocol::LoadReport;

use crate::error::TransportError;
use crate::worker_info::WorkerInfo;

/// How the coordinator talks to a worker.
///
/// Implementations must honour `timeout` for every call; callers still
/// bound each call themselves.
#[async_trait]
pub trait WorkerTransport: Send + Sync {
    /// Ask a worker how many tasks it currently has outstanding.
    async fn probe_load(
        &self,
        worker: &WorkerInfo,
        timeout: Duration,
    ) -> Result<LoadReport, TransportError>;

    /// Post a task payload to `endpoint` and return the decoded JSON reply.
    async fn send_task(
        &self,
        worker: &WorkerInfo,
        endpoint: &str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<Value, TransportError>;
}

/// JSON over HTTP, the way workers actually listen.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else if err.is_decode() {
        TransportError::Malformed(err.to_string())
    } else if err.is_body() {
        TransportError::Body(err.to_string())
    } else if let Some(status) = err.status() {
        TransportError::Status(status.as_u16())
    } else {
        TransportError::Connect(err.to_string())
    }
}

fn endpoint_url(worker: &WorkerInfo, path: &str) -> Result<url::Url, TransportError> {
    worker
        .endpoint(path)
        .map_err(|e| TransportError::Connect(format!("bad endpoint `{}`: {}", path, e)))
}

#[async_trait]
impl WorkerTransport for HttpTransport {
    async fn probe_load(
        &self,
        worker: &WorkerInfo,
        timeout: Duration,
    ) -> Result<LoadReport, TransportError> {
        let url = endpoint_url(worker, "status")?;
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        if !response.status().is_success() {
            return Err(TransportError::Status(response.status().as_u16()));
        }
        response
            .json::<LoadReport>()
            .await
            .map_err(|e| classify(e, timeout))
    }

    async fn send_task(
        &self,
        worker: &WorkerInfo,
        endpoint: &str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<Value, TransportError> {
        let url = endpoint_url(worker, endpoint)?;
        let response = self
            .client
            .post(url)
            .json(payload)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        if !response.status().is_success() {
            return Err(TransportError::Status(response.status().as_u16()));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| classify(e, timeout))
    }
}
