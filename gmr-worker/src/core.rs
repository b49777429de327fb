use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{debug, warn};

use common::protocol::{
    ErrorResponse, LoadReport, MapTaskRequest, MapTaskResponse, ReduceTaskRequest,
    ReduceTaskResponse,
};

use crate::map::perform_map;
use crate::reduce::perform_reduce;

/// Shared state of one worker process.
#[derive(Debug, Default)]
pub struct MRWorker {
    tasks_in_progress: AtomicU32,
}

impl MRWorker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks_in_progress(&self) -> u32 {
        self.tasks_in_progress.load(Ordering::SeqCst)
    }

    /// Count a task as in progress until the guard is dropped.
    pub fn begin_task(&self) -> TaskGuard<'_> {
        self.tasks_in_progress.fetch_add(1, Ordering::SeqCst);
        TaskGuard { worker: self }
    }
}

pub struct TaskGuard<'w> {
    worker: &'w MRWorker,
}

impl Drop for TaskGuard<'_> {
    fn drop(&mut self) {
        self.worker.tasks_in_progress.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn router(worker: Arc<MRWorker>) -> Router {
    Router::new()
        .route("/map_task", post(map_task))
        .route("/reduce_task", post(reduce_task))
        .route("/status", get(status))
        .with_state(worker)
}

/// A task the worker could not run, answered with `422 {error}`.
pub struct TaskError(anyhow::Error);

impl IntoResponse for TaskError {
    fn into_response(self) -> Response {
        let error = format!("{:#}", self.0);
        warn!("task rejected: {}", error);
        (StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorResponse { error })).into_response()
    }
}

impl From<anyhow::Error> for TaskError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

/// Run a transform on the blocking pool so load probes keep answering.
async fn run_blocking<T, F>(work: F) -> Result<T, TaskError>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    let output = tokio::task::spawn_blocking(work)
        .await
        .context("task aborted")??;
    Ok(output)
}

async fn map_task(
    State(worker): State<Arc<MRWorker>>,
    Json(request): Json<MapTaskRequest>,
) -> Result<Json<MapTaskResponse>, TaskError> {
    let _guard = worker.begin_task();
    Ok(Json(run_blocking(move || perform_map(request)).await?))
}

async fn reduce_task(
    State(worker): State<Arc<MRWorker>>,
    Json(request): Json<ReduceTaskRequest>,
) -> Result<Json<ReduceTaskResponse>, TaskError> {
    let _guard = worker.begin_task();
    Ok(Json(run_blocking(move || perform_reduce(request)).await?))
}

async fn status(State(worker): State<Arc<MRWorker>>) -> Json<LoadReport> {
    let tasks_in_progress = worker.tasks_in_progress();
    debug!(tasks_in_progress, "load probe");
    Json(LoadReport { tasks_in_progress })
}
