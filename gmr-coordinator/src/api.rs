//! HTTP front end of the coordinator.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{debug, info};

use common::protocol::{
    ErrorResponse, JobListResponse, JobResultResponse, JobStatusResponse, PoolStatusResponse,
    SubmitJobRequest, SubmitJobResponse,
};

use crate::core::Coordinator;
use crate::error::SubmitError;

pub fn router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route("/submit_job", post(submit_job))
        .route("/job_status/{job_id}", get(job_status))
        .route("/job_result/{job_id}", get(job_result))
        .route("/jobs", get(list_jobs))
        .route("/workers", get(list_workers))
        .with_state(coordinator)
}

/// A rejected request, answered with `400 {error}`.
#[derive(Debug)]
pub struct BadRequest(String);

impl IntoResponse for BadRequest {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: self.0 })).into_response()
    }
}

impl From<SubmitError> for BadRequest {
    fn from(e: SubmitError) -> Self {
        Self(e.to_string())
    }
}

impl From<JsonRejection> for BadRequest {
    fn from(e: JsonRejection) -> Self {
        Self(e.body_text())
    }
}

async fn submit_job(
    State(coordinator): State<Arc<Coordinator>>,
    payload: Result<Json<SubmitJobRequest>, JsonRejection>,
) -> Result<Json<SubmitJobResponse>, BadRequest> {
    let Json(request) = payload?;
    let job_id = coordinator.submit(request).map_err(|e| {
        info!("rejected submission: {}", e);
        BadRequest::from(e)
    })?;

    Ok(Json(SubmitJobResponse {
        job_id,
        status: "queued".to_string(),
    }))
}

async fn job_status(
    State(coordinator): State<Arc<Coordinator>>,
    Path(job_id): Path<String>,
) -> Json<JobStatusResponse> {
    let status = coordinator.job_status(&job_id);
    debug!(job_id = %job_id, state = %status.state, "status query");
    Json(status)
}

async fn job_result(
    State(coordinator): State<Arc<Coordinator>>,
    Path(job_id): Path<String>,
) -> Json<JobResultResponse> {
    Json(coordinator.job_result(&job_id))
}

async fn list_jobs(State(coordinator): State<Arc<Coordinator>>) -> Json<JobListResponse> {
    Json(coordinator.jobs())
}

async fn list_workers(State(coordinator): State<Arc<Coordinator>>) -> Json<PoolStatusResponse> {
    Json(coordinator.pool_status().await)
}
