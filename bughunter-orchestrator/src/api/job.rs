//! Job API Handlers
//!
//! HTTP endpoints for job submission, polling and termination.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use bughunter_core::domain::job::Job;
use bughunter_core::dto::job::CreateJob;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::service::JobService;

/// Ids that are not UUIDs cannot name a job
fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("Job {} not found", raw)))
}

/// POST /jobs
/// Create a job and start its pipeline in the background
pub async fn create_job(
    State(service): State<Arc<JobService>>,
    payload: Result<Json<CreateJob>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Job>)> {
    let Json(req) = payload?;
    tracing::info!("Creating job for repository: {}", req.repo_url);

    let job = service.start_job(req)?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /jobs/{id}
/// Get job snapshot by ID
pub async fn get_job(
    State(service): State<Arc<JobService>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Job>> {
    tracing::debug!("Getting job: {}", id);

    let job = service.get_job(parse_id(&id)?)?;
    Ok(Json(job))
}

/// GET /jobs
/// List all jobs
pub async fn list_jobs(State(service): State<Arc<JobService>>) -> Json<Vec<Job>> {
    tracing::debug!("Listing all jobs");
    Json(service.list_jobs())
}

/// POST /jobs/{id}/terminate
/// Stop a running job
pub async fn terminate_job(
    State(service): State<Arc<JobService>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Job>> {
    tracing::info!("Terminating job: {}", id);

    let job = service.terminate_job(parse_id(&id)?)?;
    Ok(Json(job))
}
