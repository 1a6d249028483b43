//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod job;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::service::JobService;

/// Create the main API router with all endpoints
pub fn create_router(service: Arc<JobService>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Job endpoints
        .route("/jobs", post(job::create_job))
        .route("/jobs", get(job::list_jobs))
        .route("/jobs/{id}", get(job::get_job))
        .route("/jobs/{id}/terminate", post(job::terminate_job))
        // Add state and middleware
        .with_state(service)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CloneBehaviour, job_service, wait_for_terminal};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use bughunter_core::domain::job::{Job, JobStatus};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, String) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health_check() {
        let (service, _base) = job_service(CloneBehaviour::Fail);
        let app = create_router(service);

        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_create_job_returns_created_snapshot() {
        let (service, _base) = job_service(CloneBehaviour::Hang);
        let app = create_router(service);

        let (status, body) = send(
            &app,
            "POST",
            "/jobs",
            Some(r#"{"repoUrl":"https://example.com/r.git"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["repoUrl"], "https://example.com/r.git");
        assert_eq!(json["status"], "queued");
        assert_eq!(json["logs"][0], "Job created");
        assert!(json["createdAt"].is_string());
        assert!(json.get("patch").is_none());
    }

    #[tokio::test]
    async fn test_create_job_rejects_missing_or_blank_url() {
        let (service, _base) = job_service(CloneBehaviour::Fail);
        let app = create_router(service.clone());

        for body in [r#"{}"#, r#"{"repoUrl":"  "}"#, "not json"] {
            let (status, text) = send(&app, "POST", "/jobs", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            let json: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert!(json["error"].is_string());
        }
        assert!(service.list_jobs().is_empty());
    }

    #[tokio::test]
    async fn test_get_job_unknown_and_malformed_ids() {
        let (service, _base) = job_service(CloneBehaviour::Fail);
        let app = create_router(service);

        let id = uuid::Uuid::new_v4();
        let (status, body) = send(&app, "GET", &format!("/jobs/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"], format!("Job {} not found", id));

        let (status, body) = send(&app, "GET", "/jobs/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Job not-a-uuid not found"));
    }

    #[tokio::test]
    async fn test_polling_sees_terminal_job() {
        let (service, _base) = job_service(CloneBehaviour::Succeed);
        let app = create_router(service.clone());

        let (_, body) = send(
            &app,
            "POST",
            "/jobs",
            Some(r#"{"repoUrl":"https://example.com/r.git"}"#),
        )
        .await;
        let created: Job = serde_json::from_str(&body).unwrap();
        wait_for_terminal(&service, created.id).await;

        let (status, body) = send(&app, "GET", &format!("/jobs/{}", created.id), None).await;
        assert_eq!(status, StatusCode::OK);
        let job: Job = serde_json::from_str(&body).unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert!(job.logs.len() > created.logs.len());
        assert_eq!(job.created_at, created.created_at);

        let (status, body) = send(&app, "GET", "/jobs", None).await;
        assert_eq!(status, StatusCode::OK);
        let jobs: Vec<Job> = serde_json::from_str(&body).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, created.id);
    }

    #[tokio::test]
    async fn test_terminate_endpoint() {
        let (service, _base) = job_service(CloneBehaviour::Hang);
        let app = create_router(service);

        let (_, body) = send(
            &app,
            "POST",
            "/jobs",
            Some(r#"{"repoUrl":"https://example.com/r.git"}"#),
        )
        .await;
        let created: Job = serde_json::from_str(&body).unwrap();
        let uri = format!("/jobs/{}/terminate", created.id);

        let (status, body) = send(&app, "POST", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let job: Job = serde_json::from_str(&body).unwrap();
        assert_eq!(job.status, JobStatus::Terminated);

        let (status, _) = send(&app, "POST", &uri, None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let unknown = format!("/jobs/{}/terminate", uuid::Uuid::new_v4());
        let (status, _) = send(&app, "POST", &unknown, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
