//! Health Check API Handler

use axum::{http::StatusCode, response::IntoResponse};

/// GET /health
/// Liveness probe, no dependency checks
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
