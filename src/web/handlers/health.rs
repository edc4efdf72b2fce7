//! Health check handler

use axum::{Json, response::IntoResponse};
use chrono::Utc;

use crate::web::responses::HealthResponse;

/// Liveness probe; does not touch the caches or collaborators
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse::ok(Utc::now()))
}
