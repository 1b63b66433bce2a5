//! Minimal HTTP surface: health check only.
//!
//! All coordination happens over the WebSocket endpoint; the REST
//! surface exists for liveness probes.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Builds the HTTP router (health only; `/ws` is mounted in `main`).
pub fn build_router() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}
