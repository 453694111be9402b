//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
    pub version: String,
}

/// Health check endpoint.
/// GET /v0/health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        store: state.catalog().provider().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub environment: String,
    pub version: String,
    pub version_ordering: String,
}

/// Environment info.
/// GET /v0/ping
pub async fn ping(State(state): State<AppState>) -> Json<PingResponse> {
    Json(PingResponse {
        environment: state.environment().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        version_ordering: state.catalog().version_ordering().to_string(),
    })
}
