//! Route definitions for the REST API.

mod health;
mod publish;
mod servers;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/v0/health", get(health::health_check))
        .route("/v0/ping", get(health::ping))
        // Entry reads
        .route("/v0/servers", get(servers::list_servers))
        .route("/v0/servers/:id", get(servers::get_server))
        // Publishing
        .route("/v0/publish", post(publish::publish_server))
        // Attach state
        .with_state(state)
}

pub use health::*;
pub use publish::*;
pub use servers::*;
