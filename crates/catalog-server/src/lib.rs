//! catalog-server - REST API server for catalog.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use catalog_core::{Catalog, InMemoryEntryStore};
//! use catalog_server::{create_server, AppState};
//!
//! #[tokio::main]
//! async fn main() {
//!     let catalog = Catalog::new(Arc::new(InMemoryEntryStore::new()));
//!     let app = create_server(AppState::new(catalog));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

pub mod error;
pub mod factory;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use factory::{create_catalog, import_seed};
pub use state::AppState;

use axum::{middleware as axum_middleware, Router};
use tower_http::trace::TraceLayer;

/// Create the server with all routes and middleware.
pub fn create_server(state: AppState) -> Router {
    routes::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors_layer())
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
}
