//! Server state management.

use std::sync::Arc;
use std::time::Duration;

use catalog_core::{Catalog, OpContext};

/// Default upper bound for one request's storage work.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state.
#[derive(Clone, Debug)]
pub struct AppState {
    catalog: Arc<Catalog>,
    request_timeout: Duration,
    environment: Arc<str>,
}

impl AppState {
    /// Create a new application state around a catalog.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            environment: Arc::from("dev"),
        }
    }

    /// Name of the deployment environment reported by `/v0/ping`.
    pub fn with_environment(mut self, environment: impl AsRef<str>) -> Self {
        self.environment = Arc::from(environment.as_ref());
        self
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Override the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Context for one request.
    pub fn request_context(&self) -> OpContext {
        OpContext::with_timeout(self.request_timeout)
    }
}
