//! Error handling for the REST API server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

use catalog_core::error::{CatalogError, ErrorCode};

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    // Common error constructors
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.status, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };

        (self.status, Json(body)).into_response()
    }
}

/// Status code for a catalog error kind.
fn status_for(err: &CatalogError) -> StatusCode {
    match err {
        CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
        CatalogError::Validation { .. }
        | CatalogError::InvalidVersion { .. }
        | CatalogError::Parse { .. } => StatusCode::BAD_REQUEST,
        CatalogError::AlreadyExists { .. } | CatalogError::Conflict { .. } => StatusCode::CONFLICT,
        CatalogError::Cancelled { code, .. } if *code == ErrorCode::CtxDeadlineExceeded => {
            StatusCode::GATEWAY_TIMEOUT
        }
        CatalogError::Cancelled { .. } | CatalogError::Connection { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// Convert from catalog-core errors
impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        }

        let api = ApiError::new(status, err.code().as_str(), err.to_string());
        match err.suggestion() {
            Some(suggestion) => api.with_details(serde_json::json!({ "suggestion": suggestion })),
            None => api,
        }
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CatalogError::not_found("x"), StatusCode::NOT_FOUND),
            (CatalogError::cursor_not_found("x"), StatusCode::NOT_FOUND),
            (CatalogError::missing_field("name"), StatusCode::BAD_REQUEST),
            (
                CatalogError::invalid_version("fs", "1.0.0", "1.0.0"),
                StatusCode::BAD_REQUEST,
            ),
            (CatalogError::already_exists("x"), StatusCode::CONFLICT),
            (CatalogError::conflict("race"), StatusCode::CONFLICT),
            (CatalogError::closed(), StatusCode::SERVICE_UNAVAILABLE),
            (
                CatalogError::database("boom"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status, expected);
        }
    }

    #[test]
    fn test_deadline_maps_to_gateway_timeout() {
        let err = CatalogError::Cancelled {
            message: "deadline".to_string(),
            code: ErrorCode::CtxDeadlineExceeded,
        };
        let api = ApiError::from(err);
        assert_eq!(api.status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(api.code, "CTX_002");
    }
}
