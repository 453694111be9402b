//! Error types for catalog operations.
//!
//! Every failure the storage engine can surface maps to a distinguishable
//! variant carrying a stable [`ErrorCode`], so the HTTP layer can translate
//! error kinds into status codes without string matching.

use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Main error type for all catalog operations.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Identifier or cursor does not resolve to a stored entry.
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        code: ErrorCode,
        id: Option<String>,
    },

    /// Candidate version is not strictly greater than the current latest.
    #[error("Invalid version: {message}")]
    InvalidVersion {
        message: String,
        code: ErrorCode,
        name: String,
        candidate: String,
        current: String,
    },

    /// Identifier collision on insert.
    #[error("Already exists: {message}")]
    AlreadyExists {
        message: String,
        code: ErrorCode,
        id: String,
    },

    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
        suggestion: Option<String>,
    },

    /// A concurrent publish for the same name won the race.
    #[error("Conflict: {message}")]
    Conflict { message: String, code: ErrorCode },

    /// Backend unreachable or already closed.
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The operation context was cancelled or its deadline passed.
    #[error("Operation cancelled: {message}")]
    Cancelled { message: String, code: ErrorCode },

    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Store provider not compiled in or not recognized.
    #[error("Provider not supported: {provider}")]
    UnsupportedProvider { provider: String },

    /// Parse error.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Lookup (ENT_xxx)
    EntNotFound,
    EntCursorNotFound,
    EntDuplicateId,

    // Versioning (VER_xxx)
    VerNotGreater,
    VerConcurrentPublish,

    // Validation (VAL_xxx)
    ValInvalidInput,
    ValMissingField,
    ValInvalidCursor,
    ValInvalidFilter,
    ValInvalidRecord,

    // Database (DB_xxx)
    DbConnectionFailed,
    DbOperationFailed,
    DbClosed,

    // Context (CTX_xxx)
    CtxCancelled,
    CtxDeadlineExceeded,

    // Parse (PARSE_xxx)
    ParseInvalidJson,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::EntNotFound => "ENT_001",
            ErrorCode::EntCursorNotFound => "ENT_002",
            ErrorCode::EntDuplicateId => "ENT_003",
            ErrorCode::VerNotGreater => "VER_001",
            ErrorCode::VerConcurrentPublish => "VER_002",
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValMissingField => "VAL_002",
            ErrorCode::ValInvalidCursor => "VAL_003",
            ErrorCode::ValInvalidFilter => "VAL_004",
            ErrorCode::ValInvalidRecord => "VAL_005",
            ErrorCode::DbConnectionFailed => "DB_001",
            ErrorCode::DbOperationFailed => "DB_002",
            ErrorCode::DbClosed => "DB_003",
            ErrorCode::CtxCancelled => "CTX_001",
            ErrorCode::CtxDeadlineExceeded => "CTX_002",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl CatalogError {
    /// Create a not found error for an entry id.
    pub fn not_found(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::NotFound {
            message: format!("Entry with id '{}' not found", id),
            code: ErrorCode::EntNotFound,
            id: Some(id),
        }
    }

    /// Create a not found error for a pagination cursor.
    pub fn cursor_not_found(cursor: impl Into<String>) -> Self {
        let cursor = cursor.into();
        Self::NotFound {
            message: format!("Cursor '{}' does not match any entry", cursor),
            code: ErrorCode::EntCursorNotFound,
            id: Some(cursor),
        }
    }

    /// Create an invalid version error.
    pub fn invalid_version(
        name: impl Into<String>,
        candidate: impl Into<String>,
        current: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let candidate = candidate.into();
        let current = current.into();
        Self::InvalidVersion {
            message: format!(
                "version '{}' of '{}' must be greater than the latest version '{}'",
                candidate, name, current
            ),
            code: ErrorCode::VerNotGreater,
            name,
            candidate,
            current,
        }
    }

    /// Create an already exists error.
    pub fn already_exists(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::AlreadyExists {
            message: format!("Entry with id '{}' already exists", id),
            code: ErrorCode::EntDuplicateId,
            id,
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::validation_with_code(message, ErrorCode::ValInvalidInput)
    }

    /// Create a validation error with a specific code.
    pub fn validation_with_code(message: impl Into<String>, code: ErrorCode) -> Self {
        Self::Validation {
            message: message.into(),
            code,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create a validation error for a missing mandatory field.
    pub fn missing_field(field: &str) -> Self {
        let mut details = HashMap::new();
        details.insert("field".to_string(), field.to_string());
        Self::Validation {
            message: format!("'{}' is required", field),
            code: ErrorCode::ValMissingField,
            details,
            suggestion: None,
        }
    }

    /// Create a validation error with suggestion.
    pub fn validation_with_suggestion(
        message: impl Into<String>,
        code: ErrorCode,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            code,
            details: HashMap::new(),
            suggestion: Some(suggestion.into()),
        }
    }

    /// Create a conflict error for a lost same-name publish race.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            code: ErrorCode::VerConcurrentPublish,
        }
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            code: ErrorCode::DbConnectionFailed,
            source: None,
        }
    }

    /// Error returned by a backend after `close()`.
    pub fn closed() -> Self {
        Self::Connection {
            message: "store is closed".to_string(),
            code: ErrorCode::DbClosed,
            source: None,
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidJson,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { code, .. } => *code,
            Self::InvalidVersion { code, .. } => *code,
            Self::AlreadyExists { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::Conflict { code, .. } => *code,
            Self::Connection { code, .. } => *code,
            Self::Cancelled { code, .. } => *code,
            Self::Database { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            Self::Serialization(_) => ErrorCode::ParseInvalidJson,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether a caller may reasonably retry the operation.
    ///
    /// The engine itself never retries.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Conflict { .. } | Self::Cancelled { .. }
        )
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::NotFound { code: ErrorCode::EntCursorNotFound, .. } => {
                Some("Restart pagination with an empty cursor")
            }
            Self::NotFound { .. } => Some("Please check the entry ID and ensure it exists"),
            Self::InvalidVersion { .. } => Some("Publish a version greater than the current latest"),
            Self::Conflict { .. } => Some("Another publish for this name is in progress; retry"),
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::Connection { .. } => Some("Please check your store connection settings"),
            _ => None,
        }
    }
}
