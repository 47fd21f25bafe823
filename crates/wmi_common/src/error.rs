//! Typed errors for the dispatch pipeline.
//!
//! Everything except `DuplicateCommand` is recoverable and reported to the
//! caller; the binaries map these onto exit codes or tool-call failures.

use thiserror::Error;

/// Registry construction errors. Duplicate registration is a programming
/// error and fatal at startup.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("duplicate command registered: {0}")]
    DuplicateCommand(String),
}

/// Failures reported by the external query executor.
#[derive(Debug, Clone, Error)]
pub enum ExecutorError {
    #[error("access denied by the WMI provider")]
    AccessDenied,

    #[error("query timed out after {0} seconds")]
    Timeout(u64),

    #[error("malformed WQL query: {0}")]
    MalformedQuery(String),

    #[error("query backend failure: {0}")]
    Backend(String),
}

/// Formatter failures. Heterogeneous records indicate a broken executor
/// and must fail loudly rather than truncate silently.
#[derive(Debug, Clone, Error)]
pub enum FormatError {
    #[error("heterogeneous records: expected fields [{expected}], record {index} has [{found}]")]
    Heterogeneous {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("JSON serialization failed: {0}")]
    Json(String),
}

/// Errors surfaced by `Dispatcher::dispatch`.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("'{0}' requires administrator privileges")]
    InsufficientPrivilege(String),

    #[error("query execution failed: {0}")]
    QueryExecutionFailed(#[from] ExecutorError),

    #[error("output formatting failed: {0}")]
    Format(#[from] FormatError),
}

impl DispatchError {
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        DispatchError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable kind tag, used for JSON error objects.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::UnknownCommand(_) => "unknown_command",
            DispatchError::InvalidParameter { .. } => "invalid_parameter",
            DispatchError::InsufficientPrivilege(_) => "insufficient_privilege",
            DispatchError::QueryExecutionFailed(_) => "query_execution_failed",
            DispatchError::Format(_) => "format_error",
        }
    }
}
