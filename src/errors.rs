//! # Application Error Types
//!
//! This module defines common error types used throughout the realty-extract pipeline.
//! Only structural failures surface as errors; per-record problems (unresolved areas,
//! malformed numbers, failed lookups) are represented as values in the output.

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// A required input column is absent from the table
    MissingColumn {
        /// Column names the pipeline needs
        expected: Vec<String>,
        /// Column names actually present in the input
        present: Vec<String>,
    },
    /// JSON encoding/decoding errors
    Serialization(String),
    /// File system errors
    FileSystem(String),
    /// Network/communication errors
    Network(String),
    /// Internal application errors
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::MissingColumn { expected, present } => write!(
                f,
                "[MISSING_COLUMN] expected columns [{}], found [{}]",
                expected.join(", "),
                present.join(", ")
            ),
            AppError::Serialization(msg) => write!(f, "[SERIALIZATION] {}", msg),
            AppError::FileSystem(msg) => write!(f, "[FILESYSTEM] {}", msg),
            AppError::Network(msg) => write!(f, "[NETWORK] {}", msg),
            AppError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileSystem(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Standardized error logging utilities for consistent error reporting across the application
pub mod error_logging {
    use super::AppError;
    use tracing::{error, warn};

    /// Log a failed table run once, with the fields of its error kind
    pub fn log_pipeline_error(err: &AppError) {
        match err {
            AppError::MissingColumn { expected, present } => {
                log_missing_column_error(expected, present)
            }
            other => error!(error = %other, "Pipeline failed"),
        }
    }

    /// Log a missing-column failure with both column listings
    pub fn log_missing_column_error(expected: &[String], present: &[String]) {
        error!(
            expected = ?expected,
            present = ?present,
            "Required input column missing, refusing to process table"
        );
    }

    /// Log network/communication errors with connection context
    pub fn log_network_error(
        error: &impl std::fmt::Display,
        operation: &str,
        endpoint: Option<&str>,
        attempt_count: Option<u32>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            endpoint = ?endpoint,
            attempt_count = ?attempt_count,
            "Network operation failed"
        );
    }

    /// Log an external collaborator failure that was replaced by a placeholder
    pub fn log_collaborator_fallback(
        error: &impl std::fmt::Display,
        collaborator: &str,
        record_index: usize,
        placeholder: &str,
    ) {
        warn!(
            error = %error,
            collaborator = %collaborator,
            record_index = record_index,
            placeholder = %placeholder,
            "External collaborator failed, substituting placeholder"
        );
    }

    /// Log file system errors with path and operation context
    pub fn log_filesystem_error(
        error: &impl std::fmt::Display,
        operation: &str,
        path: Option<&str>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            path = ?path,
            "File system operation failed"
        );
    }

    /// Log configuration errors during startup/initialization
    pub fn log_config_error(error: &impl std::fmt::Display, config_key: &str, operation: &str) {
        error!(
            error = %error,
            config_key = %config_key,
            operation = %operation,
            "Configuration error"
        );
    }
}
