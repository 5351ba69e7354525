//! # Application Error Types
//!
//! This module defines the error taxonomy used throughout the pantry-chef
//! engine. Callers need to distinguish "bad input" from "not found" from
//! "an upstream service misbehaved", so each class gets its own variant
//! rather than collapsing everything into a generic failure.

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Missing or malformed required input (empty search query, missing
    /// ingredient name, etc.). The message names the offending field.
    Validation(String),
    /// Update/remove referenced an ingredient or pantry that does not exist
    NotFound(String),
    /// OCR or AI-scorer failure or malformed response
    Upstream(String),
    /// OCR produced no usable text; signals "retake the photo", not
    /// "service is down"
    TextExtractionEmpty,
    /// Pantry persistence errors
    Storage(String),
    /// Configuration validation errors
    Config(String),
    /// Internal application errors (broken invariants)
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "[VALIDATION] {}", msg),
            AppError::NotFound(msg) => write!(f, "[NOT_FOUND] {}", msg),
            AppError::Upstream(msg) => write!(f, "[UPSTREAM] {}", msg),
            AppError::TextExtractionEmpty => write!(
                f,
                "[TEXT_EXTRACTION] No readable text could be extracted from the image"
            ),
            AppError::Storage(msg) => write!(f, "[STORAGE] {}", msg),
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
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

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Upstream(format!("request timed out: {}", err))
        } else {
            AppError::Upstream(err.to_string())
        }
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// User-facing description without internal detail. Production surfaces
    /// render this instead of the raw error chain.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "The request is missing or has invalid input.",
            AppError::NotFound(_) => "The requested item was not found.",
            AppError::Upstream(_) => "An external analysis service is temporarily unavailable.",
            AppError::TextExtractionEmpty => {
                "No readable text was found in the image. Please retake the photo."
            }
            AppError::Storage(_) => "Failed to access pantry storage.",
            AppError::Config(_) => "The service is misconfigured.",
            AppError::Internal(_) => "An unexpected internal error occurred.",
        }
    }

    /// True for errors the caller can fix by changing the request
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_) | AppError::NotFound(_) | AppError::TextExtractionEmpty
        )
    }
}

/// Standardized error logging utilities for consistent error reporting
pub mod error_logging {
    use tracing::error;

    /// Log pantry storage errors with contextual information
    pub fn log_storage_error(
        error: &impl std::fmt::Display,
        operation: &str,
        user_id: Option<&str>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            user_id = ?user_id,
            "Pantry storage operation failed"
        );
    }

    /// Log upstream service errors with endpoint context
    pub fn log_upstream_error(
        error: &impl std::fmt::Display,
        service: &str,
        operation: &str,
        endpoint: Option<&str>,
    ) {
        error!(
            error = %error,
            service = %service,
            operation = %operation,
            endpoint = ?endpoint,
            "Upstream service call failed"
        );
    }

    /// Log validation errors with input context. The input value is
    /// truncated on a character boundary; a byte slice would panic on
    /// multi-byte input.
    pub fn log_validation_error(
        error: &impl std::fmt::Display,
        operation: &str,
        user_id: Option<&str>,
        input_type: &str,
        input_value: Option<&str>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            user_id = ?user_id,
            input_type = %input_type,
            input_value = ?input_value.map(truncate_for_log),
            "Validation failed"
        );
    }

    fn truncate_for_log(value: &str) -> String {
        if value.chars().count() > 100 {
            let truncated: String = value.chars().take(100).collect();
            format!("{}...", truncated)
        } else {
            value.to_string()
        }
    }
}
