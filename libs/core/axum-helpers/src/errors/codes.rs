//! Type-safe error codes for API responses.
//!
//! ```rust
//! use axum_helpers::errors::ErrorCode;
//!
//! let code = ErrorCode::QueueError;
//! assert_eq!(code.as_str(), "QUEUE_ERROR");
//! assert_eq!(code.code(), 3001);
//! ```

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error codes returned in [`ErrorResponse`](super::ErrorResponse).
///
/// Ranges:
/// - 1000-1999: client and generic server errors
/// - 2000-2999: database errors
/// - 3000-3999: queue errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request validation failed
    ValidationError,

    /// Requested resource was not found
    NotFound,

    /// An unexpected internal server error occurred
    InternalError,

    /// Service is temporarily unavailable
    ServiceUnavailable,

    /// Database connection or query error
    DatabaseError,

    /// Message broker could not accept the job
    QueueError,
}

impl ErrorCode {
    /// SCREAMING_SNAKE_CASE identifier for clients
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::InternalError => "INTERNAL_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::QueueError => "QUEUE_ERROR",
        }
    }

    /// Integer code for logs and metrics
    pub fn code(&self) -> i32 {
        match self {
            Self::ValidationError => 1001,
            Self::NotFound => 1004,
            Self::InternalError => 1005,
            Self::ServiceUnavailable => 1011,
            Self::DatabaseError => 2003,
            Self::QueueError => 3001,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            Self::ValidationError => "Request validation failed",
            Self::NotFound => "Resource not found",
            Self::InternalError => "An internal server error occurred",
            Self::ServiceUnavailable => "Service is temporarily unavailable",
            Self::DatabaseError => "Database error occurred",
            Self::QueueError => "Queue error occurred",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
