//! Queue error types and error categorization
//!
//! The category decides what the consumer does with a failed delivery:
//! - **Transient**: the job may succeed on another attempt, so it can be requeued
//! - **Permanent**: retrying cannot help, so the delivery is rejected

use core_config::ConfigError;
use thiserror::Error;

/// Category of error for determining requeue behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transient,
    Permanent,
}

/// Job queue errors
#[derive(Error, Debug)]
pub enum QueueError {
    /// Producer could not reach the broker, authenticate, declare or publish.
    /// Surfaced to the caller, never retried by the producer.
    #[error("Queue unavailable: {0}")]
    QueueUnavailable(String),

    /// A broker connection or channel failed underneath the consumer.
    /// Absorbed by the supervisor, which reconnects.
    #[error("Broker connection lost: {0}")]
    BrokerConnectionLost(String),

    /// The job handler failed
    #[error("Handler failed: {message}")]
    HandlerFailure {
        message: String,
        category: ErrorCategory,
    },

    /// The delivery body is not a job record
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl QueueError {
    /// Create a retryable handler failure
    pub fn transient(message: impl Into<String>) -> Self {
        QueueError::HandlerFailure {
            message: message.into(),
            category: ErrorCategory::Transient,
        }
    }

    /// Create a handler failure that must not be retried
    pub fn permanent(message: impl Into<String>) -> Self {
        QueueError::HandlerFailure {
            message: message.into(),
            category: ErrorCategory::Permanent,
        }
    }

    /// Wrap a failed broker operation.
    pub fn broker(operation: &str, err: impl std::fmt::Display) -> Self {
        QueueError::BrokerConnectionLost(format!("{operation}: {err}"))
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            QueueError::QueueUnavailable(_) => ErrorCategory::Transient,
            QueueError::BrokerConnectionLost(_) => ErrorCategory::Transient,
            QueueError::HandlerFailure { category, .. } => *category,
            QueueError::InvalidPayload(_) => ErrorCategory::Permanent,
            QueueError::Config(_) => ErrorCategory::Permanent,
        }
    }

    /// Human-readable reason without the variant prefix.
    pub fn reason(&self) -> String {
        match self {
            QueueError::QueueUnavailable(reason)
            | QueueError::BrokerConnectionLost(reason)
            | QueueError::InvalidPayload(reason)
            | QueueError::Config(reason) => reason.clone(),
            QueueError::HandlerFailure { message, .. } => message.clone(),
        }
    }

    /// Convert any error into the producer-facing `QueueUnavailable`.
    pub(crate) fn into_unavailable(self) -> Self {
        match self {
            QueueError::QueueUnavailable(_) => self,
            other => QueueError::QueueUnavailable(other.reason()),
        }
    }
}

impl From<ConfigError> for QueueError {
    fn from(err: ConfigError) -> Self {
        QueueError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(QueueError::transient("x").category(), ErrorCategory::Transient);
        assert_eq!(QueueError::permanent("x").category(), ErrorCategory::Permanent);
        assert_eq!(
            QueueError::InvalidPayload("bad utf-8".into()).category(),
            ErrorCategory::Permanent
        );
        assert_eq!(
            QueueError::BrokerConnectionLost("reset".into()).category(),
            ErrorCategory::Transient
        );
    }

    #[test]
    fn test_into_unavailable_keeps_reason() {
        let err = QueueError::broker("connect", "connection refused").into_unavailable();
        assert!(matches!(err, QueueError::QueueUnavailable(_)));
        assert_eq!(err.reason(), "connect: connection refused");
        assert_eq!(err.to_string(), "Queue unavailable: connect: connection refused");
    }

    #[test]
    fn test_config_error_conversion() {
        let err: QueueError = ConfigError::MissingEnvVar("RMQ_HOST".into()).into();
        assert!(matches!(err, QueueError::Config(_)));
        assert!(err.to_string().contains("RMQ_HOST"));
    }
}
