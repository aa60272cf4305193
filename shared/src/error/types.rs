//! Error type returned to checkout and order-management callers

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
///
/// This is what callers outside the engine see:
/// - a stable [`ErrorCode`] to switch on
/// - a message (defaults to the code's user-facing message)
/// - optional structured details (voucher id, order status, ...)
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Whether the caller should retry the whole request
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidArgument, msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_default_message() {
        let err = AppError::new(ErrorCode::VoucherExpired);
        assert_eq!(err.code, ErrorCode::VoucherExpired);
        assert_eq!(err.message, "Voucher has expired");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_with_detail() {
        let err = AppError::new(ErrorCode::InvalidTransition)
            .with_detail("status", "COMPLETED")
            .with_detail("action", "CANCEL");
        let details = err.details.unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details["status"], "COMPLETED");
    }

    #[test]
    fn test_invalid_argument_keeps_message() {
        let err = AppError::invalid_argument("delivery fee must not be negative");
        assert_eq!(err.code, ErrorCode::InvalidArgument);
        assert_eq!(err.message, "delivery fee must not be negative");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_retryable() {
        assert!(AppError::new(ErrorCode::ConcurrentConflict).is_retryable());
        assert!(!AppError::invalid_argument("bad").is_retryable());
    }

    #[test]
    fn test_serialize_skips_empty_details() {
        let err = AppError::new(ErrorCode::MinOrderNotMet);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], 5008);
        assert!(json.get("details").is_none());
    }
}
