//! Unified error codes for the settlement engine
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Order errors
//! - 5xxx: Voucher errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so that checkout clients can
/// switch on them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Negative or malformed input
    InvalidArgument = 2,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Action not allowed for the order's current status or the actor's role
    InvalidTransition = 4002,
    /// Rejection requires a reason of at least 10 characters
    MissingRejectionReason = 4003,

    // ==================== 5xxx: Voucher ====================
    /// Voucher not found
    VoucherNotFound = 5001,
    /// Another active voucher already uses this code
    DuplicateVoucherCode = 5002,
    /// Voucher validity period has ended
    VoucherExpired = 5003,
    /// Voucher validity period has not started yet
    VoucherNotStarted = 5004,
    /// Voucher has been deactivated
    VoucherInactive = 5005,
    /// Voucher not assigned to the user, already used, or sold out
    VoucherNotEligible = 5006,
    /// Voucher applied to the wrong part of the order
    VoucherScopeMismatch = 5007,
    /// Order subtotal below the voucher's minimum
    MinOrderNotMet = 5008,

    // ==================== 9xxx: System ====================
    /// Concurrent update lost the race, retry the whole operation
    ConcurrentConflict = 9001,
    /// Storage backend failure
    StorageError = 9002,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Whether the caller may retry the same request unchanged
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::ConcurrentConflict)
    }

    /// Get the user-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::InvalidArgument => "Invalid input",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::InvalidTransition => "This action is not allowed for the order right now",
            ErrorCode::MissingRejectionReason => {
                "Please give a rejection reason of at least 10 characters"
            }

            // Voucher
            ErrorCode::VoucherNotFound => "Voucher code does not exist",
            ErrorCode::DuplicateVoucherCode => "An active voucher with this code already exists",
            ErrorCode::VoucherExpired => "Voucher has expired",
            ErrorCode::VoucherNotStarted => "Voucher is not valid yet",
            ErrorCode::VoucherInactive => "Voucher is no longer available",
            ErrorCode::VoucherNotEligible => "You are not eligible to use this voucher",
            ErrorCode::VoucherScopeMismatch => "Voucher cannot be applied to this part of the order",
            ErrorCode::MinOrderNotMet => "Order value is below the voucher minimum",

            // System
            ErrorCode::ConcurrentConflict => "System busy, please try again",
            ErrorCode::StorageError => "Storage error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code as u16
    }
}

/// Error returned when converting an unknown u16 into an [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(ErrorCode::InvalidArgument),

            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::InvalidTransition),
            4003 => Ok(ErrorCode::MissingRejectionReason),

            5001 => Ok(ErrorCode::VoucherNotFound),
            5002 => Ok(ErrorCode::DuplicateVoucherCode),
            5003 => Ok(ErrorCode::VoucherExpired),
            5004 => Ok(ErrorCode::VoucherNotStarted),
            5005 => Ok(ErrorCode::VoucherInactive),
            5006 => Ok(ErrorCode::VoucherNotEligible),
            5007 => Ok(ErrorCode::VoucherScopeMismatch),
            5008 => Ok(ErrorCode::MinOrderNotMet),

            9001 => Ok(ErrorCode::ConcurrentConflict),
            9002 => Ok(ErrorCode::StorageError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::InvalidArgument.code(), 2);
        assert_eq!(ErrorCode::InvalidTransition.code(), 4002);
        assert_eq!(ErrorCode::VoucherNotEligible.code(), 5006);
        assert_eq!(ErrorCode::ConcurrentConflict.code(), 9001);
    }

    #[test]
    fn test_only_conflict_is_retryable() {
        assert!(ErrorCode::ConcurrentConflict.is_retryable());
        assert!(!ErrorCode::StorageError.is_retryable());
        assert!(!ErrorCode::VoucherNotEligible.is_retryable());
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_string(&ErrorCode::VoucherExpired).unwrap();
        assert_eq!(json, "5003");

        let json = serde_json::to_string(&ErrorCode::InvalidArgument).unwrap();
        assert_eq!(json, "2");
    }

    #[test]
    fn test_deserialize() {
        let code: ErrorCode = serde_json::from_str("4003").unwrap();
        assert_eq!(code, ErrorCode::MissingRejectionReason);

        let code: ErrorCode = serde_json::from_str("5002").unwrap();
        assert_eq!(code, ErrorCode::DuplicateVoucherCode);
    }

    #[test]
    fn test_deserialize_invalid() {
        let result: Result<ErrorCode, _> = serde_json::from_str("0");
        assert!(result.is_err());

        let result: Result<ErrorCode, _> = serde_json::from_str("999");
        assert!(result.is_err());

        let result: Result<ErrorCode, _> = serde_json::from_str("5999");
        assert!(result.is_err());
    }

    #[test]
    fn test_every_code_roundtrips_through_u16() {
        let codes = [
            ErrorCode::InvalidArgument,
            ErrorCode::OrderNotFound,
            ErrorCode::InvalidTransition,
            ErrorCode::MissingRejectionReason,
            ErrorCode::VoucherNotFound,
            ErrorCode::DuplicateVoucherCode,
            ErrorCode::VoucherExpired,
            ErrorCode::VoucherNotStarted,
            ErrorCode::VoucherInactive,
            ErrorCode::VoucherNotEligible,
            ErrorCode::VoucherScopeMismatch,
            ErrorCode::MinOrderNotMet,
            ErrorCode::ConcurrentConflict,
            ErrorCode::StorageError,
        ];

        for code in codes {
            let raw: u16 = code.into();
            assert_eq!(ErrorCode::try_from(raw), Ok(code));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ErrorCode::OrderNotFound), "4001");
        assert_eq!(format!("{}", InvalidErrorCode(42)), "invalid error code: 42");
    }
}
