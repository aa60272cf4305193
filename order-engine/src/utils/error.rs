//! 结算错误 - 引擎内部错误与对外 AppError 的映射

use crate::orders::storage::StorageError;
use crate::vouchers::Ineligibility;
use shared::error::{AppError, ErrorCode};
use shared::models::{ModelError, VoucherScope};
use shared::order::{OrderAction, OrderStatus};
use thiserror::Error;

/// Settlement errors
///
/// Every kind maps to a stable [`ErrorCode`]; only `ConcurrentConflict` is
/// retried inside the engine.
#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("Voucher not found: {0}")]
    VoucherNotFound(String),

    #[error("Voucher code already in use: {0}")]
    DuplicateVoucherCode(String),

    #[error("Voucher expired: {0}")]
    VoucherExpired(String),

    #[error("Voucher not started yet: {0}")]
    VoucherNotStarted(String),

    #[error("Voucher inactive: {0}")]
    VoucherInactive(String),

    #[error("Voucher {voucher_id} not eligible: {reason}")]
    VoucherNotEligible {
        voucher_id: String,
        reason: Ineligibility,
    },

    #[error("Voucher {voucher_id} has scope {actual}, expected {expected}")]
    VoucherScopeMismatch {
        voucher_id: String,
        expected: VoucherScope,
        actual: VoucherScope,
    },

    #[error("Minimum order value {min_order_value} not met by subtotal {subtotal}")]
    MinOrderNotMet { min_order_value: i64, subtotal: i64 },

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Cannot {action} order {order_id} in status {status}")]
    InvalidTransition {
        order_id: String,
        status: OrderStatus,
        action: OrderAction,
    },

    #[error("Rejection reason must be at least {min_chars} characters")]
    MissingRejectionReason { min_chars: usize },

    #[error("Concurrent update conflict: {0}")]
    ConcurrentConflict(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl SettlementError {
    /// Caller-facing error code
    pub fn code(&self) -> ErrorCode {
        match self {
            SettlementError::VoucherNotFound(_) => ErrorCode::VoucherNotFound,
            SettlementError::DuplicateVoucherCode(_) => ErrorCode::DuplicateVoucherCode,
            SettlementError::VoucherExpired(_) => ErrorCode::VoucherExpired,
            SettlementError::VoucherNotStarted(_) => ErrorCode::VoucherNotStarted,
            SettlementError::VoucherInactive(_) => ErrorCode::VoucherInactive,
            SettlementError::VoucherNotEligible { .. } => ErrorCode::VoucherNotEligible,
            SettlementError::VoucherScopeMismatch { .. } => ErrorCode::VoucherScopeMismatch,
            SettlementError::MinOrderNotMet { .. } => ErrorCode::MinOrderNotMet,
            SettlementError::OrderNotFound(_) => ErrorCode::OrderNotFound,
            SettlementError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            SettlementError::MissingRejectionReason { .. } => ErrorCode::MissingRejectionReason,
            SettlementError::ConcurrentConflict(_) => ErrorCode::ConcurrentConflict,
            SettlementError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            SettlementError::Storage(_) => ErrorCode::StorageError,
        }
    }

    /// Only version conflicts are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, SettlementError::ConcurrentConflict(_))
    }
}

impl From<StorageError> for SettlementError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict { .. } => SettlementError::ConcurrentConflict(err.to_string()),
            other => SettlementError::Storage(other),
        }
    }
}

impl From<ModelError> for SettlementError {
    fn from(err: ModelError) -> Self {
        SettlementError::InvalidArgument(err.to_string())
    }
}

impl From<SettlementError> for AppError {
    fn from(err: SettlementError) -> Self {
        let code = err.code();
        match err {
            SettlementError::Storage(e) => {
                tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
                AppError::new(code).with_detail("cause", e.to_string())
            }
            SettlementError::VoucherNotFound(code_or_id) => {
                AppError::new(code).with_detail("voucher", code_or_id)
            }
            SettlementError::DuplicateVoucherCode(voucher_code) => {
                AppError::new(code).with_detail("code", voucher_code)
            }
            SettlementError::VoucherExpired(id)
            | SettlementError::VoucherNotStarted(id)
            | SettlementError::VoucherInactive(id) => {
                AppError::new(code).with_detail("voucher_id", id)
            }
            SettlementError::VoucherNotEligible { voucher_id, reason } => AppError::new(code)
                .with_detail("voucher_id", voucher_id)
                .with_detail("reason", reason.to_string()),
            SettlementError::VoucherScopeMismatch {
                voucher_id,
                expected,
                actual,
            } => AppError::new(code)
                .with_detail("voucher_id", voucher_id)
                .with_detail("expected", expected.to_string())
                .with_detail("actual", actual.to_string()),
            SettlementError::MinOrderNotMet {
                min_order_value,
                subtotal,
            } => AppError::new(code)
                .with_detail("min_order_value", min_order_value)
                .with_detail("subtotal", subtotal),
            SettlementError::OrderNotFound(order_id) => {
                AppError::new(code).with_detail("order_id", order_id)
            }
            SettlementError::InvalidTransition {
                order_id,
                status,
                action,
            } => AppError::new(code)
                .with_detail("order_id", order_id)
                .with_detail("status", status.to_string())
                .with_detail("action", action.to_string()),
            SettlementError::MissingRejectionReason { min_chars } => {
                AppError::new(code).with_detail("min_chars", min_chars)
            }
            SettlementError::ConcurrentConflict(msg) => AppError::with_message(code, msg),
            SettlementError::InvalidArgument(msg) => AppError::invalid_argument(msg),
        }
    }
}

pub type SettlementResult<T> = Result<T, SettlementError>;
