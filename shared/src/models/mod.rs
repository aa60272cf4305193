//! Domain models shared by the engine and its callers

pub mod member;
pub mod voucher;

pub use member::{SpendingProfile, Tier};
pub use voucher::{DiscountKind, Voucher, VoucherAudience, VoucherDraft, VoucherScope};

use thiserror::Error;

/// Validation errors raised by the model factories
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{0} must not be negative")]
    Negative(&'static str),

    #[error("{0}")]
    Invalid(String),

    #[error("amount overflow while computing {0}")]
    Overflow(&'static str),

    #[error("no redemption left for user {0}")]
    QuotaExhausted(String),
}
