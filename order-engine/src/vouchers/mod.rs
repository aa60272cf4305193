//! Voucher Module
//!
//! - **catalog**: voucher lookup by code/id, creation and deactivation
//! - **eligibility**: may this user redeem this voucher now, and how often
//! - **calculator**: discount breakdown and payable total
//!
//! # Checkout Flow
//!
//! ```text
//! code ─→ VoucherCatalog::find_by_code
//!              ↓
//!         eligibility::evaluate(voucher, user, now)
//!              ↓
//!         calculator::compute(subtotal, product?, shipping?, fee)
//!              ↓
//!         OrderLedger (order frozen in PENDING)
//! ```

pub mod calculator;
pub mod catalog;
pub mod eligibility;

pub use calculator::{DiscountResult, compute};
pub use catalog::VoucherCatalog;
pub use eligibility::{Eligibility, Ineligibility, evaluate};
