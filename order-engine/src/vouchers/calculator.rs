//! Discount Calculator
//!
//! Computes the discount breakdown of an order from its subtotal, delivery fee
//! and up to two vouchers (one PRODUCT, one SHIPPING). The two vouchers are
//! independent; neither sees the other's discount.
//!
//! Per voucher:
//! - subtotal below `min_order_value` → `MinOrderNotMet`
//! - raw = PERCENT ? subtotal × value / 100 (truncated) : value
//! - `max_discount_value > 0` caps raw
//! - product discount ≤ subtotal, shipping discount ≤ delivery fee

use crate::utils::error::{SettlementError, SettlementResult};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use shared::models::{DiscountKind, Voucher, VoucherScope};
use shared::order::frozen_total;

/// Discount breakdown and payable total
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscountResult {
    pub subtotal: i64,
    pub product_discount: i64,
    pub shipping_discount: i64,
    pub delivery_fee: i64,
    /// `max(0, subtotal − product_discount − shipping_discount + delivery_fee)`
    pub total: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_voucher_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_voucher_id: Option<String>,
}

/// Compute the discount breakdown
///
/// # Arguments
/// * `subtotal` - Σ line totals, must not be negative
/// * `product_voucher` - PRODUCT-scope voucher, if any
/// * `shipping_voucher` - SHIPPING-scope voucher, if any
/// * `delivery_fee` - must not be negative
pub fn compute(
    subtotal: i64,
    product_voucher: Option<&Voucher>,
    shipping_voucher: Option<&Voucher>,
    delivery_fee: i64,
) -> SettlementResult<DiscountResult> {
    if subtotal < 0 {
        return Err(SettlementError::InvalidArgument(format!(
            "subtotal must not be negative, got {}",
            subtotal
        )));
    }
    if delivery_fee < 0 {
        return Err(SettlementError::InvalidArgument(format!(
            "delivery fee must not be negative, got {}",
            delivery_fee
        )));
    }

    let product_discount = match product_voucher {
        Some(v) => {
            require_scope(v, VoucherScope::Product)?;
            voucher_discount(v, subtotal)?.min(subtotal)
        }
        None => 0,
    };
    let shipping_discount = match shipping_voucher {
        Some(v) => {
            require_scope(v, VoucherScope::Shipping)?;
            voucher_discount(v, subtotal)?.min(delivery_fee)
        }
        None => 0,
    };

    let total = frozen_total(subtotal, product_discount, shipping_discount, delivery_fee)?;

    Ok(DiscountResult {
        subtotal,
        product_discount,
        shipping_discount,
        delivery_fee,
        total,
        product_voucher_id: product_voucher.map(|v| v.id().to_string()),
        shipping_voucher_id: shipping_voucher.map(|v| v.id().to_string()),
    })
}

fn require_scope(voucher: &Voucher, expected: VoucherScope) -> SettlementResult<()> {
    if voucher.scope() != expected {
        return Err(SettlementError::VoucherScopeMismatch {
            voucher_id: voucher.id().to_string(),
            expected,
            actual: voucher.scope(),
        });
    }
    Ok(())
}

/// Discount of one voucher before the subtotal / delivery-fee cap
fn voucher_discount(voucher: &Voucher, subtotal: i64) -> SettlementResult<i64> {
    if subtotal < voucher.min_order_value() {
        return Err(SettlementError::MinOrderNotMet {
            min_order_value: voucher.min_order_value(),
            subtotal,
        });
    }

    let raw = match voucher.discount_kind() {
        DiscountKind::Percent => percent_of(subtotal, voucher.discount_value())?,
        DiscountKind::Amount => voucher.discount_value(),
    };

    if voucher.max_discount_value() > 0 {
        Ok(raw.min(voucher.max_discount_value()))
    } else {
        Ok(raw)
    }
}

/// `amount × percent / 100`, truncated toward zero
fn percent_of(amount: i64, percent: i64) -> SettlementResult<i64> {
    let value = Decimal::from(amount) * Decimal::from(percent) / Decimal::ONE_HUNDRED;
    value.trunc().to_i64().ok_or_else(|| {
        SettlementError::InvalidArgument(format!("{}% of {} is out of range", percent, amount))
    })
}
