use super::*;
use shared::error::{AppError, ErrorCode};
use shared::models::{DiscountKind, VoucherAudience};
use std::collections::{BTreeMap, BTreeSet};

mod test_concurrency;

const DAY: i64 = 86_400_000;

fn create_test_manager() -> OrdersManager {
    OrdersManager::in_memory()
}

/// Public voucher valid from yesterday until tomorrow
fn public_draft(code: &str, kind: DiscountKind, value: i64, scope: VoucherScope) -> VoucherDraft {
    let now = now_millis();
    VoucherDraft {
        code: code.to_string(),
        discount_kind: kind,
        discount_value: value,
        min_order_value: 0,
        max_discount_value: 0,
        start_date: now - DAY,
        end_date: now + DAY,
        scope,
        assigned_user_ids: BTreeSet::new(),
        total_quantity: 0,
        user_quantities: BTreeMap::new(),
    }
}

/// Private AMOUNT voucher with one quota entry per assigned user
fn private_draft(code: &str, value: i64, quotas: &[(&str, u32)]) -> VoucherDraft {
    VoucherDraft {
        assigned_user_ids: quotas.iter().map(|(u, _)| u.to_string()).collect(),
        user_quantities: quotas.iter().map(|(u, q)| (u.to_string(), *q)).collect(),
        ..public_draft(code, DiscountKind::Amount, value, VoucherScope::Product)
    }
}

fn item(name: &str, unit_price: i64, quantity: i64) -> OrderItem {
    OrderItem {
        product_id: format!("p-{}", name),
        name: name.to_string(),
        unit_price,
        quantity,
        toppings: vec![],
        note: None,
    }
}

fn checkout(user_id: &str, amount: i64) -> CheckoutRequest {
    CheckoutRequest {
        user_id: user_id.to_string(),
        items: vec![item("Phở bò", amount, 1)],
        product_voucher_code: None,
        shipping_voucher_code: None,
        delivery_fee: 0,
        delivery_address: None,
        note: None,
    }
}

fn checkout_with_code(user_id: &str, amount: i64, code: &str) -> CheckoutRequest {
    CheckoutRequest {
        product_voucher_code: Some(code.to_string()),
        ..checkout(user_id, amount)
    }
}

/// Place an order and move it all the way to COMPLETED
fn complete_order(manager: &OrdersManager, user_id: &str, amount: i64) -> Order {
    let staff = Actor::staff("staff-1");
    let order = manager.create_order(checkout(user_id, amount)).unwrap();
    manager
        .transition_order(order.id(), OrderAction::Approve, &staff, None)
        .unwrap();
    manager
        .transition_order(order.id(), OrderAction::Complete, &staff, None)
        .unwrap()
}

fn public_used_by(voucher: &Voucher) -> usize {
    match voucher.audience() {
        VoucherAudience::Public {
            used_by_user_ids, ..
        } => used_by_user_ids.len(),
        VoucherAudience::Private { .. } => panic!("expected a public voucher"),
    }
}

fn private_quota(voucher: &Voucher, user_id: &str) -> u32 {
    match voucher.audience() {
        VoucherAudience::Private {
            user_quantities, ..
        } => user_quantities.get(user_id).copied().unwrap_or(0),
        VoucherAudience::Public { .. } => panic!("expected a private voucher"),
    }
}
