//! Order Ledger - status state machine
//!
//! | From | Action | Actor | To |
//! |------|--------|-------|----|
//! | PENDING | APPROVE | staff | PROCESSING |
//! | PENDING | REJECT | staff | REJECTED (reason ≥ 10 chars) |
//! | PROCESSING | COMPLETE | staff | COMPLETED |
//! | PENDING / PROCESSING | CANCEL | customer (own order) or staff | CANCELLED |
//!
//! Everything else is `InvalidTransition` and leaves the order unchanged.
//! DELIVERING can be stored by delivery integrations but no action moves an
//! order into or out of it here.

use crate::utils::error::{SettlementError, SettlementResult};
use shared::order::{Actor, ActorRole, Order, OrderAction, OrderStatus};

/// Minimum rejection reason length, in characters after trimming
pub const MIN_REJECTION_REASON_CHARS: usize = 10;

/// Target status for `(status, action, role)`, None when not allowed
///
/// Total over all combinations; ownership is checked by [`apply`].
pub fn next_status(status: OrderStatus, action: OrderAction, role: ActorRole) -> Option<OrderStatus> {
    use ActorRole::*;
    use OrderAction::*;
    use OrderStatus::*;

    match (status, action, role) {
        (Pending, Approve, Staff) => Some(Processing),
        (Pending, Reject, Staff) => Some(Rejected),
        (Processing, Complete, Staff) => Some(Completed),
        (Pending | Processing, Cancel, Customer | Staff) => Some(Cancelled),
        _ => None,
    }
}

/// Validate and apply `action` to `order`, returning the next value
///
/// The input order is never modified. A rejection reason is trimmed before it
/// is stored.
pub fn apply(
    order: &Order,
    action: OrderAction,
    actor: &Actor,
    reason: Option<&str>,
    now: i64,
) -> SettlementResult<Order> {
    let invalid = || SettlementError::InvalidTransition {
        order_id: order.id().to_string(),
        status: order.status(),
        action,
    };

    let next = next_status(order.status(), action, actor.role).ok_or_else(invalid)?;

    if actor.role == ActorRole::Customer && actor.user_id != order.user_id() {
        return Err(invalid());
    }

    let rejection_reason = if action == OrderAction::Reject {
        let reason = reason.map(str::trim).unwrap_or_default();
        if reason.chars().count() < MIN_REJECTION_REASON_CHARS {
            return Err(SettlementError::MissingRejectionReason {
                min_chars: MIN_REJECTION_REASON_CHARS,
            });
        }
        Some(reason.to_string())
    } else {
        None
    };

    Ok(order.with_status(next, rejection_reason, now))
}
