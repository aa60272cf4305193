//! Rank Engine
//!
//! Maps cumulative completed-order spending to a loyalty tier and order totals
//! to loyalty points. Pure functions, no storage access.

use crate::utils::error::{SettlementError, SettlementResult};
use shared::models::Tier;

/// Highest tier whose threshold is `<= spending` (thresholds are inclusive)
pub fn tier_for_spending(spending: i64) -> SettlementResult<Tier> {
    if spending < 0 {
        return Err(SettlementError::InvalidArgument(format!(
            "spending must not be negative, got {}",
            spending
        )));
    }
    Ok(Tier::ALL
        .iter()
        .rev()
        .find(|tier| tier.threshold() <= spending)
        .copied()
        .unwrap_or(Tier::Member))
}

/// Tier directly above `tier`, None at the top
pub fn next_tier(tier: Tier) -> Option<Tier> {
    match tier {
        Tier::Member => Some(Tier::Silver),
        Tier::Silver => Some(Tier::Gold),
        Tier::Gold => Some(Tier::Diamond),
        Tier::Diamond => None,
    }
}

/// Spending still needed to reach the next tier, None at the top
pub fn amount_to_next_tier(spending: i64) -> SettlementResult<Option<i64>> {
    let tier = tier_for_spending(spending)?;
    Ok(next_tier(tier).map(|next| next.threshold() - spending))
}

/// Points earned by completing an order of `total` (truncated)
///
/// Non-positive totals or rates earn nothing.
pub fn points_for_order_total(total: i64, points_per_unit: i64) -> i64 {
    if total <= 0 || points_per_unit <= 0 {
        return 0;
    }
    total / points_per_unit
}
