//! Member Model

use serde::{Deserialize, Serialize};

/// Loyalty tier (会员等级), ordered from lowest to highest
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Member,
    Silver,
    Gold,
    Diamond,
}

impl Tier {
    /// All tiers in ascending order
    pub const ALL: [Tier; 4] = [Tier::Member, Tier::Silver, Tier::Gold, Tier::Diamond];

    /// Cumulative completed-order spending needed to reach this tier (inclusive)
    pub const fn threshold(&self) -> i64 {
        match self {
            Tier::Member => 0,
            Tier::Silver => 1_000_000,
            Tier::Gold => 5_000_000,
            Tier::Diamond => 10_000_000,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Member => write!(f, "MEMBER"),
            Tier::Silver => write!(f, "SILVER"),
            Tier::Gold => write!(f, "GOLD"),
            Tier::Diamond => write!(f, "DIAMOND"),
        }
    }
}

/// Spending profile of a customer
///
/// Only completed orders contribute. The tier is not stored; it is always
/// derived from `total_spent`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpendingProfile {
    pub user_id: String,
    pub total_spent: i64,
    pub points: i64,
    pub completed_orders: u32,
    pub updated_at: i64,
}

impl SpendingProfile {
    /// Profile of a customer with no completed orders
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            total_spent: 0,
            points: 0,
            completed_orders: 0,
            updated_at: 0,
        }
    }

    /// Copy with one more completed order of `amount` earning `points`
    ///
    /// Saturates instead of overflowing; spending is never negative.
    pub fn with_completed_order(&self, amount: i64, points: i64, at: i64) -> Self {
        Self {
            user_id: self.user_id.clone(),
            total_spent: self.total_spent.saturating_add(amount.max(0)),
            points: self.points.saturating_add(points.max(0)),
            completed_orders: self.completed_orders.saturating_add(1),
            updated_at: at,
        }
    }
}
