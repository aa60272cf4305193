//! Marketing Module
//!
//! - **rank**: loyalty tier and points derived from completed-order spending

pub mod rank;

pub use rank::{amount_to_next_tier, next_tier, points_for_order_total, tier_for_spending};
