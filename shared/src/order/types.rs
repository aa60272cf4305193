//! Shared types for orders: items, actors and actions

use crate::models::ModelError;
use serde::{Deserialize, Serialize};

// ============================================================================
// Item Types
// ============================================================================

/// Selected topping on an item (price per unit of the item)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Topping {
    pub name: String,
    pub price: i64,
}

/// Order line as chosen by the customer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderItem {
    /// Product ID
    pub product_id: String,
    /// Product name snapshot
    pub name: String,
    /// Unit price snapshot (tax-inclusive)
    pub unit_price: i64,
    /// Quantity
    pub quantity: i64,
    /// Selected toppings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub toppings: Vec<Topping>,
    /// Item note
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl OrderItem {
    /// `(unit_price + Σ topping.price) × quantity`
    pub fn line_total(&self) -> Result<i64, ModelError> {
        if self.quantity <= 0 {
            return Err(ModelError::Invalid(format!(
                "quantity must be positive, got {}",
                self.quantity
            )));
        }
        if self.unit_price < 0 {
            return Err(ModelError::Negative("unit_price"));
        }
        let mut unit = self.unit_price;
        for topping in &self.toppings {
            if topping.price < 0 {
                return Err(ModelError::Negative("topping price"));
            }
            unit = unit
                .checked_add(topping.price)
                .ok_or(ModelError::Overflow("line total"))?;
        }
        unit.checked_mul(self.quantity)
            .ok_or(ModelError::Overflow("line total"))
    }
}

/// Sum of all line totals; fails on empty or invalid items
pub fn subtotal_of(items: &[OrderItem]) -> Result<i64, ModelError> {
    if items.is_empty() {
        return Err(ModelError::Required("items"));
    }
    items.iter().try_fold(0i64, |acc, item| {
        acc.checked_add(item.line_total()?)
            .ok_or(ModelError::Overflow("subtotal"))
    })
}

// ============================================================================
// Actors
// ============================================================================

/// Role supplied by the identity context
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorRole {
    Customer,
    Staff,
}

/// Authenticated caller performing an action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn customer(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: ActorRole::Customer,
        }
    }

    pub fn staff(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: ActorRole::Staff,
        }
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Status-changing action on an existing order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderAction {
    Approve,
    Reject,
    Complete,
    Cancel,
}

impl OrderAction {
    pub const ALL: [OrderAction; 4] = [
        OrderAction::Approve,
        OrderAction::Reject,
        OrderAction::Complete,
        OrderAction::Cancel,
    ];
}

impl std::fmt::Display for OrderAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderAction::Approve => write!(f, "APPROVE"),
            OrderAction::Reject => write!(f, "REJECT"),
            OrderAction::Complete => write!(f, "COMPLETE"),
            OrderAction::Cancel => write!(f, "CANCEL"),
        }
    }
}
