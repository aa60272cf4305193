//! Order record - frozen at checkout, then only its status moves
//!
//! The totals (`subtotal`, discounts, `delivery_fee`, `total`) and the voucher
//! references are fixed by [`Order::place`]. Later transitions go through
//! [`Order::with_status`], which touches status bookkeeping only.

use super::types::{OrderItem, subtotal_of};
use crate::models::ModelError;
use serde::{Deserialize, Serialize};

/// Order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Delivering,
    Completed,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Delivering,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
        OrderStatus::Rejected,
    ];

    /// Completed, cancelled and rejected orders never change again
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "PENDING"),
            OrderStatus::Processing => write!(f, "PROCESSING"),
            OrderStatus::Delivering => write!(f, "DELIVERING"),
            OrderStatus::Completed => write!(f, "COMPLETED"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
            OrderStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// Everything checkout decided about a new order
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: String,
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub product_discount: i64,
    pub shipping_discount: i64,
    pub delivery_fee: i64,
    pub product_voucher_id: Option<String>,
    pub shipping_voucher_id: Option<String>,
    pub delivery_address: Option<String>,
    pub note: Option<String>,
    pub created_at: i64,
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "OrderRecord")]
pub struct Order {
    id: String,
    user_id: String,
    items: Vec<OrderItem>,
    subtotal: i64,
    product_discount: i64,
    shipping_discount: i64,
    delivery_fee: i64,
    total: i64,
    status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_voucher_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shipping_voucher_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    delivery_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    created_at: i64,
    updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejected_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cancelled_at: Option<i64>,
}

/// Unvalidated wire/storage layout of [`Order`]
#[derive(Debug, Clone, Deserialize)]
struct OrderRecord {
    id: String,
    user_id: String,
    items: Vec<OrderItem>,
    subtotal: i64,
    product_discount: i64,
    shipping_discount: i64,
    delivery_fee: i64,
    total: i64,
    status: OrderStatus,
    #[serde(default)]
    product_voucher_id: Option<String>,
    #[serde(default)]
    shipping_voucher_id: Option<String>,
    #[serde(default)]
    rejection_reason: Option<String>,
    #[serde(default)]
    delivery_address: Option<String>,
    #[serde(default)]
    note: Option<String>,
    created_at: i64,
    updated_at: i64,
    #[serde(default)]
    rejected_at: Option<i64>,
    #[serde(default)]
    completed_at: Option<i64>,
    #[serde(default)]
    cancelled_at: Option<i64>,
}

impl TryFrom<OrderRecord> for Order {
    type Error = ModelError;

    fn try_from(r: OrderRecord) -> Result<Self, Self::Error> {
        let order = Self {
            id: r.id,
            user_id: r.user_id,
            items: r.items,
            subtotal: r.subtotal,
            product_discount: r.product_discount,
            shipping_discount: r.shipping_discount,
            delivery_fee: r.delivery_fee,
            total: r.total,
            status: r.status,
            product_voucher_id: r.product_voucher_id,
            shipping_voucher_id: r.shipping_voucher_id,
            rejection_reason: r.rejection_reason,
            delivery_address: r.delivery_address,
            note: r.note,
            created_at: r.created_at,
            updated_at: r.updated_at,
            rejected_at: r.rejected_at,
            completed_at: r.completed_at,
            cancelled_at: r.cancelled_at,
        };
        if subtotal_of(&order.items)? != order.subtotal {
            return Err(ModelError::Invalid(format!(
                "order {} subtotal does not match its items",
                order.id
            )));
        }
        if order.total != frozen_total(
            order.subtotal,
            order.product_discount,
            order.shipping_discount,
            order.delivery_fee,
        )? {
            return Err(ModelError::Invalid(format!(
                "order {} total does not match its discounts",
                order.id
            )));
        }
        if order.status == OrderStatus::Rejected && order.rejection_reason.is_none() {
            return Err(ModelError::Required("rejection_reason"));
        }
        Ok(order)
    }
}

/// `max(0, subtotal − product_discount − shipping_discount + delivery_fee)`
pub fn frozen_total(
    subtotal: i64,
    product_discount: i64,
    shipping_discount: i64,
    delivery_fee: i64,
) -> Result<i64, ModelError> {
    subtotal
        .checked_sub(product_discount)
        .and_then(|v| v.checked_sub(shipping_discount))
        .and_then(|v| v.checked_add(delivery_fee))
        .map(|v| v.max(0))
        .ok_or(ModelError::Overflow("total"))
}

impl Order {
    /// Freeze a checkout into a PENDING order
    pub fn place(new: NewOrder) -> Result<Self, ModelError> {
        if new.id.trim().is_empty() {
            return Err(ModelError::Required("id"));
        }
        if new.user_id.trim().is_empty() {
            return Err(ModelError::Required("user_id"));
        }
        if new.delivery_fee < 0 {
            return Err(ModelError::Negative("delivery_fee"));
        }
        if new.product_discount < 0 {
            return Err(ModelError::Negative("product_discount"));
        }
        if new.shipping_discount < 0 {
            return Err(ModelError::Negative("shipping_discount"));
        }

        let subtotal = subtotal_of(&new.items)?;
        if new.product_discount > subtotal {
            return Err(ModelError::Invalid(
                "product discount exceeds subtotal".into(),
            ));
        }
        if new.shipping_discount > new.delivery_fee {
            return Err(ModelError::Invalid(
                "shipping discount exceeds delivery fee".into(),
            ));
        }
        let total = frozen_total(
            subtotal,
            new.product_discount,
            new.shipping_discount,
            new.delivery_fee,
        )?;

        Ok(Self {
            id: new.id,
            user_id: new.user_id,
            items: new.items,
            subtotal,
            product_discount: new.product_discount,
            shipping_discount: new.shipping_discount,
            delivery_fee: new.delivery_fee,
            total,
            status: OrderStatus::Pending,
            product_voucher_id: new.product_voucher_id,
            shipping_voucher_id: new.shipping_voucher_id,
            rejection_reason: None,
            delivery_address: new.delivery_address,
            note: new.note,
            created_at: new.created_at,
            updated_at: new.created_at,
            rejected_at: None,
            completed_at: None,
            cancelled_at: None,
        })
    }

    /// Copy with a new status and the matching timestamps
    ///
    /// Does not check whether the move is allowed; the ledger's transition
    /// table does that before calling this.
    pub fn with_status(&self, status: OrderStatus, rejection_reason: Option<String>, at: i64) -> Self {
        let mut next = self.clone();
        next.status = status;
        next.updated_at = at;
        match status {
            OrderStatus::Rejected => {
                next.rejection_reason = rejection_reason;
                next.rejected_at = Some(at);
            }
            OrderStatus::Completed => next.completed_at = Some(at),
            OrderStatus::Cancelled => next.cancelled_at = Some(at),
            OrderStatus::Pending | OrderStatus::Processing | OrderStatus::Delivering => {}
        }
        next
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn subtotal(&self) -> i64 {
        self.subtotal
    }

    pub fn product_discount(&self) -> i64 {
        self.product_discount
    }

    pub fn shipping_discount(&self) -> i64 {
        self.shipping_discount
    }

    pub fn delivery_fee(&self) -> i64 {
        self.delivery_fee
    }

    /// Frozen payable amount
    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn product_voucher_id(&self) -> Option<&str> {
        self.product_voucher_id.as_deref()
    }

    pub fn shipping_voucher_id(&self) -> Option<&str> {
        self.shipping_voucher_id.as_deref()
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn delivery_address(&self) -> Option<&str> {
        self.delivery_address.as_deref()
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn updated_at(&self) -> i64 {
        self.updated_at
    }

    pub fn rejected_at(&self) -> Option<i64> {
        self.rejected_at
    }

    pub fn completed_at(&self) -> Option<i64> {
        self.completed_at
    }

    pub fn cancelled_at(&self) -> Option<i64> {
        self.cancelled_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::types::Topping;

    fn items() -> Vec<OrderItem> {
        vec![OrderItem {
            product_id: "p1".to_string(),
            name: "Cơm tấm".to_string(),
            unit_price: 45_000,
            quantity: 2,
            toppings: vec![Topping {
                name: "Chả".to_string(),
                price: 10_000,
            }],
            note: None,
        }]
    }

    fn new_order(product_discount: i64, shipping_discount: i64, fee: i64) -> NewOrder {
        NewOrder {
            id: "o1".to_string(),
            user_id: "u1".to_string(),
            items: items(),
            product_discount,
            shipping_discount,
            delivery_fee: fee,
            product_voucher_id: None,
            shipping_voucher_id: None,
            delivery_address: Some("12 Lý Thường Kiệt, Hà Nội".to_string()),
            note: None,
            created_at: 1_000,
        }
    }

    #[test]
    fn test_place_freezes_totals() {
        let order = Order::place(new_order(10_000, 5_000, 15_000)).unwrap();
        assert_eq!(order.subtotal(), 110_000);
        assert_eq!(order.total(), 110_000 - 10_000 - 5_000 + 15_000);
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.updated_at(), 1_000);
    }

    #[test]
    fn test_place_rejects_inconsistent_discounts() {
        assert!(Order::place(new_order(110_001, 0, 0)).is_err());
        assert!(Order::place(new_order(0, 1, 0)).is_err());
        assert!(Order::place(new_order(-1, 0, 0)).is_err());
        assert!(Order::place(new_order(0, 0, -1)).is_err());
    }

    #[test]
    fn test_place_rejects_empty_items() {
        let mut new = new_order(0, 0, 0);
        new.items.clear();
        assert_eq!(Order::place(new), Err(ModelError::Required("items")));
    }

    #[test]
    fn test_frozen_total_floors_at_zero() {
        assert_eq!(frozen_total(100, 100, 0, 0), Ok(0));
        assert_eq!(frozen_total(100, 30, 10, 10), Ok(70));
    }

    #[test]
    fn test_with_status_keeps_totals() {
        let order = Order::place(new_order(10_000, 0, 15_000)).unwrap();
        let rejected = order.with_status(
            OrderStatus::Rejected,
            Some("Hết nguyên liệu".to_string()),
            2_000,
        );
        assert_eq!(rejected.total(), order.total());
        assert_eq!(rejected.rejection_reason(), Some("Hết nguyên liệu"));
        assert_eq!(rejected.rejected_at(), Some(2_000));
        assert_eq!(rejected.updated_at(), 2_000);

        let done = order.with_status(OrderStatus::Completed, None, 3_000);
        assert_eq!(done.completed_at(), Some(3_000));
        assert_eq!(done.rejection_reason(), None);
    }

    #[test]
    fn test_terminal_states() {
        let terminal: Vec<_> = OrderStatus::ALL
            .iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![
                &OrderStatus::Completed,
                &OrderStatus::Cancelled,
                &OrderStatus::Rejected
            ]
        );
    }

    #[test]
    fn test_deserialize_rejects_tampered_total() {
        let order = Order::place(new_order(10_000, 0, 0)).unwrap();
        let mut json = serde_json::to_value(&order).unwrap();
        json["total"] = serde_json::json!(1);
        assert!(serde_json::from_value::<Order>(json).is_err());

        let json = serde_json::to_value(&order).unwrap();
        let back: Order = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }
}
