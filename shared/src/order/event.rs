//! Order events - immutable facts recorded with every committed change

use super::order::OrderStatus;
use super::types::{Actor, ActorRole};
use crate::models::Tier;
use crate::util::new_id;
use serde::{Deserialize, Serialize};

/// Order event - immutable audit record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderEvent {
    /// Event unique ID
    pub event_id: String,
    /// Store-wide sequence number, assigned at commit
    pub sequence: u64,
    /// Order this event belongs to
    pub order_id: String,
    /// Owner of the order
    pub user_id: String,
    /// Server timestamp (Unix milliseconds)
    pub timestamp: i64,
    /// Caller who triggered this event
    pub actor_id: String,
    pub actor_role: ActorRole,
    /// None for the placement event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_status: Option<OrderStatus>,
    pub to_status: OrderStatus,
    pub event_type: OrderEventType,
    pub payload: EventPayload,
}

/// Event type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEventType {
    OrderPlaced,
    OrderApproved,
    OrderRejected,
    OrderCompleted,
    OrderCancelled,
}

impl std::fmt::Display for OrderEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderEventType::OrderPlaced => write!(f, "ORDER_PLACED"),
            OrderEventType::OrderApproved => write!(f, "ORDER_APPROVED"),
            OrderEventType::OrderRejected => write!(f, "ORDER_REJECTED"),
            OrderEventType::OrderCompleted => write!(f, "ORDER_COMPLETED"),
            OrderEventType::OrderCancelled => write!(f, "ORDER_CANCELLED"),
        }
    }
}

/// Event payload variants
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    OrderPlaced {
        subtotal: i64,
        product_discount: i64,
        shipping_discount: i64,
        delivery_fee: i64,
        total: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        product_voucher_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        shipping_voucher_id: Option<String>,
    },

    OrderApproved,

    OrderRejected {
        reason: String,
    },

    OrderCompleted {
        total: i64,
        points_earned: i64,
        /// Set only when the completion moved the customer up a tier
        #[serde(skip_serializing_if = "Option::is_none")]
        new_tier: Option<Tier>,
    },

    OrderCancelled,
}

impl EventPayload {
    pub fn event_type(&self) -> OrderEventType {
        match self {
            EventPayload::OrderPlaced { .. } => OrderEventType::OrderPlaced,
            EventPayload::OrderApproved => OrderEventType::OrderApproved,
            EventPayload::OrderRejected { .. } => OrderEventType::OrderRejected,
            EventPayload::OrderCompleted { .. } => OrderEventType::OrderCompleted,
            EventPayload::OrderCancelled => OrderEventType::OrderCancelled,
        }
    }
}

impl OrderEvent {
    /// Create an unsequenced event; the store fills in `sequence` on commit
    pub fn new(
        order_id: impl Into<String>,
        user_id: impl Into<String>,
        actor: &Actor,
        from_status: Option<OrderStatus>,
        to_status: OrderStatus,
        payload: EventPayload,
        timestamp: i64,
    ) -> Self {
        Self {
            event_id: new_id(),
            sequence: 0,
            order_id: order_id.into(),
            user_id: user_id.into(),
            timestamp,
            actor_id: actor.user_id.clone(),
            actor_role: actor.role,
            from_status,
            to_status,
            event_type: payload.event_type(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_follows_payload() {
        let event = OrderEvent::new(
            "o1",
            "u1",
            &Actor::staff("s1"),
            Some(OrderStatus::Processing),
            OrderStatus::Completed,
            EventPayload::OrderCompleted {
                total: 150_000,
                points_earned: 15,
                new_tier: None,
            },
            7,
        );
        assert_eq!(event.event_type, OrderEventType::OrderCompleted);
        assert_eq!(event.sequence, 0);
        assert_eq!(event.actor_role, ActorRole::Staff);
        assert_eq!(event.timestamp, 7);
    }

    #[test]
    fn test_event_ids_are_unique() {
        let make = || {
            OrderEvent::new(
                "o1",
                "u1",
                &Actor::staff("s1"),
                Some(OrderStatus::Pending),
                OrderStatus::Processing,
                EventPayload::OrderApproved,
                1,
            )
        };
        let (a, b) = (make(), make());
        assert!(!a.event_id.is_empty());
        assert_ne!(a.event_id, b.event_id);
    }

    #[test]
    fn test_payload_serialize_tag() {
        let json = serde_json::to_value(EventPayload::OrderRejected {
            reason: "Quán đã đóng cửa".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "ORDER_REJECTED");
        assert_eq!(json["reason"], "Quán đã đóng cửa");

        let json = serde_json::to_value(EventPayload::OrderCompleted {
            total: 1,
            points_earned: 0,
            new_tier: Some(Tier::Silver),
        })
        .unwrap();
        assert_eq!(json["new_tier"], "SILVER");
    }
}
