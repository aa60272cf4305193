//! Order Settlement Module
//!
//! - **manager**: `OrdersManager` facade for checkout and order lifecycle
//! - **ledger**: order status state machine
//! - **storage**: versioned record store (redb / in-memory)
//!
//! # Architecture
//!
//! ```text
//! Checkout / Staff action → OrdersManager → Ledger + Vouchers
//!                                 ↓
//!                     SettlementStore (atomic CAS commit)
//!                                 ↓
//!                          Broadcast event
//!                                 ↓
//!                   Notification dispatcher (external)
//! ```

pub mod ledger;
pub mod manager;
pub mod storage;

// Re-exports
pub use manager::{CheckoutRequest, OrdersManager, SettlementError, SettlementResult};
pub use storage::{MemoryStore, RedbStore, SettlementStore, StorageError};

// Re-export shared types for convenience
pub use shared::order::{
    Actor, ActorRole, EventPayload, Order, OrderAction, OrderEvent, OrderEventType, OrderItem,
    OrderStatus, Topping,
};
