//! Order Module
//!
//! Types shared by the settlement engine and its callers:
//! - Order: record frozen at checkout, whose status then moves through the ledger
//! - Events: immutable facts recorded with each committed change
//! - Types: items, actors and actions

pub mod event;
#[allow(clippy::module_inception)]
pub mod order;
pub mod types;

// Re-exports
pub use event::{EventPayload, OrderEvent, OrderEventType};
pub use order::{NewOrder, Order, OrderStatus, frozen_total};
pub use types::*;
