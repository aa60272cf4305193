//! OrdersManager - settlement facade
//!
//! This module handles:
//! - Voucher redemption preview and voucher administration
//! - Checkout: redemption(s) + order insert in one commit
//! - Status transitions through the ledger
//! - Spending profile and tier updates on completion
//! - Event broadcasting after commit
//!
//! # Checkout Flow
//!
//! ```text
//! create_order(request)
//!     ├─ 1. Validate items, compute subtotal
//!     ├─ 2. Resolve voucher codes (catalog)
//!     ├─ 3. Evaluate eligibility per voucher
//!     ├─ 4. Compute discounts, freeze totals
//!     ├─ 5. Record redemption on each voucher (new value)
//!     ├─ 6. Commit vouchers (CAS) + order + ORDER_PLACED event
//!     ├─ 7. On version conflict: retry from step 2 (bounded)
//!     └─ 8. Broadcast event, return order
//! ```

pub use crate::utils::error::{SettlementError, SettlementResult};

use super::ledger;
use super::storage::{
    CheckoutCommit, MemoryStore, ProfileWrite, RedbStore, SettlementStore, TransitionCommit,
    Versioned, VoucherWrite,
};
use crate::core::Config;
use crate::core::config::MAX_COMMIT_ATTEMPTS;
use crate::marketing::rank;
use crate::vouchers::{DiscountResult, VoucherCatalog, calculator, eligibility};
use serde::{Deserialize, Serialize};
use shared::models::{ModelError, SpendingProfile, Tier, Voucher, VoucherDraft, VoucherScope};
use shared::order::{
    Actor, EventPayload, NewOrder, Order, OrderAction, OrderEvent, OrderItem, OrderStatus,
    subtotal_of,
};
use shared::util::{new_id, now_millis};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Default event broadcast channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Default currency units per loyalty point
const POINTS_PER_UNIT: i64 = 10_000;

/// Checkout input, sent once payment is confirmed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub user_id: String,
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub product_voucher_code: Option<String>,
    #[serde(default)]
    pub shipping_voucher_code: Option<String>,
    #[serde(default)]
    pub delivery_fee: i64,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// OrdersManager for checkout and order lifecycle
pub struct OrdersManager {
    store: Arc<dyn SettlementStore>,
    catalog: VoucherCatalog,
    event_tx: broadcast::Sender<OrderEvent>,
    points_per_unit: i64,
    max_commit_attempts: u32,
}

impl std::fmt::Debug for OrdersManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersManager")
            .field("store", &"<SettlementStore>")
            .field("event_tx", &"<broadcast::Sender>")
            .field("points_per_unit", &self.points_per_unit)
            .field("max_commit_attempts", &self.max_commit_attempts)
            .finish()
    }
}

impl OrdersManager {
    /// Create an OrdersManager with a redb database at the given path
    pub fn new(db_path: impl AsRef<Path>) -> SettlementResult<Self> {
        let store = RedbStore::open(db_path)?;
        Ok(Self::with_store(Arc::new(store)))
    }

    /// Create an OrdersManager from configuration (redb file under `work_dir`)
    pub fn from_config(config: &Config) -> SettlementResult<Self> {
        let store = RedbStore::open(config.db_path())?;
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));
        let mut manager = Self::with_store(Arc::new(store));
        manager.event_tx = event_tx;
        manager.points_per_unit = config.points_per_unit.max(1);
        manager.max_commit_attempts = config.max_commit_attempts.clamp(1, MAX_COMMIT_ATTEMPTS);
        tracing::info!(
            db_path = %config.db_path().display(),
            points_per_unit = manager.points_per_unit,
            max_commit_attempts = manager.max_commit_attempts,
            "OrdersManager started"
        );
        Ok(manager)
    }

    /// Create an OrdersManager with an injected store and default settings
    pub fn with_store(store: Arc<dyn SettlementStore>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            catalog: VoucherCatalog::new(store.clone()),
            store,
            event_tx,
            points_per_unit: POINTS_PER_UNIT,
            max_commit_attempts: MAX_COMMIT_ATTEMPTS,
        }
    }

    /// Create an OrdersManager over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Override the loyalty points rate (at least 1)
    pub fn with_points_per_unit(mut self, points_per_unit: i64) -> Self {
        self.points_per_unit = points_per_unit.max(1);
        self
    }

    /// Subscribe to event broadcasts
    ///
    /// Events are sent after their commit, outside the write lock. Events of
    /// different orders may arrive out of `sequence` order; consumers that
    /// need a total order should sort by `sequence`.
    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.event_tx.subscribe()
    }

    /// Get the voucher catalog
    pub fn catalog(&self) -> &VoucherCatalog {
        &self.catalog
    }

    /// Get the underlying store
    pub fn store(&self) -> &Arc<dyn SettlementStore> {
        &self.store
    }

    // ========== Vouchers ==========

    /// Create a voucher from a staff draft
    pub fn create_voucher(&self, draft: VoucherDraft) -> SettlementResult<Voucher> {
        Ok(self.catalog.create(draft, now_millis())?.record)
    }

    /// Deactivate a voucher; retried on conflict with concurrent redemptions
    pub fn deactivate_voucher(&self, voucher_id: &str) -> SettlementResult<Voucher> {
        self.with_retry("deactivate_voucher", || self.catalog.deactivate(voucher_id))
            .map(|stored| stored.record)
    }

    /// Vouchers `user_id` can redeem right now
    pub fn available_vouchers(&self, user_id: &str) -> SettlementResult<Vec<(Voucher, u32)>> {
        self.catalog.available_for(user_id, now_millis())
    }

    /// Preview what `code` would take off an order (consumes nothing)
    ///
    /// The voucher is applied to the part of the order its scope names.
    pub fn redeem_voucher(
        &self,
        code: &str,
        user_id: &str,
        subtotal: i64,
        delivery_fee: i64,
        now: i64,
    ) -> SettlementResult<DiscountResult> {
        let voucher = self.catalog.find_by_code(code)?.record;
        eligibility::evaluate(&voucher, user_id, now).into_result(voucher.id())?;
        let result = match voucher.scope() {
            VoucherScope::Product => calculator::compute(subtotal, Some(&voucher), None, delivery_fee)?,
            VoucherScope::Shipping => calculator::compute(subtotal, None, Some(&voucher), delivery_fee)?,
        };
        tracing::debug!(
            voucher_id = %voucher.id(),
            user_id = %user_id,
            subtotal,
            total = result.total,
            "Voucher redemption previewed"
        );
        Ok(result)
    }

    // ========== Checkout ==========

    /// Redeem vouchers, freeze totals and persist the order in PENDING
    pub fn create_order(&self, request: CheckoutRequest) -> SettlementResult<Order> {
        if request.user_id.trim().is_empty() {
            return Err(ModelError::Required("user_id").into());
        }
        if request.delivery_fee < 0 {
            return Err(ModelError::Negative("delivery_fee").into());
        }
        let subtotal = subtotal_of(&request.items)?;

        let (order, event) =
            self.with_retry("create_order", || self.try_checkout(&request, subtotal))?;
        self.broadcast(event);
        Ok(order)
    }

    /// One evaluate → compute → commit attempt
    fn try_checkout(
        &self,
        request: &CheckoutRequest,
        subtotal: i64,
    ) -> SettlementResult<(Order, OrderEvent)> {
        let now = now_millis();
        let user_id = request.user_id.as_str();

        let product = self.resolve_voucher(request.product_voucher_code.as_deref(), user_id, now)?;
        let shipping = self.resolve_voucher(request.shipping_voucher_code.as_deref(), user_id, now)?;

        let discounts = calculator::compute(
            subtotal,
            product.as_ref().map(|v| &v.record),
            shipping.as_ref().map(|v| &v.record),
            request.delivery_fee,
        )?;

        let mut redemptions = Vec::new();
        for stored in product.iter().chain(shipping.iter()) {
            let voucher = stored.record.redeemed_by(user_id).map_err(|_| {
                SettlementError::VoucherNotEligible {
                    voucher_id: stored.record.id().to_string(),
                    reason: eligibility::Ineligibility::QuotaExhausted,
                }
            })?;
            redemptions.push(VoucherWrite {
                expected_version: stored.version,
                voucher,
            });
        }

        let order = Order::place(NewOrder {
            id: new_id(),
            user_id: user_id.to_string(),
            items: request.items.clone(),
            product_discount: discounts.product_discount,
            shipping_discount: discounts.shipping_discount,
            delivery_fee: request.delivery_fee,
            product_voucher_id: discounts.product_voucher_id.clone(),
            shipping_voucher_id: discounts.shipping_voucher_id.clone(),
            delivery_address: request.delivery_address.clone(),
            note: request.note.clone(),
            created_at: now,
        })?;

        let event = OrderEvent::new(
            order.id(),
            order.user_id(),
            &Actor::customer(user_id),
            None,
            OrderStatus::Pending,
            EventPayload::OrderPlaced {
                subtotal: order.subtotal(),
                product_discount: order.product_discount(),
                shipping_discount: order.shipping_discount(),
                delivery_fee: order.delivery_fee(),
                total: order.total(),
                product_voucher_id: discounts.product_voucher_id,
                shipping_voucher_id: discounts.shipping_voucher_id,
            },
            now,
        );

        let event = self.store.commit_checkout(CheckoutCommit {
            vouchers: redemptions,
            order: order.clone(),
            event,
        })?;

        tracing::info!(
            order_id = %order.id(),
            user_id = %user_id,
            subtotal,
            total = order.total(),
            product_voucher = ?product.as_ref().map(|v| v.record.id()),
            shipping_voucher = ?shipping.as_ref().map(|v| v.record.id()),
            "Order placed"
        );
        Ok((order, event))
    }

    /// Look up and check one voucher code, None when no code was given
    fn resolve_voucher(
        &self,
        code: Option<&str>,
        user_id: &str,
        now: i64,
    ) -> SettlementResult<Option<Versioned<Voucher>>> {
        let Some(code) = code.filter(|c| !c.trim().is_empty()) else {
            return Ok(None);
        };
        let stored = self.catalog.find_by_code(code)?;
        let eligibility = eligibility::evaluate(&stored.record, user_id, now);
        tracing::debug!(
            voucher_id = %stored.record.id(),
            user_id = %user_id,
            eligible = eligibility.eligible,
            remaining = eligibility.remaining,
            "Voucher evaluated"
        );
        eligibility.into_result(stored.record.id())?;
        Ok(Some(stored))
    }

    // ========== Order lifecycle ==========

    /// Apply a customer/staff action to an order
    pub fn transition_order(
        &self,
        order_id: &str,
        action: OrderAction,
        actor: &Actor,
        reason: Option<&str>,
    ) -> SettlementResult<Order> {
        let (order, event) = self.with_retry("transition_order", || {
            self.try_transition(order_id, action, actor, reason)
        })?;
        self.broadcast(event);
        Ok(order)
    }

    fn try_transition(
        &self,
        order_id: &str,
        action: OrderAction,
        actor: &Actor,
        reason: Option<&str>,
    ) -> SettlementResult<(Order, OrderEvent)> {
        let now = now_millis();
        let current = self
            .store
            .order(order_id)?
            .ok_or_else(|| SettlementError::OrderNotFound(order_id.to_string()))?;
        let next = ledger::apply(&current.record, action, actor, reason, now)?;

        let (payload, profile) = match next.status() {
            OrderStatus::Processing => (EventPayload::OrderApproved, None),
            OrderStatus::Rejected => (
                EventPayload::OrderRejected {
                    reason: next.rejection_reason().unwrap_or_default().to_string(),
                },
                None,
            ),
            OrderStatus::Cancelled => (EventPayload::OrderCancelled, None),
            OrderStatus::Completed => {
                let (payload, write) = self.completion(&next, now)?;
                (payload, Some(write))
            }
            other => {
                // the ledger never targets these
                return Err(SettlementError::InvalidTransition {
                    order_id: order_id.to_string(),
                    status: other,
                    action,
                });
            }
        };

        let event = OrderEvent::new(
            next.id(),
            next.user_id(),
            actor,
            Some(current.record.status()),
            next.status(),
            payload,
            now,
        );
        let event = self.store.commit_transition(TransitionCommit {
            expected_version: current.version,
            order: next.clone(),
            profile,
            event,
        })?;

        tracing::info!(
            order_id = %order_id,
            from = %current.record.status(),
            to = %next.status(),
            actor_id = %actor.user_id,
            "Order status changed"
        );
        Ok((next, event))
    }

    /// Profile update and event payload for a completed order
    fn completion(&self, order: &Order, now: i64) -> SettlementResult<(EventPayload, ProfileWrite)> {
        let stored = self.store.profile(order.user_id())?;
        let (expected_version, profile) = match stored {
            Some(v) => (v.version, v.record),
            None => (0, SpendingProfile::empty(order.user_id())),
        };

        let points = rank::points_for_order_total(order.total(), self.points_per_unit);
        let updated = profile.with_completed_order(order.total(), points, now);

        let old_tier = rank::tier_for_spending(profile.total_spent)?;
        let new_tier = rank::tier_for_spending(updated.total_spent)?;
        if new_tier != old_tier {
            tracing::info!(
                user_id = %order.user_id(),
                from = %old_tier,
                to = %new_tier,
                "Member tier changed"
            );
        }

        Ok((
            EventPayload::OrderCompleted {
                total: order.total(),
                points_earned: points,
                new_tier: (new_tier != old_tier).then_some(new_tier),
            },
            ProfileWrite {
                expected_version,
                profile: updated,
            },
        ))
    }

    // ========== Queries ==========

    pub fn order(&self, order_id: &str) -> SettlementResult<Order> {
        self.store
            .order(order_id)?
            .map(|stored| stored.record)
            .ok_or_else(|| SettlementError::OrderNotFound(order_id.to_string()))
    }

    /// Audit trail of one order, oldest first
    pub fn order_events(&self, order_id: &str) -> SettlementResult<Vec<OrderEvent>> {
        if self.store.order(order_id)?.is_none() {
            return Err(SettlementError::OrderNotFound(order_id.to_string()));
        }
        Ok(self.store.order_events(order_id)?)
    }

    /// Spending profile (empty when the user never completed an order)
    pub fn profile(&self, user_id: &str) -> SettlementResult<SpendingProfile> {
        Ok(self
            .store
            .profile(user_id)?
            .map(|stored| stored.record)
            .unwrap_or_else(|| SpendingProfile::empty(user_id)))
    }

    /// Current tier derived from completed-order spending
    pub fn rank_for(&self, user_id: &str) -> SettlementResult<Tier> {
        rank::tier_for_spending(self.profile(user_id)?.total_spent)
    }

    // ========== Internals ==========

    /// Run `op` again while it loses version races, up to the attempt limit
    fn with_retry<T>(
        &self,
        operation: &'static str,
        mut op: impl FnMut() -> SettlementResult<T>,
    ) -> SettlementResult<T> {
        let mut attempt = 1;
        loop {
            match op() {
                Err(e) if e.is_retryable() && attempt < self.max_commit_attempts => {
                    tracing::warn!(
                        operation,
                        attempt,
                        error = %e,
                        "Concurrent conflict, retrying"
                    );
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Broadcast an event after successful commit
    fn broadcast(&self, event: OrderEvent) {
        let order_id = event.order_id.clone();
        if self.event_tx.send(event).is_err() {
            tracing::warn!(order_id = %order_id, "Event broadcast failed: no active receivers");
        }
    }
}

#[cfg(test)]
mod tests;
