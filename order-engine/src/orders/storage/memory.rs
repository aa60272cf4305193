//! In-memory settlement store
//!
//! One `parking_lot::Mutex` guards all maps, so every commit is atomic and
//! serialized. Reads clone out of the lock; a writer holding a stale clone is
//! rejected by the same version check the redb store uses.

use super::{
    CheckoutCommit, SettlementStore, StorageError, StorageResult, TransitionCommit, Versioned,
    VoucherWrite, check_version,
};
use parking_lot::Mutex;
use shared::models::{SpendingProfile, Voucher};
use shared::order::{Order, OrderEvent};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
struct MemoryState {
    vouchers: HashMap<String, Versioned<Voucher>>,
    /// normalized code -> latest voucher id
    voucher_codes: HashMap<String, String>,
    orders: HashMap<String, Versioned<Order>>,
    profiles: HashMap<String, Versioned<SpendingProfile>>,
    /// (order_id, sequence) -> event
    events: BTreeMap<(String, u64), OrderEvent>,
    sequence: u64,
}

impl MemoryState {
    fn voucher_version(&self, id: &str) -> u64 {
        self.vouchers.get(id).map(|v| v.version).unwrap_or(0)
    }

    fn append_event(&mut self, mut event: OrderEvent) -> OrderEvent {
        self.sequence += 1;
        event.sequence = self.sequence;
        self.events
            .insert((event.order_id.clone(), event.sequence), event.clone());
        event
    }
}

/// Lock-based store for tests and embedding without persistence
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events recorded so far
    pub fn event_count(&self) -> usize {
        self.state.lock().events.len()
    }
}

impl SettlementStore for MemoryStore {
    fn voucher(&self, id: &str) -> StorageResult<Option<Versioned<Voucher>>> {
        Ok(self.state.lock().vouchers.get(id).cloned())
    }

    fn voucher_by_code(&self, normalized_code: &str) -> StorageResult<Option<Versioned<Voucher>>> {
        let state = self.state.lock();
        Ok(state
            .voucher_codes
            .get(normalized_code)
            .and_then(|id| state.vouchers.get(id))
            .cloned())
    }

    fn vouchers(&self) -> StorageResult<Vec<Versioned<Voucher>>> {
        Ok(self.state.lock().vouchers.values().cloned().collect())
    }

    fn insert_voucher(&self, voucher: &Voucher) -> StorageResult<Versioned<Voucher>> {
        let mut state = self.state.lock();
        if state.vouchers.contains_key(voucher.id()) {
            return Err(StorageError::DuplicateKey(voucher.id().to_string()));
        }
        let code = voucher.normalized_code();
        let taken = state
            .voucher_codes
            .get(&code)
            .and_then(|id| state.vouchers.get(id))
            .is_some_and(|existing| existing.record.is_active());
        if taken {
            return Err(StorageError::DuplicateKey(code));
        }

        let stored = Versioned::new(1, voucher.clone());
        state
            .vouchers
            .insert(voucher.id().to_string(), stored.clone());
        state.voucher_codes.insert(code, voucher.id().to_string());
        Ok(stored)
    }

    fn update_voucher(&self, write: VoucherWrite) -> StorageResult<Versioned<Voucher>> {
        let mut state = self.state.lock();
        let id = write.voucher.id().to_string();
        check_version("voucher", &id, write.expected_version, state.voucher_version(&id))?;

        let stored = Versioned::new(write.expected_version + 1, write.voucher);
        state.vouchers.insert(id, stored.clone());
        Ok(stored)
    }

    fn order(&self, id: &str) -> StorageResult<Option<Versioned<Order>>> {
        Ok(self.state.lock().orders.get(id).cloned())
    }

    fn order_events(&self, order_id: &str) -> StorageResult<Vec<OrderEvent>> {
        let state = self.state.lock();
        Ok(state
            .events
            .range((order_id.to_string(), 0)..=(order_id.to_string(), u64::MAX))
            .map(|(_, event)| event.clone())
            .collect())
    }

    fn commit_checkout(&self, commit: CheckoutCommit) -> StorageResult<OrderEvent> {
        let mut state = self.state.lock();

        // validate everything before touching any map
        for write in &commit.vouchers {
            let id = write.voucher.id();
            check_version("voucher", id, write.expected_version, state.voucher_version(id))?;
        }
        if state.orders.contains_key(commit.order.id()) {
            return Err(StorageError::DuplicateKey(commit.order.id().to_string()));
        }

        for write in commit.vouchers {
            let id = write.voucher.id().to_string();
            state
                .vouchers
                .insert(id, Versioned::new(write.expected_version + 1, write.voucher));
        }
        state.orders.insert(
            commit.order.id().to_string(),
            Versioned::new(1, commit.order),
        );
        Ok(state.append_event(commit.event))
    }

    fn commit_transition(&self, commit: TransitionCommit) -> StorageResult<OrderEvent> {
        let mut state = self.state.lock();

        let order_id = commit.order.id().to_string();
        let found = state.orders.get(&order_id).map(|o| o.version).unwrap_or(0);
        check_version("order", &order_id, commit.expected_version, found)?;
        if let Some(write) = &commit.profile {
            let user_id = &write.profile.user_id;
            let found = state.profiles.get(user_id).map(|p| p.version).unwrap_or(0);
            check_version("profile", user_id, write.expected_version, found)?;
        }

        state.orders.insert(
            order_id,
            Versioned::new(commit.expected_version + 1, commit.order),
        );
        if let Some(write) = commit.profile {
            state.profiles.insert(
                write.profile.user_id.clone(),
                Versioned::new(write.expected_version + 1, write.profile),
            );
        }
        Ok(state.append_event(commit.event))
    }

    fn profile(&self, user_id: &str) -> StorageResult<Option<Versioned<SpendingProfile>>> {
        Ok(self.state.lock().profiles.get(user_id).cloned())
    }
}
