use super::*;
use crate::orders::storage::{StorageError, StorageResult};
use std::sync::atomic::{AtomicU32, Ordering};

/// Run `op` once per index on its own thread, all sharing `manager`
fn race<T: Send>(
    manager: &OrdersManager,
    threads: usize,
    op: impl Fn(&OrdersManager, usize) -> T + Sync,
) -> Vec<T> {
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|i| {
                let op = &op;
                s.spawn(move || op(manager, i))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

fn limited_public_voucher(manager: &OrdersManager, quantity: u32) -> Voucher {
    let mut draft = public_draft("LIMITED", DiscountKind::Amount, 10_000, VoucherScope::Product);
    draft.total_quantity = quantity;
    manager.create_voucher(draft).unwrap()
}

fn assert_lost_race(err: &SettlementError) {
    assert!(
        matches!(
            err,
            SettlementError::VoucherNotEligible { .. } | SettlementError::ConcurrentConflict(_)
        ),
        "unexpected error: {}",
        err
    );
}

#[test]
fn test_public_quantity_never_oversold() {
    let manager = create_test_manager();
    let voucher = limited_public_voucher(&manager, 3);

    let results = race(&manager, 12, |m, i| {
        m.create_order(checkout_with_code(&format!("u{}", i), 100_000, "LIMITED"))
    });

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 3);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_lost_race(err);
    }
    let stored = manager.catalog().find_by_id(voucher.id()).unwrap();
    assert_eq!(public_used_by(&stored.record), 3);
}

#[test]
fn test_public_quantity_never_oversold_on_redb() {
    let store = crate::orders::storage::RedbStore::open_in_memory().unwrap();
    let manager = OrdersManager::with_store(Arc::new(store));
    let voucher = limited_public_voucher(&manager, 2);

    let results = race(&manager, 8, |m, i| {
        m.create_order(checkout_with_code(&format!("u{}", i), 100_000, "LIMITED"))
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 2);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_lost_race(err);
    }
    let stored = manager.catalog().find_by_id(voucher.id()).unwrap();
    assert_eq!(public_used_by(&stored.record), 2);
}

#[test]
fn test_same_user_redeems_public_voucher_once() {
    let manager = create_test_manager();
    let voucher = limited_public_voucher(&manager, 0);

    let results = race(&manager, 8, |m, _| {
        m.create_order(checkout_with_code("u1", 100_000, "LIMITED"))
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let stored = manager.catalog().find_by_id(voucher.id()).unwrap();
    assert_eq!(public_used_by(&stored.record), 1);
}

#[test]
fn test_private_quota_never_negative() {
    let manager = create_test_manager();
    let voucher = manager
        .create_voucher(private_draft("VIP", 10_000, &[("u1", 2)]))
        .unwrap();

    let results = race(&manager, 10, |m, _| {
        m.create_order(checkout_with_code("u1", 100_000, "VIP"))
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 2);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_lost_race(err);
    }
    let stored = manager.catalog().find_by_id(voucher.id()).unwrap();
    assert_eq!(private_quota(&stored.record, "u1"), 0);
}

#[test]
fn test_concurrent_staff_actions_single_winner() {
    let manager = create_test_manager();
    let order = manager.create_order(checkout("u1", 100_000)).unwrap();

    let results = race(&manager, 8, |m, i| {
        let staff = Actor::staff(format!("staff-{}", i));
        if i % 2 == 0 {
            m.transition_order(order.id(), OrderAction::Approve, &staff, None)
        } else {
            m.transition_order(
                order.id(),
                OrderAction::Reject,
                &staff,
                Some("Bếp quá tải, xin lỗi"),
            )
        }
    });

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(matches!(err, SettlementError::InvalidTransition { .. }));
    }

    let stored = manager.order(order.id()).unwrap();
    assert_eq!(&stored, winners[0]);
    assert_eq!(manager.order_events(order.id()).unwrap().len(), 2);
}

#[test]
fn test_concurrent_completions_count_once() {
    let manager = create_test_manager();
    let staff = Actor::staff("staff-1");
    let order = manager.create_order(checkout("u1", 1_000_000)).unwrap();
    manager
        .transition_order(order.id(), OrderAction::Approve, &staff, None)
        .unwrap();

    let results = race(&manager, 6, |m, _| {
        m.transition_order(order.id(), OrderAction::Complete, &staff, None)
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let profile = manager.profile("u1").unwrap();
    assert_eq!(profile.total_spent, 1_000_000);
    assert_eq!(profile.completed_orders, 1);
}

#[test]
fn test_broadcast_sequences_sort_into_persisted_trail() {
    let manager = create_test_manager();
    let orders: Vec<_> = (0..6)
        .map(|i| manager.create_order(checkout(&format!("u{}", i), 50_000)).unwrap())
        .collect();
    let mut rx = manager.subscribe();

    let results = race(&manager, orders.len(), |m, i| {
        m.transition_order(orders[i].id(), OrderAction::Approve, &Actor::staff("staff-1"), None)
    });
    assert!(results.iter().all(|r| r.is_ok()));

    let mut received = Vec::new();
    while let Ok(event) = rx.try_recv() {
        received.push(event);
    }
    assert_eq!(received.len(), orders.len());

    // arrival order across orders is not guaranteed, sequence is
    received.sort_by_key(|e| e.sequence);
    let sequences: Vec<_> = received.iter().map(|e| e.sequence).collect();
    let expected: Vec<u64> = (7..=12).collect();
    assert_eq!(sequences, expected);

    for event in &received {
        let trail = manager.order_events(&event.order_id).unwrap();
        assert_eq!(trail.last(), Some(event));
    }
}

// ========================================================================
// Retry limit
// ========================================================================

/// Store whose checkout commit always loses the version race
struct AlwaysConflicting {
    inner: MemoryStore,
    attempts: AtomicU32,
}

impl SettlementStore for AlwaysConflicting {
    fn voucher(&self, id: &str) -> StorageResult<Option<Versioned<Voucher>>> {
        self.inner.voucher(id)
    }

    fn voucher_by_code(&self, normalized_code: &str) -> StorageResult<Option<Versioned<Voucher>>> {
        self.inner.voucher_by_code(normalized_code)
    }

    fn vouchers(&self) -> StorageResult<Vec<Versioned<Voucher>>> {
        self.inner.vouchers()
    }

    fn insert_voucher(&self, voucher: &Voucher) -> StorageResult<Versioned<Voucher>> {
        self.inner.insert_voucher(voucher)
    }

    fn update_voucher(&self, write: VoucherWrite) -> StorageResult<Versioned<Voucher>> {
        self.inner.update_voucher(write)
    }

    fn order(&self, id: &str) -> StorageResult<Option<Versioned<Order>>> {
        self.inner.order(id)
    }

    fn order_events(&self, order_id: &str) -> StorageResult<Vec<OrderEvent>> {
        self.inner.order_events(order_id)
    }

    fn commit_checkout(&self, commit: CheckoutCommit) -> StorageResult<OrderEvent> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Conflict {
            entity: "voucher",
            id: commit.order.id().to_string(),
            expected: 1,
            found: 2,
        })
    }

    fn commit_transition(&self, commit: TransitionCommit) -> StorageResult<OrderEvent> {
        self.inner.commit_transition(commit)
    }

    fn profile(&self, user_id: &str) -> StorageResult<Option<Versioned<SpendingProfile>>> {
        self.inner.profile(user_id)
    }
}

#[test]
fn test_conflict_surfaces_after_three_attempts() {
    let store = Arc::new(AlwaysConflicting {
        inner: MemoryStore::new(),
        attempts: AtomicU32::new(0),
    });
    let manager = OrdersManager::with_store(store.clone());

    let err = manager.create_order(checkout("u1", 10_000)).unwrap_err();
    assert!(matches!(err, SettlementError::ConcurrentConflict(_)));
    assert!(err.is_retryable());
    assert_eq!(store.attempts.load(Ordering::SeqCst), MAX_COMMIT_ATTEMPTS);

    let app: AppError = err.into();
    assert_eq!(app.code, ErrorCode::ConcurrentConflict);
    assert!(app.is_retryable());
}

#[test]
fn test_manager_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<OrdersManager>();
}
