//! Settlement storage seam
//!
//! Every mutable record (voucher, order, spending profile) is stored as a
//! [`Versioned`] value. Writers read a record, compute the next value, and
//! commit with the version they read; a version mismatch fails the whole commit
//! with [`StorageError::Conflict`] and nothing is written.
//!
//! # Implementations
//!
//! | Store | Backend | Use |
//! |-------|---------|-----|
//! | [`RedbStore`] | redb file or in-memory backend | production, integration tests |
//! | [`MemoryStore`] | `parking_lot::Mutex` over maps | unit tests |
//!
//! # Version rules
//!
//! - A stored record's version starts at 1 and grows by 1 on each write
//! - `expected_version = 0` means "record must not exist yet"
//! - Events get a store-wide sequence number on commit

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use serde::{Deserialize, Serialize};
use shared::models::{SpendingProfile, Voucher};
use shared::order::{Order, OrderEvent};
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Version conflict on {entity} {id}: expected {expected}, found {found}")]
    Conflict {
        entity: &'static str,
        id: String,
        expected: u64,
        found: u64,
    },

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A stored record together with its write version
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Versioned<T> {
    pub version: u64,
    pub record: T,
}

impl<T> Versioned<T> {
    pub fn new(version: u64, record: T) -> Self {
        Self { version, record }
    }
}

/// Voucher replacement guarded by the version it was read at
#[derive(Debug, Clone)]
pub struct VoucherWrite {
    pub expected_version: u64,
    pub voucher: Voucher,
}

/// Profile replacement; `expected_version = 0` creates the profile
#[derive(Debug, Clone)]
pub struct ProfileWrite {
    pub expected_version: u64,
    pub profile: SpendingProfile,
}

/// Checkout commit: voucher redemptions + new order + placement event
#[derive(Debug, Clone)]
pub struct CheckoutCommit {
    pub vouchers: Vec<VoucherWrite>,
    pub order: Order,
    pub event: OrderEvent,
}

/// Status transition commit: order CAS + event (+ profile on completion)
#[derive(Debug, Clone)]
pub struct TransitionCommit {
    pub expected_version: u64,
    pub order: Order,
    pub profile: Option<ProfileWrite>,
    pub event: OrderEvent,
}

/// Record store with atomic conditional writes
///
/// Each `commit_*` / `insert_*` / `update_*` call is one transaction: either
/// every write in it lands or none does.
pub trait SettlementStore: Send + Sync {
    // ========== Vouchers ==========

    fn voucher(&self, id: &str) -> StorageResult<Option<Versioned<Voucher>>>;

    /// Latest voucher created under `normalized_code`
    fn voucher_by_code(&self, normalized_code: &str) -> StorageResult<Option<Versioned<Voucher>>>;

    fn vouchers(&self) -> StorageResult<Vec<Versioned<Voucher>>>;

    /// Insert a new voucher
    ///
    /// Fails with [`StorageError::DuplicateKey`] when the id exists or an
    /// active voucher already holds the normalized code.
    fn insert_voucher(&self, voucher: &Voucher) -> StorageResult<Versioned<Voucher>>;

    fn update_voucher(&self, write: VoucherWrite) -> StorageResult<Versioned<Voucher>>;

    // ========== Orders ==========

    fn order(&self, id: &str) -> StorageResult<Option<Versioned<Order>>>;

    /// Events of one order in sequence order
    fn order_events(&self, order_id: &str) -> StorageResult<Vec<OrderEvent>>;

    /// Returns the placement event with its sequence assigned
    fn commit_checkout(&self, commit: CheckoutCommit) -> StorageResult<OrderEvent>;

    /// Returns the transition event with its sequence assigned
    fn commit_transition(&self, commit: TransitionCommit) -> StorageResult<OrderEvent>;

    // ========== Profiles ==========

    fn profile(&self, user_id: &str) -> StorageResult<Option<Versioned<SpendingProfile>>>;
}

/// Shared CAS check used by both stores
fn check_version(
    entity: &'static str,
    id: &str,
    expected: u64,
    found: u64,
) -> StorageResult<()> {
    if expected != found {
        return Err(StorageError::Conflict {
            entity,
            id: id.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}
