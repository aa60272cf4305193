//! redb-backed settlement store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `vouchers` | `voucher_id` | `Versioned<Voucher>` | Voucher definitions and quotas |
//! | `voucher_codes` | `normalized_code` | `voucher_id` | Latest voucher per code |
//! | `orders` | `order_id` | `Versioned<Order>` | Orders |
//! | `profiles` | `user_id` | `Versioned<SpendingProfile>` | Completed-order spending |
//! | `events` | `(order_id, sequence)` | `OrderEvent` | Audit trail (append-only) |
//! | `sequence_counter` | `"seq"` | `u64` | Global event sequence |
//!
//! # Concurrency
//!
//! redb serializes write transactions, so the version check and the write
//! happen without interleaving. Stale reads taken outside the transaction are
//! caught by the version check and surface as [`StorageError::Conflict`].
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate` by default: once `commit()`
//! returns the data is on disk, and the file stays consistent across crashes.

use super::{
    CheckoutCommit, SettlementStore, StorageError, StorageResult, TransitionCommit, Versioned,
    VoucherWrite, check_version,
};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::{SpendingProfile, Voucher};
use shared::order::{Order, OrderEvent};
use std::path::Path;
use std::sync::Arc;

/// key = voucher_id, value = JSON-serialized Versioned<Voucher>
const VOUCHERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("vouchers");

/// key = normalized code, value = id of the most recently created voucher with it
const VOUCHER_CODES_TABLE: TableDefinition<&str, &str> = TableDefinition::new("voucher_codes");

/// key = order_id, value = JSON-serialized Versioned<Order>
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// key = user_id, value = JSON-serialized Versioned<SpendingProfile>
const PROFILES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("profiles");

/// key = (order_id, sequence), value = JSON-serialized OrderEvent
const EVENTS_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("events");

/// key = "seq", value = u64
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

const SEQUENCE_KEY: &str = "seq";

/// Only the version of a stored record, for CAS checks
#[derive(serde::Deserialize)]
struct StoredVersion {
    version: u64,
}

/// Settlement store backed by redb
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").field("db", &"<redb::Database>").finish()
    }
}

impl RedbStore {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests, embedding without a work dir)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    /// Create all tables if they don't exist
    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(VOUCHERS_TABLE)?;
            let _ = write_txn.open_table(VOUCHER_CODES_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(PROFILES_TABLE)?;
            let _ = write_txn.open_table(EVENTS_TABLE)?;

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(SEQUENCE_KEY)?.is_none() {
                seq_table.insert(SEQUENCE_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Current global event sequence (read-only)
    pub fn current_sequence(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    /// Read one versioned JSON record in its own read transaction
    fn read_record<T: DeserializeOwned>(
        &self,
        def: TableDefinition<&'static str, &'static [u8]>,
        key: &str,
    ) -> StorageResult<Option<Versioned<T>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(def)?;
        get_json(&table, key)
    }
}

// ========== Table helpers ==========

fn get_json<T: DeserializeOwned>(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    key: &str,
) -> StorageResult<Option<T>> {
    match table.get(key)? {
        Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
        None => Ok(None),
    }
}

fn put_json<T: Serialize>(
    table: &mut redb::Table<'_, &'static str, &'static [u8]>,
    key: &str,
    value: &T,
) -> StorageResult<()> {
    let bytes = serde_json::to_vec(value)?;
    table.insert(key, bytes.as_slice())?;
    Ok(())
}

/// Version of the record under `key`, 0 when absent
fn stored_version(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    key: &str,
) -> StorageResult<u64> {
    Ok(get_json::<StoredVersion>(table, key)?
        .map(|v| v.version)
        .unwrap_or(0))
}

/// CAS write: fails unless the stored version equals `expected`
fn put_versioned<T: Serialize>(
    table: &mut redb::Table<'_, &'static str, &'static [u8]>,
    entity: &'static str,
    key: &str,
    expected: u64,
    record: &T,
) -> StorageResult<u64> {
    let found = stored_version(&*table, key)?;
    check_version(entity, key, expected, found)?;
    let version = expected + 1;
    put_json(table, key, &Versioned::new(version, record))?;
    Ok(version)
}

/// Assign the next global sequence to `event` and persist it
fn append_event(txn: &WriteTransaction, mut event: OrderEvent) -> StorageResult<OrderEvent> {
    let mut seq_table = txn.open_table(SEQUENCE_TABLE)?;
    let current = seq_table
        .get(SEQUENCE_KEY)?
        .map(|guard| guard.value())
        .unwrap_or(0);
    let next = current + 1;
    seq_table.insert(SEQUENCE_KEY, next)?;
    event.sequence = next;

    let mut table = txn.open_table(EVENTS_TABLE)?;
    let key = (event.order_id.as_str(), event.sequence);
    let value = serde_json::to_vec(&event)?;
    table.insert(key, value.as_slice())?;
    Ok(event)
}

impl SettlementStore for RedbStore {
    // ========== Vouchers ==========

    fn voucher(&self, id: &str) -> StorageResult<Option<Versioned<Voucher>>> {
        self.read_record(VOUCHERS_TABLE, id)
    }

    fn voucher_by_code(&self, normalized_code: &str) -> StorageResult<Option<Versioned<Voucher>>> {
        let read_txn = self.db.begin_read()?;
        let codes = read_txn.open_table(VOUCHER_CODES_TABLE)?;
        let Some(id) = codes.get(normalized_code)?.map(|g| g.value().to_string()) else {
            return Ok(None);
        };
        let vouchers = read_txn.open_table(VOUCHERS_TABLE)?;
        get_json(&vouchers, &id)
    }

    fn vouchers(&self) -> StorageResult<Vec<Versioned<Voucher>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(VOUCHERS_TABLE)?;

        let mut vouchers = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let voucher: Versioned<Voucher> = serde_json::from_slice(value.value())?;
            vouchers.push(voucher);
        }
        Ok(vouchers)
    }

    fn insert_voucher(&self, voucher: &Voucher) -> StorageResult<Versioned<Voucher>> {
        let code = voucher.normalized_code();
        let txn = self.db.begin_write()?;
        {
            let mut vouchers = txn.open_table(VOUCHERS_TABLE)?;
            let mut codes = txn.open_table(VOUCHER_CODES_TABLE)?;

            if vouchers.get(voucher.id())?.is_some() {
                return Err(StorageError::DuplicateKey(voucher.id().to_string()));
            }
            let holder = codes.get(code.as_str())?.map(|g| g.value().to_string());
            if let Some(holder_id) = holder
                && let Some(existing) = get_json::<Versioned<Voucher>>(&vouchers, &holder_id)?
                && existing.record.is_active()
            {
                return Err(StorageError::DuplicateKey(code));
            }

            put_json(&mut vouchers, voucher.id(), &Versioned::new(1, voucher))?;
            codes.insert(code.as_str(), voucher.id())?;
        }
        txn.commit()?;

        Ok(Versioned::new(1, voucher.clone()))
    }

    fn update_voucher(&self, write: VoucherWrite) -> StorageResult<Versioned<Voucher>> {
        let txn = self.db.begin_write()?;
        let version = {
            let mut table = txn.open_table(VOUCHERS_TABLE)?;
            put_versioned(
                &mut table,
                "voucher",
                write.voucher.id(),
                write.expected_version,
                &write.voucher,
            )?
        };
        txn.commit()?;
        Ok(Versioned::new(version, write.voucher))
    }

    // ========== Orders ==========

    fn order(&self, id: &str) -> StorageResult<Option<Versioned<Order>>> {
        self.read_record(ORDERS_TABLE, id)
    }

    fn order_events(&self, order_id: &str) -> StorageResult<Vec<OrderEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        let mut events = Vec::new();
        let range_start = (order_id, 0u64);
        let range_end = (order_id, u64::MAX);

        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            let event: OrderEvent = serde_json::from_slice(value.value())?;
            events.push(event);
        }

        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    fn commit_checkout(&self, commit: CheckoutCommit) -> StorageResult<OrderEvent> {
        let txn = self.db.begin_write()?;
        {
            let mut vouchers = txn.open_table(VOUCHERS_TABLE)?;
            for write in &commit.vouchers {
                put_versioned(
                    &mut vouchers,
                    "voucher",
                    write.voucher.id(),
                    write.expected_version,
                    &write.voucher,
                )?;
            }

            let mut orders = txn.open_table(ORDERS_TABLE)?;
            if orders.get(commit.order.id())?.is_some() {
                return Err(StorageError::DuplicateKey(commit.order.id().to_string()));
            }
            put_json(&mut orders, commit.order.id(), &Versioned::new(1, &commit.order))?;
        }
        let event = append_event(&txn, commit.event)?;
        txn.commit()?;
        Ok(event)
    }

    fn commit_transition(&self, commit: TransitionCommit) -> StorageResult<OrderEvent> {
        let txn = self.db.begin_write()?;
        {
            let mut orders = txn.open_table(ORDERS_TABLE)?;
            put_versioned(
                &mut orders,
                "order",
                commit.order.id(),
                commit.expected_version,
                &commit.order,
            )?;

            if let Some(write) = &commit.profile {
                let mut profiles = txn.open_table(PROFILES_TABLE)?;
                put_versioned(
                    &mut profiles,
                    "profile",
                    &write.profile.user_id,
                    write.expected_version,
                    &write.profile,
                )?;
            }
        }
        let event = append_event(&txn, commit.event)?;
        txn.commit()?;
        Ok(event)
    }

    // ========== Profiles ==========

    fn profile(&self, user_id: &str) -> StorageResult<Option<Versioned<SpendingProfile>>> {
        self.read_record(PROFILES_TABLE, user_id)
    }
}
