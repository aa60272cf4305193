//! Voucher Catalog
//!
//! Lookup and administration of voucher definitions. Codes are matched
//! case-insensitively after trimming; at most one active voucher holds a code.

use super::eligibility::evaluate;
use crate::utils::error::{SettlementError, SettlementResult};
use crate::orders::storage::{SettlementStore, StorageError, Versioned, VoucherWrite};
use shared::models::{Voucher, VoucherDraft};
use shared::util::{new_id, normalize_code};
use std::sync::Arc;

/// Voucher lookups backed by the settlement store
#[derive(Clone)]
pub struct VoucherCatalog {
    store: Arc<dyn SettlementStore>,
}

impl std::fmt::Debug for VoucherCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoucherCatalog")
            .field("store", &"<SettlementStore>")
            .finish()
    }
}

impl VoucherCatalog {
    pub fn new(store: Arc<dyn SettlementStore>) -> Self {
        Self { store }
    }

    /// Create an active voucher from a staff draft
    ///
    /// Invalid drafts fail with `InvalidArgument`; a code already held by an
    /// active voucher fails with `DuplicateVoucherCode`.
    pub fn create(&self, draft: VoucherDraft, now: i64) -> SettlementResult<Versioned<Voucher>> {
        let voucher = Voucher::create(new_id(), draft, now)?;
        match self.store.insert_voucher(&voucher) {
            Ok(stored) => {
                tracing::info!(
                    voucher_id = %voucher.id(),
                    code = %voucher.code(),
                    scope = %voucher.scope(),
                    public = voucher.is_public(),
                    "Voucher created"
                );
                Ok(stored)
            }
            Err(StorageError::DuplicateKey(_)) => Err(SettlementError::DuplicateVoucherCode(
                voucher.code().to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Deactivate a voucher (idempotent, never deletes)
    pub fn deactivate(&self, id: &str) -> SettlementResult<Versioned<Voucher>> {
        let current = self.find_by_id(id)?;
        if !current.record.is_active() {
            return Ok(current);
        }
        let stored = self.store.update_voucher(VoucherWrite {
            expected_version: current.version,
            voucher: current.record.deactivated(),
        })?;
        tracing::info!(voucher_id = %id, "Voucher deactivated");
        Ok(stored)
    }

    /// Latest voucher with this code (case-insensitive)
    pub fn find_by_code(&self, code: &str) -> SettlementResult<Versioned<Voucher>> {
        let normalized = normalize_code(code);
        if normalized.is_empty() {
            return Err(SettlementError::InvalidArgument(
                "voucher code must not be empty".into(),
            ));
        }
        self.store
            .voucher_by_code(&normalized)?
            .ok_or_else(|| SettlementError::VoucherNotFound(code.trim().to_string()))
    }

    pub fn find_by_id(&self, id: &str) -> SettlementResult<Versioned<Voucher>> {
        self.store
            .voucher(id)?
            .ok_or_else(|| SettlementError::VoucherNotFound(id.to_string()))
    }

    /// Every voucher `user_id` may redeem at `now`, with remaining redemptions
    ///
    /// Sorted by end date so the ones expiring first come first.
    pub fn available_for(&self, user_id: &str, now: i64) -> SettlementResult<Vec<(Voucher, u32)>> {
        let mut available: Vec<(Voucher, u32)> = self
            .store
            .vouchers()?
            .into_iter()
            .filter_map(|stored| {
                let result = evaluate(&stored.record, user_id, now);
                result.eligible.then_some((stored.record, result.remaining))
            })
            .collect();
        available.sort_by(|(a, _), (b, _)| {
            a.end_date()
                .cmp(&b.end_date())
                .then_with(|| a.code().cmp(b.code()))
        });
        Ok(available)
    }
}
