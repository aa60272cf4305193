//! Voucher Model
//!
//! A voucher is a discount code with eligibility and quota rules. It is either
//! public (any user, once per user, optionally capped in total) or private
//! (assigned users, each with their own remaining quota). The two quota
//! mechanisms live in [`VoucherAudience`] so a voucher can never carry both.

use super::ModelError;
use crate::util::normalize_code;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How the discount value is interpreted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    /// Percentage of the subtotal, in (0, 100]
    Percent,
    /// Absolute amount in currency units
    Amount,
}

/// Which part of the order a voucher discounts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoucherScope {
    /// Discounts the product subtotal
    Product,
    /// Discounts the delivery fee
    Shipping,
}

impl std::fmt::Display for VoucherScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoucherScope::Product => write!(f, "PRODUCT"),
            VoucherScope::Shipping => write!(f, "SHIPPING"),
        }
    }
}

/// Who may redeem a voucher, and the matching quota bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "audience", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoucherAudience {
    /// Usable by anyone, at most once per user
    Public {
        /// 0 = unlimited
        total_quantity: u32,
        /// One entry per user who redeemed
        #[serde(default)]
        used_by_user_ids: BTreeSet<String>,
    },
    /// Usable only by the assigned users, up to their own quota
    Private {
        assigned_user_ids: BTreeSet<String>,
        /// Remaining uses per user
        #[serde(default)]
        user_quantities: BTreeMap<String, u32>,
    },
}

/// Staff-provided definition of a new voucher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherDraft {
    pub code: String,
    pub discount_kind: DiscountKind,
    pub discount_value: i64,
    #[serde(default)]
    pub min_order_value: i64,
    /// 0 = uncapped (PERCENT only)
    #[serde(default)]
    pub max_discount_value: i64,
    pub start_date: i64,
    pub end_date: i64,
    pub scope: VoucherScope,
    /// Empty = public voucher
    #[serde(default)]
    pub assigned_user_ids: BTreeSet<String>,
    /// Public only, 0 = unlimited
    #[serde(default)]
    pub total_quantity: u32,
    /// Private only
    #[serde(default)]
    pub user_quantities: BTreeMap<String, u32>,
}

/// Voucher entity (called "Promotion" by the storefront)
///
/// Constructed only through [`Voucher::create`] or validated deserialization.
/// Redemption and deactivation return new values; nothing mutates in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "VoucherRecord")]
pub struct Voucher {
    id: String,
    code: String,
    discount_kind: DiscountKind,
    discount_value: i64,
    min_order_value: i64,
    max_discount_value: i64,
    start_date: i64,
    end_date: i64,
    is_active: bool,
    scope: VoucherScope,
    audience: VoucherAudience,
    created_at: i64,
}

/// Unvalidated wire/storage layout of [`Voucher`]
#[derive(Debug, Clone, Deserialize)]
struct VoucherRecord {
    id: String,
    code: String,
    discount_kind: DiscountKind,
    discount_value: i64,
    min_order_value: i64,
    max_discount_value: i64,
    start_date: i64,
    end_date: i64,
    is_active: bool,
    scope: VoucherScope,
    audience: VoucherAudience,
    created_at: i64,
}

impl TryFrom<VoucherRecord> for Voucher {
    type Error = ModelError;

    fn try_from(r: VoucherRecord) -> Result<Self, Self::Error> {
        let voucher = Self {
            id: r.id,
            code: r.code,
            discount_kind: r.discount_kind,
            discount_value: r.discount_value,
            min_order_value: r.min_order_value,
            max_discount_value: r.max_discount_value,
            start_date: r.start_date,
            end_date: r.end_date,
            is_active: r.is_active,
            scope: r.scope,
            audience: r.audience,
            created_at: r.created_at,
        };
        voucher.validate()?;
        Ok(voucher)
    }
}

impl Voucher {
    /// Build an active voucher from a staff draft
    pub fn create(id: String, draft: VoucherDraft, created_at: i64) -> Result<Self, ModelError> {
        let audience = if draft.assigned_user_ids.is_empty() {
            if !draft.user_quantities.is_empty() {
                return Err(ModelError::Invalid(
                    "user_quantities require assigned_user_ids".into(),
                ));
            }
            VoucherAudience::Public {
                total_quantity: draft.total_quantity,
                used_by_user_ids: BTreeSet::new(),
            }
        } else {
            VoucherAudience::Private {
                assigned_user_ids: draft.assigned_user_ids,
                user_quantities: draft.user_quantities,
            }
        };

        let voucher = Self {
            id,
            code: draft.code.trim().to_string(),
            discount_kind: draft.discount_kind,
            discount_value: draft.discount_value,
            min_order_value: draft.min_order_value,
            max_discount_value: draft.max_discount_value,
            start_date: draft.start_date,
            end_date: draft.end_date,
            is_active: true,
            scope: draft.scope,
            audience,
            created_at,
        };
        voucher.validate()?;
        Ok(voucher)
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.id.trim().is_empty() {
            return Err(ModelError::Required("id"));
        }
        if self.code.trim().is_empty() {
            return Err(ModelError::Required("code"));
        }
        if self.discount_value <= 0 {
            return Err(ModelError::Invalid(format!(
                "discount_value must be positive, got {}",
                self.discount_value
            )));
        }
        if self.discount_kind == DiscountKind::Percent && self.discount_value > 100 {
            return Err(ModelError::Invalid(format!(
                "percent discount must be in (0, 100], got {}",
                self.discount_value
            )));
        }
        if self.min_order_value < 0 {
            return Err(ModelError::Negative("min_order_value"));
        }
        if self.max_discount_value < 0 {
            return Err(ModelError::Negative("max_discount_value"));
        }
        if self.end_date < self.start_date {
            return Err(ModelError::Invalid(format!(
                "end_date {} is before start_date {}",
                self.end_date, self.start_date
            )));
        }
        if let VoucherAudience::Private {
            assigned_user_ids,
            user_quantities,
        } = &self.audience
        {
            if assigned_user_ids.is_empty() {
                return Err(ModelError::Required("assigned_user_ids"));
            }
            if let Some(user) = user_quantities
                .keys()
                .find(|u| !assigned_user_ids.contains(*u))
            {
                return Err(ModelError::Invalid(format!(
                    "quota given to unassigned user {}",
                    user
                )));
            }
        }
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Code as entered by staff
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Code used for case-insensitive lookups
    pub fn normalized_code(&self) -> String {
        normalize_code(&self.code)
    }

    pub fn discount_kind(&self) -> DiscountKind {
        self.discount_kind
    }

    pub fn discount_value(&self) -> i64 {
        self.discount_value
    }

    pub fn min_order_value(&self) -> i64 {
        self.min_order_value
    }

    pub fn max_discount_value(&self) -> i64 {
        self.max_discount_value
    }

    pub fn start_date(&self) -> i64 {
        self.start_date
    }

    pub fn end_date(&self) -> i64 {
        self.end_date
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn scope(&self) -> VoucherScope {
        self.scope
    }

    pub fn audience(&self) -> &VoucherAudience {
        &self.audience
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Public vouchers have no assigned users
    pub fn is_public(&self) -> bool {
        matches!(self.audience, VoucherAudience::Public { .. })
    }

    /// Copy of this voucher with `is_active = false`
    pub fn deactivated(&self) -> Self {
        Self {
            is_active: false,
            ..self.clone()
        }
    }

    /// Copy of this voucher with one redemption by `user_id` recorded
    ///
    /// Public: the user joins `used_by_user_ids` (fails if already there or
    /// the total quantity is used up). Private: the user's quota drops by one
    /// (fails if the user is unassigned or has nothing left).
    pub fn redeemed_by(&self, user_id: &str) -> Result<Self, ModelError> {
        let audience = match &self.audience {
            VoucherAudience::Public {
                total_quantity,
                used_by_user_ids,
            } => {
                if used_by_user_ids.contains(user_id) {
                    return Err(ModelError::QuotaExhausted(user_id.to_string()));
                }
                if *total_quantity > 0 && used_by_user_ids.len() >= *total_quantity as usize {
                    return Err(ModelError::QuotaExhausted(user_id.to_string()));
                }
                let mut used = used_by_user_ids.clone();
                used.insert(user_id.to_string());
                VoucherAudience::Public {
                    total_quantity: *total_quantity,
                    used_by_user_ids: used,
                }
            }
            VoucherAudience::Private {
                assigned_user_ids,
                user_quantities,
            } => {
                if !assigned_user_ids.contains(user_id) {
                    return Err(ModelError::QuotaExhausted(user_id.to_string()));
                }
                let remaining = user_quantities.get(user_id).copied().unwrap_or(0);
                let Some(left) = remaining.checked_sub(1) else {
                    return Err(ModelError::QuotaExhausted(user_id.to_string()));
                };
                let mut quantities = user_quantities.clone();
                quantities.insert(user_id.to_string(), left);
                VoucherAudience::Private {
                    assigned_user_ids: assigned_user_ids.clone(),
                    user_quantities: quantities,
                }
            }
        };
        Ok(Self {
            audience,
            ..self.clone()
        })
    }
}
