//! Eligibility Evaluator
//!
//! Decides whether a user may redeem a voucher right now and how many
//! redemptions remain. Reads nothing but the voucher value itself.

use crate::utils::error::SettlementError;
use serde::{Deserialize, Serialize};
use shared::models::{Voucher, VoucherAudience};

/// Why a voucher cannot be redeemed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Ineligibility {
    /// `now` is after the end date
    Expired,
    /// `now` is before the start date
    NotStarted,
    /// Deactivated by staff
    Inactive,
    /// Public voucher already redeemed by this user
    AlreadyUsed,
    /// Public voucher's total quantity used up
    SoldOut,
    /// Private voucher not assigned to this user
    NotAssigned,
    /// Private voucher quota for this user is 0
    QuotaExhausted,
}

impl std::fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ineligibility::Expired => write!(f, "EXPIRED"),
            Ineligibility::NotStarted => write!(f, "NOT_STARTED"),
            Ineligibility::Inactive => write!(f, "INACTIVE"),
            Ineligibility::AlreadyUsed => write!(f, "ALREADY_USED"),
            Ineligibility::SoldOut => write!(f, "SOLD_OUT"),
            Ineligibility::NotAssigned => write!(f, "NOT_ASSIGNED"),
            Ineligibility::QuotaExhausted => write!(f, "QUOTA_EXHAUSTED"),
        }
    }
}

/// Result of [`evaluate`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Eligibility {
    pub eligible: bool,
    pub remaining: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Ineligibility>,
}

impl Eligibility {
    fn eligible(remaining: u32) -> Self {
        Self {
            eligible: true,
            remaining,
            reason: None,
        }
    }

    fn denied(reason: Ineligibility, remaining: u32) -> Self {
        Self {
            eligible: false,
            remaining,
            reason: Some(reason),
        }
    }

    /// `Ok(remaining)` when eligible, otherwise the matching error kind
    pub fn into_result(self, voucher_id: &str) -> Result<u32, SettlementError> {
        match self.reason {
            None if self.eligible => Ok(self.remaining),
            Some(Ineligibility::Expired) => Err(SettlementError::VoucherExpired(voucher_id.into())),
            Some(Ineligibility::NotStarted) => {
                Err(SettlementError::VoucherNotStarted(voucher_id.into()))
            }
            Some(Ineligibility::Inactive) => {
                Err(SettlementError::VoucherInactive(voucher_id.into()))
            }
            Some(reason) => Err(SettlementError::VoucherNotEligible {
                voucher_id: voucher_id.into(),
                reason,
            }),
            None => Err(SettlementError::VoucherNotEligible {
                voucher_id: voucher_id.into(),
                reason: Ineligibility::QuotaExhausted,
            }),
        }
    }
}

/// Evaluate `user_id`'s right to redeem `voucher` at `now`
///
/// Start and end dates are inclusive. Public vouchers allow one redemption
/// per user (bounded by `total_quantity` when non-zero); private vouchers
/// allow up to the user's own remaining quota.
pub fn evaluate(voucher: &Voucher, user_id: &str, now: i64) -> Eligibility {
    if now > voucher.end_date() {
        return Eligibility::denied(Ineligibility::Expired, 0);
    }
    if now < voucher.start_date() {
        return Eligibility::denied(Ineligibility::NotStarted, 0);
    }
    if !voucher.is_active() {
        return Eligibility::denied(Ineligibility::Inactive, 0);
    }

    match voucher.audience() {
        VoucherAudience::Public {
            total_quantity,
            used_by_user_ids,
        } => {
            let used = used_by_user_ids.contains(user_id);
            let remaining = if *total_quantity == 0 {
                if used { 0 } else { 1 }
            } else {
                let taken = u32::try_from(used_by_user_ids.len()).unwrap_or(u32::MAX);
                total_quantity.saturating_sub(taken)
            };

            if used {
                Eligibility::denied(Ineligibility::AlreadyUsed, remaining)
            } else if remaining == 0 {
                Eligibility::denied(Ineligibility::SoldOut, 0)
            } else {
                Eligibility::eligible(remaining)
            }
        }
        VoucherAudience::Private {
            assigned_user_ids,
            user_quantities,
        } => {
            let remaining = user_quantities.get(user_id).copied().unwrap_or(0);
            if !assigned_user_ids.contains(user_id) {
                Eligibility::denied(Ineligibility::NotAssigned, remaining)
            } else if remaining == 0 {
                Eligibility::denied(Ineligibility::QuotaExhausted, 0)
            } else {
                Eligibility::eligible(remaining)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{DiscountKind, VoucherDraft, VoucherScope};
    use std::collections::{BTreeMap, BTreeSet};

    fn draft() -> VoucherDraft {
        VoucherDraft {
            code: "OPEN50".to_string(),
            discount_kind: DiscountKind::Percent,
            discount_value: 50,
            min_order_value: 0,
            max_discount_value: 100_000,
            start_date: 100,
            end_date: 200,
            scope: VoucherScope::Product,
            assigned_user_ids: BTreeSet::new(),
            total_quantity: 0,
            user_quantities: BTreeMap::new(),
        }
    }

    fn public(total_quantity: u32) -> Voucher {
        let mut d = draft();
        d.total_quantity = total_quantity;
        Voucher::create("v1".into(), d, 0).unwrap()
    }

    fn private(quotas: &[(&str, u32)]) -> Voucher {
        let mut d = draft();
        d.assigned_user_ids = quotas.iter().map(|(u, _)| u.to_string()).collect();
        d.user_quantities = quotas.iter().map(|(u, q)| (u.to_string(), *q)).collect();
        Voucher::create("v2".into(), d, 0).unwrap()
    }

    #[test]
    fn test_dates_are_inclusive() {
        let v = public(0);
        assert!(evaluate(&v, "u1", 100).eligible);
        assert!(evaluate(&v, "u1", 200).eligible);
        assert_eq!(
            evaluate(&v, "u1", 99),
            Eligibility::denied(Ineligibility::NotStarted, 0)
        );
        assert_eq!(
            evaluate(&v, "u1", 201),
            Eligibility::denied(Ineligibility::Expired, 0)
        );
    }

    #[test]
    fn test_inactive_voucher() {
        let v = public(0).deactivated();
        let result = evaluate(&v, "u1", 150);
        assert!(!result.eligible);
        assert_eq!(result.reason, Some(Ineligibility::Inactive));
        assert_eq!(result.remaining, 0);
    }

    #[test]
    fn test_public_unlimited_once_per_user() {
        let v = public(0);
        assert_eq!(evaluate(&v, "u1", 150), Eligibility::eligible(1));

        let used = v.redeemed_by("u1").unwrap();
        assert_eq!(
            evaluate(&used, "u1", 150),
            Eligibility::denied(Ineligibility::AlreadyUsed, 0)
        );
        assert_eq!(evaluate(&used, "u2", 150), Eligibility::eligible(1));
    }

    #[test]
    fn test_public_capped_quantity() {
        let v = public(2).redeemed_by("a").unwrap();
        assert_eq!(evaluate(&v, "b", 150), Eligibility::eligible(1));
        // already used but one copy left for others
        assert_eq!(
            evaluate(&v, "a", 150),
            Eligibility::denied(Ineligibility::AlreadyUsed, 1)
        );

        let v = v.redeemed_by("b").unwrap();
        assert_eq!(
            evaluate(&v, "c", 150),
            Eligibility::denied(Ineligibility::SoldOut, 0)
        );
    }

    #[test]
    fn test_private_quota() {
        let v = private(&[("u1", 2), ("u3", 0)]);
        assert_eq!(evaluate(&v, "u1", 150), Eligibility::eligible(2));
        assert_eq!(
            evaluate(&v, "u2", 150),
            Eligibility::denied(Ineligibility::NotAssigned, 0)
        );
        assert_eq!(
            evaluate(&v, "u3", 150),
            Eligibility::denied(Ineligibility::QuotaExhausted, 0)
        );

        let v = v.redeemed_by("u1").unwrap().redeemed_by("u1").unwrap();
        assert_eq!(
            evaluate(&v, "u1", 150).reason,
            Some(Ineligibility::QuotaExhausted)
        );
    }

    #[test]
    fn test_into_result_maps_error_kinds() {
        let v = public(0);
        assert_eq!(evaluate(&v, "u1", 150).into_result("v1").unwrap(), 1);
        assert!(matches!(
            evaluate(&v, "u1", 201).into_result("v1"),
            Err(SettlementError::VoucherExpired(_))
        ));
        assert!(matches!(
            evaluate(&v, "u1", 99).into_result("v1"),
            Err(SettlementError::VoucherNotStarted(_))
        ));
        assert!(matches!(
            evaluate(&v.deactivated(), "u1", 150).into_result("v1"),
            Err(SettlementError::VoucherInactive(_))
        ));
        let used = v.redeemed_by("u1").unwrap();
        assert!(matches!(
            evaluate(&used, "u1", 150).into_result("v1"),
            Err(SettlementError::VoucherNotEligible {
                reason: Ineligibility::AlreadyUsed,
                ..
            })
        ));
    }
}
