//! Account model
//!
//! An investor account with:
//! - An optional sponsor link (the referral tree is single-parent)
//! - A current tier pointer, advanced lazily by the tier resolver
//! - Lifetime loyalty totals (awarded / withdrawn) with a capped
//!   withdrawable fraction
//! - An optimistic-concurrency version, bumped on every committed update
//!
//! Invariant: `loyalty_withdrawn_total` never exceeds
//! `loyalty_awarded_total × effective withdrawable percentage`. The
//! check-and-decrement in [`Account::try_withdraw_loyalty`] must run inside
//! a single ledger-store update so concurrent withdrawals cannot both pass
//! against a stale balance.
//!
//! CRITICAL: all money and point values are i64.

use crate::core::math::apply_bps;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loyalty balance operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoyaltyError {
    #[error("Loyalty withdrawals are blocked for this account")]
    WithdrawalBlocked,

    #[error("Insufficient loyalty balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: i64, available: i64 },

    #[error("Loyalty amount must be positive")]
    NonPositiveAmount,
}

/// An investor account.
///
/// # Example
/// ```
/// use compensation_engine_core_rs::models::account::Account;
///
/// let mut account = Account::new("alice", None, "basic");
/// account.award_loyalty(100).unwrap();
/// assert_eq!(account.loyalty_awarded_total(), 100);
/// assert_eq!(account.loyalty_available(10_000), 100); // 100% withdrawable
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account identifier
    id: String,

    /// Direct sponsor (None for root accounts)
    sponsor_id: Option<String>,

    /// Current tier pointer
    tier_id: String,

    /// Cumulative confirmed investment (i64 cents)
    cumulative_invested: i64,

    /// Lifetime loyalty points awarded
    loyalty_awarded_total: i64,

    /// Lifetime loyalty points withdrawn
    loyalty_withdrawn_total: i64,

    /// Per-account override of the withdrawable percentage (basis points).
    /// None falls back to the global setting.
    withdrawable_override_bps: Option<u32>,

    /// Loyalty withdrawals blocked for this account
    loyalty_blocked: bool,

    /// Optimistic concurrency token, bumped by the ledger store on every
    /// committed update
    version: u64,
}

impl Account {
    pub fn new(
        id: impl Into<String>,
        sponsor_id: Option<String>,
        tier_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            sponsor_id,
            tier_id: tier_id.into(),
            cumulative_invested: 0,
            loyalty_awarded_total: 0,
            loyalty_withdrawn_total: 0,
            withdrawable_override_bps: None,
            loyalty_blocked: false,
            version: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sponsor_id(&self) -> Option<&str> {
        self.sponsor_id.as_deref()
    }

    pub fn tier_id(&self) -> &str {
        &self.tier_id
    }

    /// Repoint the account's current tier (tier upgrades only).
    pub fn set_tier(&mut self, tier_id: impl Into<String>) {
        self.tier_id = tier_id.into();
    }

    pub fn cumulative_invested(&self) -> i64 {
        self.cumulative_invested
    }

    /// Record a confirmed investment towards tier qualification.
    pub fn record_investment(&mut self, principal: i64) {
        assert!(principal > 0, "principal must be positive");
        self.cumulative_invested += principal;
    }

    pub fn loyalty_awarded_total(&self) -> i64 {
        self.loyalty_awarded_total
    }

    pub fn loyalty_withdrawn_total(&self) -> i64 {
        self.loyalty_withdrawn_total
    }

    pub fn withdrawable_override_bps(&self) -> Option<u32> {
        self.withdrawable_override_bps
    }

    pub fn set_withdrawable_override_bps(&mut self, bps: Option<u32>) {
        self.withdrawable_override_bps = bps;
    }

    pub fn is_loyalty_blocked(&self) -> bool {
        self.loyalty_blocked
    }

    pub fn set_loyalty_blocked(&mut self, blocked: bool) {
        self.loyalty_blocked = blocked;
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Bump the optimistic-concurrency version. Called by the ledger store
    /// after every committed update.
    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }

    /// Effective withdrawable percentage: the per-account override when
    /// set, the global setting otherwise.
    pub fn effective_withdrawable_bps(&self, global_bps: u32) -> u32 {
        self.withdrawable_override_bps.unwrap_or(global_bps)
    }

    /// Loyalty points currently available for withdrawal:
    /// `awarded × effective percentage − withdrawn`, floored at zero.
    pub fn loyalty_available(&self, global_bps: u32) -> i64 {
        let cap = apply_bps(
            self.loyalty_awarded_total,
            self.effective_withdrawable_bps(global_bps),
        );
        (cap - self.loyalty_withdrawn_total).max(0)
    }

    /// Award loyalty points.
    pub fn award_loyalty(&mut self, points: i64) -> Result<(), LoyaltyError> {
        if points <= 0 {
            return Err(LoyaltyError::NonPositiveAmount);
        }
        self.loyalty_awarded_total += points;
        Ok(())
    }

    /// Withdraw loyalty points: blocked-flag check, balance check, and
    /// decrement as one operation.
    ///
    /// Callers must invoke this inside a ledger-store account update so the
    /// check and the decrement commit atomically.
    pub fn try_withdraw_loyalty(
        &mut self,
        points: i64,
        global_bps: u32,
        globally_blocked: bool,
    ) -> Result<(), LoyaltyError> {
        if points <= 0 {
            return Err(LoyaltyError::NonPositiveAmount);
        }
        if self.loyalty_blocked || globally_blocked {
            return Err(LoyaltyError::WithdrawalBlocked);
        }
        let available = self.loyalty_available(global_bps);
        if points > available {
            return Err(LoyaltyError::InsufficientBalance {
                requested: points,
                available,
            });
        }
        self.loyalty_withdrawn_total += points;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_percentage_override() {
        let mut account = Account::new("a", None, "basic");
        assert_eq!(account.effective_withdrawable_bps(10_000), 10_000);

        account.set_withdrawable_override_bps(Some(2_500));
        assert_eq!(account.effective_withdrawable_bps(10_000), 2_500);
    }

    #[test]
    fn test_loyalty_available_respects_cap() {
        let mut account = Account::new("a", None, "basic");
        account.award_loyalty(1_000).unwrap();
        account.set_withdrawable_override_bps(Some(5_000)); // 50%

        assert_eq!(account.loyalty_available(10_000), 500);

        account.try_withdraw_loyalty(300, 10_000, false).unwrap();
        assert_eq!(account.loyalty_available(10_000), 200);
    }

    #[test]
    fn test_withdraw_blocked_account() {
        let mut account = Account::new("a", None, "basic");
        account.award_loyalty(100).unwrap();
        account.set_loyalty_blocked(true);

        let err = account.try_withdraw_loyalty(10, 10_000, false).unwrap_err();
        assert_eq!(err, LoyaltyError::WithdrawalBlocked);
    }

    #[test]
    fn test_withdraw_global_block() {
        let mut account = Account::new("a", None, "basic");
        account.award_loyalty(100).unwrap();

        let err = account.try_withdraw_loyalty(10, 10_000, true).unwrap_err();
        assert_eq!(err, LoyaltyError::WithdrawalBlocked);
    }

    #[test]
    fn test_withdraw_insufficient() {
        let mut account = Account::new("a", None, "basic");
        account.award_loyalty(100).unwrap();

        let err = account
            .try_withdraw_loyalty(150, 10_000, false)
            .unwrap_err();
        assert_eq!(
            err,
            LoyaltyError::InsufficientBalance {
                requested: 150,
                available: 100
            }
        );
    }

    #[test]
    fn test_withdrawn_never_exceeds_cap() {
        let mut account = Account::new("a", None, "basic");
        account.award_loyalty(1_000).unwrap();

        // Full cap can be withdrawn, one more point cannot.
        account.try_withdraw_loyalty(1_000, 10_000, false).unwrap();
        assert!(account.try_withdraw_loyalty(1, 10_000, false).is_err());
    }
}
