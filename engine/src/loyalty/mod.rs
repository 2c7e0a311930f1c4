//! Loyalty Accrual Engine
//!
//! Accrues loyalty points on qualifying events (confirmed profit payouts,
//! settled commissions, manual awards) and serves withdrawals against the
//! capped withdrawable balance.
//!
//! The balance check and the decrement commit under an account version
//! check: of two concurrent withdrawals, the loser's commit conflicts, is
//! retried against a fresh read, and then fails with
//! `InsufficientLoyaltyBalance` instead of double-spending.

use crate::config::GlobalSettings;
use crate::error::EngineError;
use crate::ledger::InMemoryLedger;
use crate::models::event::{LoyaltyLedgerEntry, LoyaltySource};
use std::sync::Arc;

/// A point-of-time loyalty balance summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoyaltyBalance {
    pub awarded: i64,
    pub withdrawn: i64,
    pub available: i64,
}

/// Points earned by a paid-out amount: one `points_per_unit` batch per
/// whole currency unit, fractions floored.
pub fn points_for_amount(amount_cents: i64, points_per_unit: i64) -> i64 {
    debug_assert!(amount_cents >= 0 && points_per_unit >= 0);
    amount_cents / 100 * points_per_unit
}

/// Loyalty accrual and withdrawal over a shared ledger store.
#[derive(Debug, Clone)]
pub struct LoyaltyEngine {
    ledger: Arc<InMemoryLedger>,
    settings: GlobalSettings,
}

impl LoyaltyEngine {
    pub fn new(ledger: Arc<InMemoryLedger>, settings: GlobalSettings) -> Self {
        Self { ledger, settings }
    }

    /// Award points for a qualifying event.
    pub fn award(
        &self,
        account_id: &str,
        points: i64,
        source: LoyaltySource,
        day: i64,
    ) -> Result<(), EngineError> {
        if points == 0 {
            return Ok(());
        }
        self.ledger.update_account(account_id, |account| {
            account.award_loyalty(points).map_err(EngineError::from)
        })?;
        self.ledger
            .append_loyalty_entry(LoyaltyLedgerEntry::new(account_id, points, source, day));
        self.ledger.audit(
            day,
            "LoyaltyAward",
            account_id,
            format!("{points} points ({source:?})"),
        );
        Ok(())
    }

    /// Withdraw points. The blocked-flag check, the balance check against
    /// the effective withdrawable percentage, and the decrement commit
    /// under a version check: a concurrent update between the read and the
    /// commit surfaces as a conflict, retried against a fresh read up to
    /// the configured attempt bound.
    pub fn withdraw(&self, account_id: &str, points: i64, day: i64) -> Result<(), EngineError> {
        let global_bps = self.settings.loyalty_withdrawable_bps;
        let globally_blocked = self.settings.loyalty_globally_blocked;

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let version = self.ledger.get_account(account_id)?.version();
            let result = self.ledger.update_account_versioned(account_id, version, |account| {
                account
                    .try_withdraw_loyalty(points, global_bps, globally_blocked)
                    .map_err(EngineError::from)
            });
            match result {
                Ok(()) => break,
                Err(EngineError::Conflict(_)) if attempts < self.settings.max_update_attempts => {
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        self.ledger.append_loyalty_entry(LoyaltyLedgerEntry::new(
            account_id,
            -points,
            LoyaltySource::Withdrawal,
            day,
        ));
        self.ledger
            .audit(day, "LoyaltyWithdrawal", account_id, format!("{points} points"));
        Ok(())
    }

    /// Current balance summary for an account.
    pub fn balance(&self, account_id: &str) -> Result<LoyaltyBalance, EngineError> {
        let account = self.ledger.get_account(account_id)?;
        Ok(LoyaltyBalance {
            awarded: account.loyalty_awarded_total(),
            withdrawn: account.loyalty_withdrawn_total(),
            available: account.loyalty_available(self.settings.loyalty_withdrawable_bps),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::Account;

    fn engine() -> LoyaltyEngine {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger
            .insert_account(Account::new("alice", None, "basic"))
            .unwrap();
        LoyaltyEngine::new(ledger, GlobalSettings::default())
    }

    #[test]
    fn test_points_for_amount_floors_fractions() {
        assert_eq!(points_for_amount(5_000, 1), 50);
        assert_eq!(points_for_amount(5_099, 1), 50);
        assert_eq!(points_for_amount(99, 1), 0);
        assert_eq!(points_for_amount(5_000, 2), 100);
    }

    #[test]
    fn test_award_and_withdraw_round_trip() {
        let loyalty = engine();

        loyalty
            .award("alice", 100, LoyaltySource::ProfitPayout, 30)
            .unwrap();
        loyalty.withdraw("alice", 40, 31).unwrap();

        let balance = loyalty.balance("alice").unwrap();
        assert_eq!(balance.awarded, 100);
        assert_eq!(balance.withdrawn, 40);
        assert_eq!(balance.available, 60);
    }

    #[test]
    fn test_zero_point_award_records_nothing() {
        let loyalty = engine();
        loyalty
            .award("alice", 0, LoyaltySource::ProfitPayout, 30)
            .unwrap();
        assert!(loyalty.ledger.loyalty_entries().is_empty());
    }

    #[test]
    fn test_global_block_rejects_withdrawal() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger
            .insert_account(Account::new("alice", None, "basic"))
            .unwrap();
        let settings = GlobalSettings {
            loyalty_globally_blocked: true,
            ..GlobalSettings::default()
        };
        let loyalty = LoyaltyEngine::new(ledger, settings);

        loyalty
            .award("alice", 100, LoyaltySource::ManualAward, 1)
            .unwrap();
        assert!(loyalty.withdraw("alice", 10, 2).is_err());
    }

    #[test]
    fn test_failed_withdrawal_appends_no_entry() {
        let loyalty = engine();
        loyalty
            .award("alice", 10, LoyaltySource::ManualAward, 1)
            .unwrap();

        assert!(loyalty.withdraw("alice", 100, 2).is_err());

        // Only the award entry exists.
        assert_eq!(loyalty.ledger.loyalty_entries().len(), 1);
        let balance = loyalty.balance("alice").unwrap();
        assert_eq!(balance.withdrawn, 0);
    }
}
