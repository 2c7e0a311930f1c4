//! Ledger Store
//!
//! The in-memory reference storage adapter: append-only event tables per
//! event type plus mutable account/investment summary rows kept consistent
//! with the log. A durable backend would implement the same surface; core
//! logic never touches storage internals directly.
//!
//! # Critical Invariants
//!
//! 1. **Keyed appends are idempotent**: profit shares dedup on
//!    (investment, payment day), commissions on (referrer, investment,
//!    cycle, level). A duplicate append is a detected no-op, never a
//!    second event.
//! 2. **Atomic read-modify-write**: account and investment updates run
//!    under the row lock against a working copy; nothing is committed on
//!    error, and the optimistic version bumps exactly once per commit.
//! 3. **Advisory processing locks**: no two cycle runs overlap on the
//!    same investment; the loser of the race sees a no-op.
//! 4. **Append-only audit**: every state transition lands in the audit
//!    trail; entries are never deleted.

use crate::error::EngineError;
use crate::models::account::Account;
use crate::models::event::{
    commission_key, profit_share_key, LoyaltyLedgerEntry, ProfitShareEvent,
    ReferralCommissionEvent, TierUpgradeEvent, WithdrawalRequest,
};
use crate::models::investment::Investment;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// One audit-trail entry. Append-only; never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub day: i64,
    pub action: String,
    pub entity_id: String,
    pub detail: String,
}

/// Append-only table with idempotency-key deduplication.
#[derive(Debug)]
struct EventTable<T> {
    rows: Vec<T>,
    keys: HashSet<String>,
}

impl<T> Default for EventTable<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            keys: HashSet::new(),
        }
    }
}

impl<T> EventTable<T> {
    /// Append unless the key was already recorded. Returns whether the row
    /// was actually added.
    fn append(&mut self, key: String, row: T) -> bool {
        if !self.keys.insert(key) {
            return false;
        }
        self.rows.push(row);
        true
    }
}

/// Acquire a mutex, recovering from poisoning.
///
/// A poisoned lock only means another writer panicked mid-update; the data
/// it guards is still the source of truth for this process.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Serializable dump of the whole store, used by checkpointing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub accounts: Vec<Account>,
    pub investments: Vec<Investment>,
    pub profit_shares: Vec<ProfitShareEvent>,
    pub commissions: Vec<ReferralCommissionEvent>,
    pub withdrawals: Vec<WithdrawalRequest>,
    pub tier_upgrades: Vec<TierUpgradeEvent>,
    pub loyalty_entries: Vec<LoyaltyLedgerEntry>,
    pub audit: Vec<AuditEntry>,
}

/// The in-memory ledger store.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    accounts: Mutex<HashMap<String, Account>>,
    investments: Mutex<HashMap<String, Investment>>,
    profit_shares: Mutex<EventTable<ProfitShareEvent>>,
    commissions: Mutex<EventTable<ReferralCommissionEvent>>,
    withdrawals: Mutex<Vec<WithdrawalRequest>>,
    tier_upgrades: Mutex<Vec<TierUpgradeEvent>>,
    loyalty_entries: Mutex<Vec<LoyaltyLedgerEntry>>,
    in_flight: Mutex<HashSet<String>>,
    audit: Mutex<Vec<AuditEntry>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    pub fn insert_account(&self, account: Account) -> Result<(), EngineError> {
        let mut accounts = lock(&self.accounts);
        if accounts.contains_key(account.id()) {
            return Err(EngineError::Validation(format!(
                "Duplicate account ID: {}",
                account.id()
            )));
        }
        accounts.insert(account.id().to_string(), account);
        Ok(())
    }

    pub fn get_account(&self, id: &str) -> Result<Account, EngineError> {
        lock(&self.accounts)
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("account {id}")))
    }

    pub fn account_exists(&self, id: &str) -> bool {
        lock(&self.accounts).contains_key(id)
    }

    /// Atomic read-modify-write on one account.
    ///
    /// `f` runs against a working copy under the row lock; on `Ok` the copy
    /// is committed and the optimistic version bumps, on `Err` nothing
    /// changes. Two concurrent updates to the same account serialize here,
    /// so a balance check inside `f` can never pass against a stale read.
    pub fn update_account<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Account) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut accounts = lock(&self.accounts);
        let account = accounts
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(format!("account {id}")))?;

        let mut working = account.clone();
        let value = f(&mut working)?;
        working.bump_version();
        *account = working;
        Ok(value)
    }

    /// Compare-and-set variant of [`InMemoryLedger::update_account`] for
    /// optimistic callers that computed against an earlier read.
    ///
    /// Commits only if the account version still matches
    /// `expected_version`; otherwise nothing changes and the caller gets
    /// `Conflict` to retry against a fresh read.
    pub fn update_account_versioned<T>(
        &self,
        id: &str,
        expected_version: u64,
        f: impl FnOnce(&mut Account) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut accounts = lock(&self.accounts);
        let account = accounts
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(format!("account {id}")))?;
        if account.version() != expected_version {
            return Err(EngineError::Conflict(format!(
                "account {id} is at version {}, expected {expected_version}",
                account.version()
            )));
        }

        let mut working = account.clone();
        let value = f(&mut working)?;
        working.bump_version();
        *account = working;
        Ok(value)
    }

    /// All accounts, ordered by id for deterministic iteration.
    pub fn accounts(&self) -> Vec<Account> {
        let mut rows: Vec<Account> = lock(&self.accounts).values().cloned().collect();
        rows.sort_by(|a, b| a.id().cmp(b.id()));
        rows
    }

    /// Sponsor pointers for the referral graph snapshot.
    pub fn sponsor_map(&self) -> HashMap<String, Option<String>> {
        lock(&self.accounts)
            .values()
            .map(|a| (a.id().to_string(), a.sponsor_id().map(str::to_string)))
            .collect()
    }

    // ========================================================================
    // Investments
    // ========================================================================

    pub fn insert_investment(&self, investment: Investment) -> Result<(), EngineError> {
        let mut investments = lock(&self.investments);
        if investments.contains_key(investment.id()) {
            return Err(EngineError::Validation(format!(
                "Duplicate investment ID: {}",
                investment.id()
            )));
        }
        investments.insert(investment.id().to_string(), investment);
        Ok(())
    }

    pub fn get_investment(&self, id: &str) -> Result<Investment, EngineError> {
        lock(&self.investments)
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("investment {id}")))
    }

    /// Atomic read-modify-write on one investment. Same commit semantics
    /// as [`InMemoryLedger::update_account`].
    pub fn update_investment<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Investment) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut investments = lock(&self.investments);
        let investment = investments
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(format!("investment {id}")))?;

        let mut working = investment.clone();
        let value = f(&mut working)?;
        *investment = working;
        Ok(value)
    }

    pub fn investments(&self) -> Vec<Investment> {
        let mut rows: Vec<Investment> = lock(&self.investments).values().cloned().collect();
        rows.sort_by(|a, b| a.id().cmp(b.id()));
        rows
    }

    /// Active investments whose next payment has come due, ordered by
    /// (payment day, id) so batch runs are deterministic.
    pub fn due_investments(&self, as_of_day: i64) -> Vec<String> {
        let investments = lock(&self.investments);
        let mut due: Vec<(i64, String)> = investments
            .values()
            .filter(|inv| inv.is_due(as_of_day))
            .map(|inv| (inv.next_payment_day(), inv.id().to_string()))
            .collect();
        due.sort();
        due.into_iter().map(|(_, id)| id).collect()
    }

    // ========================================================================
    // Advisory processing locks
    // ========================================================================

    /// Claim an investment for processing. Returns false when another run
    /// holds it; the caller must then skip the investment as a no-op.
    pub fn try_begin_processing(&self, investment_id: &str) -> bool {
        lock(&self.in_flight).insert(investment_id.to_string())
    }

    /// Release a processing claim.
    pub fn finish_processing(&self, investment_id: &str) {
        lock(&self.in_flight).remove(investment_id);
    }

    // ========================================================================
    // Profit-share events
    // ========================================================================

    /// Append a profit share under its (investment, payment day) key.
    /// Returns false if that cycle was already recorded.
    pub fn append_profit_share(&self, event: ProfitShareEvent) -> bool {
        let key = event.idempotency_key();
        lock(&self.profit_shares).append(key, event)
    }

    pub fn profit_share_exists(&self, investment_id: &str, cycle_day: i64) -> bool {
        lock(&self.profit_shares)
            .keys
            .contains(&profit_share_key(investment_id, cycle_day))
    }

    pub fn profit_shares(&self) -> Vec<ProfitShareEvent> {
        lock(&self.profit_shares).rows.clone()
    }

    pub fn pending_profit_shares(&self) -> Vec<ProfitShareEvent> {
        lock(&self.profit_shares)
            .rows
            .iter()
            .filter(|e| e.is_pending())
            .cloned()
            .collect()
    }

    pub fn update_profit_share<T>(
        &self,
        event_id: &str,
        f: impl FnOnce(&mut ProfitShareEvent) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut table = lock(&self.profit_shares);
        let event = table
            .rows
            .iter_mut()
            .find(|e| e.id() == event_id)
            .ok_or_else(|| EngineError::NotFound(format!("profit share {event_id}")))?;
        f(event)
    }

    // ========================================================================
    // Commission events
    // ========================================================================

    /// Append a commission under its (referrer, investment, cycle, level)
    /// key. Returns false on a duplicate hop.
    pub fn append_commission(&self, event: ReferralCommissionEvent) -> bool {
        let key = event.idempotency_key();
        lock(&self.commissions).append(key, event)
    }

    pub fn commission_exists(
        &self,
        referrer_id: &str,
        investment_id: &str,
        cycle_day: i64,
        level: u8,
    ) -> bool {
        lock(&self.commissions)
            .keys
            .contains(&commission_key(referrer_id, investment_id, cycle_day, level))
    }

    pub fn commissions(&self) -> Vec<ReferralCommissionEvent> {
        lock(&self.commissions).rows.clone()
    }

    pub fn pending_commissions(&self) -> Vec<ReferralCommissionEvent> {
        lock(&self.commissions)
            .rows
            .iter()
            .filter(|e| e.is_pending())
            .cloned()
            .collect()
    }

    pub fn update_commission<T>(
        &self,
        event_id: &str,
        f: impl FnOnce(&mut ReferralCommissionEvent) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut table = lock(&self.commissions);
        let event = table
            .rows
            .iter_mut()
            .find(|e| e.id() == event_id)
            .ok_or_else(|| EngineError::NotFound(format!("commission {event_id}")))?;
        f(event)
    }

    // ========================================================================
    // Withdrawal requests
    // ========================================================================

    pub fn insert_withdrawal(&self, request: WithdrawalRequest) {
        lock(&self.withdrawals).push(request);
    }

    pub fn get_withdrawal(&self, id: &str) -> Result<WithdrawalRequest, EngineError> {
        lock(&self.withdrawals)
            .iter()
            .find(|r| r.id() == id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("withdrawal {id}")))
    }

    pub fn update_withdrawal<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut WithdrawalRequest) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut withdrawals = lock(&self.withdrawals);
        let request = withdrawals
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| EngineError::NotFound(format!("withdrawal {id}")))?;

        let mut working = request.clone();
        let value = f(&mut working)?;
        *request = working;
        Ok(value)
    }

    pub fn withdrawals(&self) -> Vec<WithdrawalRequest> {
        lock(&self.withdrawals).clone()
    }

    // ========================================================================
    // Tier upgrades and loyalty deltas
    // ========================================================================

    pub fn append_tier_upgrade(&self, event: TierUpgradeEvent) {
        lock(&self.tier_upgrades).push(event);
    }

    pub fn tier_upgrades(&self) -> Vec<TierUpgradeEvent> {
        lock(&self.tier_upgrades).clone()
    }

    pub fn append_loyalty_entry(&self, entry: LoyaltyLedgerEntry) {
        lock(&self.loyalty_entries).push(entry);
    }

    pub fn loyalty_entries(&self) -> Vec<LoyaltyLedgerEntry> {
        lock(&self.loyalty_entries).clone()
    }

    // ========================================================================
    // Audit trail
    // ========================================================================

    /// Record a state transition in the audit trail.
    pub fn audit(
        &self,
        day: i64,
        action: impl Into<String>,
        entity_id: impl Into<String>,
        detail: impl Into<String>,
    ) {
        lock(&self.audit).push(AuditEntry {
            day,
            action: action.into(),
            entity_id: entity_id.into(),
            detail: detail.into(),
        });
    }

    pub fn audit_log(&self) -> Vec<AuditEntry> {
        lock(&self.audit).clone()
    }

    pub fn audit_for(&self, entity_id: &str) -> Vec<AuditEntry> {
        lock(&self.audit)
            .iter()
            .filter(|e| e.entity_id == entity_id)
            .cloned()
            .collect()
    }

    pub fn audit_at_day(&self, day: i64) -> Vec<AuditEntry> {
        lock(&self.audit)
            .iter()
            .filter(|e| e.day == day)
            .cloned()
            .collect()
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Dump the whole store for checkpointing.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            accounts: self.accounts(),
            investments: self.investments(),
            profit_shares: self.profit_shares(),
            commissions: self.commissions(),
            withdrawals: self.withdrawals(),
            tier_upgrades: self.tier_upgrades(),
            loyalty_entries: self.loyalty_entries(),
            audit: self.audit_log(),
        }
    }

    /// Rebuild a store (including idempotency key sets) from a snapshot.
    pub fn restore(snapshot: LedgerSnapshot) -> Self {
        let ledger = Self::new();
        {
            let mut accounts = lock(&ledger.accounts);
            for account in snapshot.accounts {
                accounts.insert(account.id().to_string(), account);
            }
        }
        {
            let mut investments = lock(&ledger.investments);
            for investment in snapshot.investments {
                investments.insert(investment.id().to_string(), investment);
            }
        }
        {
            let mut table = lock(&ledger.profit_shares);
            for event in snapshot.profit_shares {
                let key = event.idempotency_key();
                table.append(key, event);
            }
        }
        {
            let mut table = lock(&ledger.commissions);
            for event in snapshot.commissions {
                let key = event.idempotency_key();
                table.append(key, event);
            }
        }
        *lock(&ledger.withdrawals) = snapshot.withdrawals;
        *lock(&ledger.tier_upgrades) = snapshot.tier_upgrades;
        *lock(&ledger.loyalty_entries) = snapshot.loyalty_entries;
        *lock(&ledger.audit) = snapshot.audit;
        ledger
    }
}
