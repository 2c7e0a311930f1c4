//! Tier Resolver
//!
//! Maps an account's cumulative confirmed investment onto the highest
//! qualifying tier, and performs lazy tier upgrades: whenever cumulative
//! investment crosses a new threshold, a [`TierUpgradeEvent`] is recorded
//! and the account's tier pointer advances. Re-evaluating an
//! already-upgraded account is a no-op.
//!
//! The registry is append-only. A tier referenced by a live investment is
//! never edited; rate changes register a new tier and archive the old one.

use crate::error::EngineError;
use crate::ledger::InMemoryLedger;
use crate::models::event::TierUpgradeEvent;
use crate::models::tier::Tier;
use thiserror::Error;

/// Errors from tier resolution
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TierError {
    /// Cumulative investment is below every active tier's minimum.
    /// Callers treat this as "stay on the default tier", not a hard error.
    #[error("No tier available for cumulative investment {cumulative_invested}")]
    NoTierAvailable { cumulative_invested: i64 },

    #[error("Tier not found: {0}")]
    TierNotFound(String),

    #[error("Duplicate tier ID: {0}")]
    DuplicateTier(String),
}

/// Append-only collection of tiers.
#[derive(Debug, Clone, Default)]
pub struct TierRegistry {
    tiers: Vec<Tier>,
}

impl TierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tier. IDs are unique across active and archived tiers.
    pub fn register(&mut self, tier: Tier) -> Result<(), TierError> {
        if self.tiers.iter().any(|t| t.id() == tier.id()) {
            return Err(TierError::DuplicateTier(tier.id().to_string()));
        }
        self.tiers.push(tier);
        Ok(())
    }

    /// Look up any tier (active or archived) by id. Archived tiers stay
    /// resolvable because historical investments reference them.
    pub fn get(&self, id: &str) -> Result<&Tier, TierError> {
        self.tiers
            .iter()
            .find(|t| t.id() == id)
            .ok_or_else(|| TierError::TierNotFound(id.to_string()))
    }

    /// The highest active tier whose minimum is covered by `cumulative`,
    /// breaking minimum ties by `order` descending.
    pub fn resolve(&self, cumulative: i64) -> Result<&Tier, TierError> {
        self.tiers
            .iter()
            .filter(|t| !t.is_archived() && t.minimum_investment() <= cumulative)
            .max_by_key(|t| (t.minimum_investment(), t.order()))
            .ok_or(TierError::NoTierAvailable {
                cumulative_invested: cumulative,
            })
    }

    /// The entry tier for fresh accounts: the active tier with the lowest
    /// minimum (ties broken by `order` descending).
    pub fn default_tier(&self) -> Option<&Tier> {
        self.tiers
            .iter()
            .filter(|t| !t.is_archived())
            .min_by_key(|t| (t.minimum_investment(), std::cmp::Reverse(t.order())))
    }

    pub fn all(&self) -> &[Tier] {
        &self.tiers
    }

    /// Re-evaluate an account's tier against its cumulative investment.
    ///
    /// Records a [`TierUpgradeEvent`] and repoints the account when the
    /// resolved tier differs from the current one. Idempotent: an account
    /// already on its resolved tier is left untouched and no event is
    /// recorded. Accounts below every tier minimum keep their current
    /// (default) tier.
    pub fn evaluate_upgrade(
        &self,
        ledger: &InMemoryLedger,
        account_id: &str,
        reason: &str,
        day: i64,
    ) -> Result<Option<TierUpgradeEvent>, EngineError> {
        let account = ledger.get_account(account_id)?;

        let resolved = match self.resolve(account.cumulative_invested()) {
            Ok(tier) => tier,
            // Below the lowest minimum: stay on the current tier.
            Err(TierError::NoTierAvailable { .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if resolved.id() == account.tier_id() {
            return Ok(None);
        }

        let event = TierUpgradeEvent {
            account_id: account_id.to_string(),
            from_tier: account.tier_id().to_string(),
            to_tier: resolved.id().to_string(),
            total_invested: account.cumulative_invested(),
            reason: reason.to_string(),
            processed_day: day,
        };

        let to_tier = resolved.id().to_string();
        ledger.update_account(account_id, |acct| {
            acct.set_tier(to_tier.clone());
            Ok(())
        })?;
        ledger.append_tier_upgrade(event.clone());
        ledger.audit(
            day,
            "TierUpgrade",
            account_id,
            format!("{} -> {}", event.from_tier, event.to_tier),
        );

        Ok(Some(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::Account;

    fn registry() -> TierRegistry {
        let mut registry = TierRegistry::new();
        registry
            .register(Tier::new("basic", "Basic", 0, 500))
            .unwrap();
        registry
            .register(Tier::new("silver", "Silver", 100_000, 800))
            .unwrap();
        registry
            .register(Tier::new("gold", "Gold", 500_000, 1_200))
            .unwrap();
        registry
    }

    #[test]
    fn test_resolve_picks_highest_qualifying() {
        let registry = registry();

        assert_eq!(registry.resolve(0).unwrap().id(), "basic");
        assert_eq!(registry.resolve(99_999).unwrap().id(), "basic");
        assert_eq!(registry.resolve(100_000).unwrap().id(), "silver");
        assert_eq!(registry.resolve(2_000_000).unwrap().id(), "gold");
    }

    #[test]
    fn test_resolve_no_tier_available() {
        let mut registry = TierRegistry::new();
        registry
            .register(Tier::new("vip", "VIP", 1_000_000, 1_500))
            .unwrap();

        assert_eq!(
            registry.resolve(500).unwrap_err(),
            TierError::NoTierAvailable {
                cumulative_invested: 500
            }
        );
    }

    #[test]
    fn test_resolve_tie_break_by_order() {
        let mut registry = registry();
        registry
            .register(Tier::new("gold-v2", "Gold v2", 500_000, 1_300).with_order(1))
            .unwrap();

        // Equal minimums: higher order wins.
        assert_eq!(registry.resolve(500_000).unwrap().id(), "gold-v2");
    }

    #[test]
    fn test_archived_tier_stays_resolvable_by_id() {
        let mut registry = TierRegistry::new();
        registry
            .register(Tier::new("old", "Old", 0, 700).archived())
            .unwrap();

        assert!(registry.resolve(10_000).is_err());
        assert_eq!(registry.get("old").unwrap().id(), "old");
    }

    #[test]
    fn test_evaluate_upgrade_is_idempotent() {
        let registry = registry();
        let ledger = InMemoryLedger::new();
        ledger
            .insert_account(Account::new("alice", None, "basic"))
            .unwrap();
        ledger
            .update_account("alice", |a| {
                a.record_investment(150_000);
                Ok(())
            })
            .unwrap();

        let upgrade = registry
            .evaluate_upgrade(&ledger, "alice", "investment", 10)
            .unwrap();
        assert!(upgrade.is_some());
        assert_eq!(ledger.get_account("alice").unwrap().tier_id(), "silver");

        // Second evaluation: no-op, no second event.
        let again = registry
            .evaluate_upgrade(&ledger, "alice", "investment", 11)
            .unwrap();
        assert!(again.is_none());
        assert_eq!(ledger.tier_upgrades().len(), 1);
    }

    #[test]
    fn test_below_minimum_keeps_current_tier() {
        let mut registry = TierRegistry::new();
        registry
            .register(Tier::new("vip", "VIP", 1_000_000, 1_500))
            .unwrap();
        let ledger = InMemoryLedger::new();
        ledger
            .insert_account(Account::new("bob", None, "vip"))
            .unwrap();

        let upgrade = registry.evaluate_upgrade(&ledger, "bob", "cycle", 5).unwrap();
        assert!(upgrade.is_none());
    }
}
