//! Tier model
//!
//! A tier bundles the rates and policy limits an account qualifies for
//! based on cumulative confirmed investment:
//! - Fixed annual profit rate (basis points)
//! - Per-level referral commission rates (levels 1..=3, levels 2-3 optional)
//! - Lock-in period and early-withdrawal penalty
//! - Partial-withdrawal limit as a fraction of accumulated unpaid profit
//!
//! Tiers are immutable once referenced by a live investment: a changed rate
//! table is registered as a new tier, never edited in place.

use serde::{Deserialize, Serialize};

/// Maximum referral depth a tier can pay commissions for.
pub const TIER_REFERRAL_LEVELS: usize = 3;

/// A rate/benefit tier.
///
/// Constructed with the required rate fields and refined with builder
/// methods for the optional policy knobs.
///
/// # Example
/// ```
/// use compensation_engine_core_rs::models::tier::Tier;
///
/// let gold = Tier::new("gold", "Gold", 500_000, 1_200)
///     .with_referral_rates([Some(1_000), Some(500), None])
///     .with_lock_in_months(12)
///     .with_early_withdrawal_penalty_bps(5_000);
///
/// assert_eq!(gold.profit_rate_bps(), 1_200);
/// assert_eq!(gold.referral_rate_bps(2), Some(500));
/// assert_eq!(gold.referral_rate_bps(3), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    /// Unique tier identifier
    id: String,

    /// Display name
    name: String,

    /// Tie-break ordering when two tiers share a minimum (higher wins)
    order: u32,

    /// Minimum cumulative investment to qualify (i64 cents)
    minimum_investment: i64,

    /// Fixed annual profit rate (basis points)
    profit_rate_bps: u32,

    /// Referral commission rates per sponsor level, indexed by level - 1.
    /// A `None` level pays nothing and records no commission event.
    referral_rates_bps: [Option<u32>; TIER_REFERRAL_LEVELS],

    /// Months before full withdrawal is unpenalized
    lock_in_months: u32,

    /// Penalty on early withdrawals before lock-in (basis points)
    early_withdrawal_penalty_bps: u32,

    /// Cap on partial withdrawals as a fraction of accumulated unpaid
    /// profit (basis points)
    partial_withdrawal_limit_bps: u32,

    /// Withdrawals on this tier need an administrative approval
    requires_approval: bool,

    /// Archived tiers never win resolution but stay referenced by history
    archived: bool,
}

impl Tier {
    /// Create a tier with the required fields; policy knobs default to
    /// no lock-in, no penalty, no partial cap, no approval gate.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        minimum_investment: i64,
        profit_rate_bps: u32,
    ) -> Self {
        assert!(
            minimum_investment >= 0,
            "minimum_investment must be non-negative"
        );
        Self {
            id: id.into(),
            name: name.into(),
            order: 0,
            minimum_investment,
            profit_rate_bps,
            referral_rates_bps: [None; TIER_REFERRAL_LEVELS],
            lock_in_months: 0,
            early_withdrawal_penalty_bps: 0,
            partial_withdrawal_limit_bps: 0,
            requires_approval: false,
            archived: false,
        }
    }

    /// Set referral rates for levels 1..=3 (builder pattern)
    pub fn with_referral_rates(mut self, rates: [Option<u32>; TIER_REFERRAL_LEVELS]) -> Self {
        self.referral_rates_bps = rates;
        self
    }

    /// Set lock-in period in months (builder pattern)
    pub fn with_lock_in_months(mut self, months: u32) -> Self {
        self.lock_in_months = months;
        self
    }

    /// Set early-withdrawal penalty (builder pattern)
    pub fn with_early_withdrawal_penalty_bps(mut self, bps: u32) -> Self {
        self.early_withdrawal_penalty_bps = bps;
        self
    }

    /// Set partial-withdrawal limit (builder pattern)
    pub fn with_partial_withdrawal_limit_bps(mut self, bps: u32) -> Self {
        self.partial_withdrawal_limit_bps = bps;
        self
    }

    /// Set tie-break order (builder pattern)
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    /// Require administrative approval for withdrawals (builder pattern)
    pub fn with_approval_required(mut self) -> Self {
        self.requires_approval = true;
        self
    }

    /// Mark the tier archived (builder pattern)
    pub fn archived(mut self) -> Self {
        self.archived = true;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn minimum_investment(&self) -> i64 {
        self.minimum_investment
    }

    pub fn profit_rate_bps(&self) -> u32 {
        self.profit_rate_bps
    }

    /// Referral rate for a sponsor level (1-indexed).
    ///
    /// Returns `None` both for levels the tier does not define and for
    /// levels beyond [`TIER_REFERRAL_LEVELS`].
    pub fn referral_rate_bps(&self, level: u8) -> Option<u32> {
        if level == 0 || level as usize > TIER_REFERRAL_LEVELS {
            return None;
        }
        self.referral_rates_bps[level as usize - 1]
    }

    pub fn lock_in_months(&self) -> u32 {
        self.lock_in_months
    }

    pub fn early_withdrawal_penalty_bps(&self) -> u32 {
        self.early_withdrawal_penalty_bps
    }

    pub fn partial_withdrawal_limit_bps(&self) -> u32 {
        self.partial_withdrawal_limit_bps
    }

    pub fn requires_approval(&self) -> bool {
        self.requires_approval
    }

    pub fn is_archived(&self) -> bool {
        self.archived
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referral_rate_levels() {
        let tier = Tier::new("t1", "Basic", 0, 500).with_referral_rates([
            Some(1_000),
            None,
            Some(200),
        ]);

        assert_eq!(tier.referral_rate_bps(1), Some(1_000));
        assert_eq!(tier.referral_rate_bps(2), None);
        assert_eq!(tier.referral_rate_bps(3), Some(200));
        assert_eq!(tier.referral_rate_bps(0), None);
        assert_eq!(tier.referral_rate_bps(4), None);
    }

    #[test]
    fn test_builder_defaults() {
        let tier = Tier::new("t1", "Basic", 10_000, 500);

        assert_eq!(tier.lock_in_months(), 0);
        assert_eq!(tier.early_withdrawal_penalty_bps(), 0);
        assert!(!tier.requires_approval());
        assert!(!tier.is_archived());
    }
}
