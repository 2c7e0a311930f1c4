//! Commission Distributor
//!
//! Walks the referral graph upward from an investing account and posts
//! level-scaled commissions, at most [`MAX_COMMISSION_LEVELS`] hops deep.
//!
//! At each hop the rate comes from the **referring account's own tier**
//! (not the investor's). A level the referring tier defines no rate for is
//! skipped without recording an event, but the walk continues upward. Each
//! recorded hop is one `Pending` [`ReferralCommissionEvent`], deduplicated
//! by the (referrer, source investment, cycle, level) key, so re-running
//! distribution for a cycle never double-posts.
//!
//! Whether commissions are based on the cycle's profit or the investment
//! principal is a per-deployment choice ([`CommissionBasis`]); the engine
//! defaults to profit.

use crate::core::math::apply_bps;
use crate::error::EngineError;
use crate::ledger::InMemoryLedger;
use crate::models::event::ReferralCommissionEvent;
use crate::referral::ReferralGraph;
use crate::tier::TierRegistry;
use serde::{Deserialize, Serialize};

/// Maximum sponsor-chain depth commissions fan out to.
pub const MAX_COMMISSION_LEVELS: u8 = 3;

/// What the commission percentage applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommissionBasis {
    /// Percentage of the cycle's profit share
    #[default]
    Profit,
    /// Percentage of the investment principal
    Principal,
}

/// Distribute commissions for one cycle of one investment.
///
/// `base_amount` is the cycle's profit share or the principal, per the
/// deployment's [`CommissionBasis`]. Returns the events actually appended
/// this call (hops already recorded for the cycle are skipped silently).
///
/// Fails only on data-integrity problems (a referrer pointing at a tier
/// the registry does not know); the caller treats that as fatal for the
/// one source investment.
pub fn distribute(
    ledger: &InMemoryLedger,
    graph: &ReferralGraph,
    tiers: &TierRegistry,
    investor_id: &str,
    investment_id: &str,
    cycle_day: i64,
    base_amount: i64,
) -> Result<Vec<ReferralCommissionEvent>, EngineError> {
    let mut created = Vec::new();
    let chain = graph.ancestor_chain(investor_id, MAX_COMMISSION_LEVELS as usize);

    for (depth, referrer_id) in chain.iter().enumerate() {
        let level = depth as u8 + 1;
        let referrer = ledger.get_account(referrer_id)?;
        let tier = tiers.get(referrer.tier_id())?;

        // No rate defined at this level for the referrer's tier: skip the
        // hop, keep walking.
        let Some(rate_bps) = tier.referral_rate_bps(level) else {
            continue;
        };

        let amount = apply_bps(base_amount, rate_bps);
        let event = ReferralCommissionEvent::new(
            referrer_id.clone(),
            investor_id,
            investment_id,
            amount,
            rate_bps,
            level,
            cycle_day,
        );

        if ledger.append_commission(event.clone()) {
            ledger.audit(
                cycle_day,
                "CommissionPosted",
                event.id(),
                format!("level {level} to {referrer_id}: {amount}"),
            );
            created.push(event);
        }
    }

    Ok(created)
}
