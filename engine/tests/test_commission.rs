//! Commission Distributor Tests
//!
//! Covers the worked referral scenario (A refers B refers C), fan-out
//! bounds, per-referrer tier rates, and settlement transitions.

use compensation_engine_core_rs::{
    CommissionStatus, CompensationEngine, EngineConfig, GlobalSettings, Tier,
};

// ============================================================================
// Test Helpers
// ============================================================================

/// One tier for everyone: 60% annual profit (=> $50.00/month on $1,000.00),
/// level-1 commissions at 10%, level-2 at 5%, no level-3 rate.
fn chain_engine() -> CompensationEngine {
    let engine = CompensationEngine::new(EngineConfig {
        settings: GlobalSettings::default(),
        tiers: vec![Tier::new("basic", "Basic", 0, 6_000).with_referral_rates([
            Some(1_000),
            Some(500),
            None,
        ])],
    })
    .unwrap();

    engine.register_account("a", None, 0).unwrap();
    engine.register_account("b", Some("a"), 0).unwrap();
    engine.register_account("c", Some("b"), 0).unwrap();
    engine
}

// ============================================================================
// Fan-out
// ============================================================================

#[test]
fn test_referral_chain_scenario() {
    let engine = chain_engine();
    engine.open_investment("c", 100_000, 12, 0).unwrap();

    engine.run_cycle(30).unwrap();

    // Profit share: $50.00 to C.
    let profits = engine.ledger().profit_shares();
    assert_eq!(profits.len(), 1);
    assert_eq!(profits[0].amount(), 5_000);

    // Commissions: B gets $5.00 at level 1, A gets $2.50 at level 2,
    // nothing further (no level-3 rate, no level-4 sponsor).
    let commissions = engine.ledger().commissions();
    assert_eq!(commissions.len(), 2);

    let level1 = commissions.iter().find(|e| e.level() == 1).unwrap();
    assert_eq!(level1.referrer_id(), "b");
    assert_eq!(level1.amount(), 500);
    assert!(level1.is_pending());

    let level2 = commissions.iter().find(|e| e.level() == 2).unwrap();
    assert_eq!(level2.referrer_id(), "a");
    assert_eq!(level2.amount(), 250);
}

#[test]
fn test_commissions_only_go_to_ancestors() {
    let engine = chain_engine();
    // An unrelated account must never receive a commission from C's chain.
    engine.register_account("stranger", None, 0).unwrap();
    engine.open_investment("c", 100_000, 12, 0).unwrap();

    engine.run_cycle(30).unwrap();

    let chain = ["b", "a"];
    for event in engine.ledger().commissions() {
        assert!(chain.contains(&event.referrer_id()));
        assert!(event.level() >= 1 && event.level() <= 3);
    }
}

#[test]
fn test_root_account_generates_no_commissions() {
    let engine = chain_engine();
    engine.open_investment("a", 100_000, 12, 0).unwrap();

    engine.run_cycle(30).unwrap();

    assert!(engine.ledger().commissions().is_empty());
}

#[test]
fn test_rates_come_from_referrer_tier_not_investor_tier() {
    let engine = CompensationEngine::new(EngineConfig {
        settings: GlobalSettings::default(),
        tiers: vec![
            // Entry tier: generous level-1 rate.
            Tier::new("basic", "Basic", 0, 6_000).with_referral_rates([Some(1_000), None, None]),
            // Sponsor's tier: a different rate table.
            Tier::new("vip", "VIP", 1_000_000, 6_000)
                .with_referral_rates([Some(2_000), None, None]),
        ],
    })
    .unwrap();
    engine.register_account("sponsor", None, 0).unwrap();
    engine.register_account("investor", Some("sponsor"), 0).unwrap();

    // Push the sponsor onto the VIP tier.
    engine.open_investment("sponsor", 1_000_000, 12, 0).unwrap();
    assert_eq!(engine.resolve_tier("sponsor").unwrap().id(), "vip");

    // The investor stays on basic; the sponsor's 20% VIP rate applies.
    engine.open_investment("investor", 100_000, 12, 0).unwrap();
    engine.run_cycle(30).unwrap();

    let commission = engine
        .ledger()
        .commissions()
        .into_iter()
        .find(|e| e.investor_id() == "investor")
        .unwrap();
    assert_eq!(commission.rate_bps(), 2_000);
    assert_eq!(commission.amount(), 1_000); // 20% of $50.00
}

// ============================================================================
// Settlement
// ============================================================================

#[test]
fn test_settlement_marks_paid_and_cancel_is_terminal() {
    let engine = chain_engine();
    engine.open_investment("c", 100_000, 12, 0).unwrap();
    engine.run_cycle(30).unwrap();

    let commissions = engine.ledger().commissions();
    let level1 = commissions.iter().find(|e| e.level() == 1).unwrap();
    let level2 = commissions.iter().find(|e| e.level() == 2).unwrap();

    engine.confirm_commission_paid(level1.id(), 31).unwrap();
    engine
        .cancel_commission(level2.id(), "referrer suspended", 31)
        .unwrap();

    let after = engine.ledger().commissions();
    assert!(matches!(
        after.iter().find(|e| e.id() == level1.id()).unwrap().status(),
        CommissionStatus::Paid { day: 31 }
    ));

    // Cancelled is terminal: neither payment nor re-cancellation succeeds.
    assert!(engine.confirm_commission_paid(level2.id(), 32).is_err());
    assert!(engine.cancel_commission(level2.id(), "again", 32).is_err());
}

#[test]
fn test_paid_commission_awards_referrer_loyalty() {
    let engine = chain_engine();
    engine.open_investment("c", 100_000, 12, 0).unwrap();
    engine.run_cycle(30).unwrap();

    let level1 = engine
        .ledger()
        .commissions()
        .into_iter()
        .find(|e| e.level() == 1)
        .unwrap();
    engine.confirm_commission_paid(level1.id(), 31).unwrap();

    // $5.00 settled at 1 point per whole unit => 5 points.
    let balance = engine.loyalty_balance("b").unwrap();
    assert_eq!(balance.awarded, 5);
}
