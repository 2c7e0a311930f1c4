//! Withdrawal Policy Engine Tests
//!
//! Covers the early-withdrawal penalty scenario, lock-in enforcement,
//! the partial-withdrawal cap over unpaid profit, the approval gate, and
//! at-most-once processing.

use compensation_engine_core_rs::{
    ApprovalStatus, CompensationEngine, EngineConfig, EngineError, GlobalSettings,
    InvestmentStatus, Tier, WithdrawalKind, WithdrawalStatus,
};

// ============================================================================
// Test Helpers
// ============================================================================

/// Tier with a 12-month lock-in, 50% early penalty, and a 50% partial cap.
fn locked_tier() -> Tier {
    Tier::new("locked", "Locked", 0, 6_000)
        .with_lock_in_months(12)
        .with_early_withdrawal_penalty_bps(5_000)
        .with_partial_withdrawal_limit_bps(5_000)
}

fn engine_with(tier: Tier) -> CompensationEngine {
    let engine = CompensationEngine::new(EngineConfig {
        settings: GlobalSettings::default(),
        tiers: vec![tier],
    })
    .unwrap();
    engine.register_account("alice", None, 0).unwrap();
    engine
}

// ============================================================================
// Early withdrawal
// ============================================================================

#[test]
fn test_early_withdrawal_at_month_three_scenario() {
    // Investment of $1,000.00; full early withdrawal at month 3 under a
    // 12-month lock-in with 50% penalty: penalty $500.00, net $500.00,
    // status pending -> approved -> processed.
    let engine = engine_with(locked_tier());
    let investment = engine.open_investment("alice", 100_000, 24, 0).unwrap();

    let request = engine
        .request_withdrawal(investment.id(), "alice", WithdrawalKind::Early, 100_000, 90)
        .unwrap();

    assert_eq!(request.penalty(), 50_000);
    assert_eq!(request.net_payout(), 50_000);
    assert_eq!(request.status(), &WithdrawalStatus::Pending);

    let approved = engine.approve_withdrawal(request.id(), "system", 91).unwrap();
    assert!(matches!(approved.status(), WithdrawalStatus::Approved { .. }));

    let processed = engine.process_withdrawal(request.id(), 92).unwrap();
    assert!(matches!(processed.status(), WithdrawalStatus::Processed { .. }));

    // Early principal withdrawal cancels the investment.
    let stored = engine.ledger().get_investment(investment.id()).unwrap();
    assert!(matches!(stored.status(), InvestmentStatus::Cancelled { .. }));
}

#[test]
fn test_early_withdrawal_after_lock_in_has_no_penalty() {
    let engine = engine_with(locked_tier());
    let investment = engine.open_investment("alice", 100_000, 24, 0).unwrap();

    let request = engine
        .request_withdrawal(investment.id(), "alice", WithdrawalKind::Early, 100_000, 360)
        .unwrap();

    assert_eq!(request.penalty(), 0);
    assert_eq!(request.net_payout(), 100_000);
}

// ============================================================================
// Lock-in and partial cap
// ============================================================================

#[test]
fn test_full_withdrawal_rejected_before_lock_in() {
    let engine = engine_with(locked_tier());
    let investment = engine.open_investment("alice", 100_000, 24, 0).unwrap();

    let request = engine
        .request_withdrawal(investment.id(), "alice", WithdrawalKind::Full, 100_000, 90)
        .unwrap();

    // Persisted terminal rejection carrying the policy reason.
    assert!(request.is_terminal());
    let reason = request.rejection_reason().unwrap();
    assert!(reason.contains("Lock-in not elapsed"), "reason: {reason}");
}

#[test]
fn test_partial_withdrawal_capped_at_unpaid_profit_share() {
    let engine = engine_with(locked_tier());
    let investment = engine.open_investment("alice", 100_000, 24, 0).unwrap();

    // One cycle accrues $50.00 of profit; the 50% cap allows $25.00.
    engine.run_cycle(30).unwrap();

    let over = engine
        .request_withdrawal(investment.id(), "alice", WithdrawalKind::Partial, 2_501, 40)
        .unwrap();
    assert!(over.is_terminal());
    assert!(over
        .rejection_reason()
        .unwrap()
        .contains("Exceeds partial withdrawal limit"));

    let within = engine
        .request_withdrawal(investment.id(), "alice", WithdrawalKind::Partial, 2_500, 40)
        .unwrap();
    assert_eq!(within.status(), &WithdrawalStatus::Pending);

    engine.approve_withdrawal(within.id(), "system", 40).unwrap();
    engine.process_withdrawal(within.id(), 41).unwrap();

    let stored = engine.ledger().get_investment(investment.id()).unwrap();
    assert_eq!(stored.profit_withdrawn_total(), 2_500);
    assert_eq!(stored.unpaid_profit(), 2_500);
}

// ============================================================================
// Validation vs policy failures
// ============================================================================

#[test]
fn test_non_positive_amount_persists_nothing() {
    let engine = engine_with(locked_tier());
    let investment = engine.open_investment("alice", 100_000, 24, 0).unwrap();

    let err = engine
        .request_withdrawal(investment.id(), "alice", WithdrawalKind::Early, 0, 90)
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert!(engine.ledger().withdrawals().is_empty());
}

#[test]
fn test_unknown_investment_persists_nothing() {
    let engine = engine_with(locked_tier());

    let err = engine
        .request_withdrawal("ghost", "alice", WithdrawalKind::Early, 1_000, 90)
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
    assert!(engine.ledger().withdrawals().is_empty());
}

#[test]
fn test_foreign_investment_persists_nothing() {
    let engine = engine_with(locked_tier());
    engine.register_account("bob", None, 0).unwrap();
    let investment = engine.open_investment("alice", 100_000, 24, 0).unwrap();

    let err = engine
        .request_withdrawal(investment.id(), "bob", WithdrawalKind::Early, 1_000, 90)
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

// ============================================================================
// Approval gate and terminal states
// ============================================================================

#[test]
fn test_approval_required_tier_blocks_processing() {
    let engine = engine_with(locked_tier().with_approval_required());
    let investment = engine.open_investment("alice", 100_000, 24, 0).unwrap();

    let request = engine
        .request_withdrawal(investment.id(), "alice", WithdrawalKind::Early, 50_000, 90)
        .unwrap();
    assert_eq!(request.approval(), &ApprovalStatus::AwaitingApproval);

    // Processing cannot run ahead of the administrative decision.
    let err = engine.process_withdrawal(request.id(), 91).unwrap_err();
    assert!(matches!(err, EngineError::Event(_)));

    engine
        .approve_withdrawal(request.id(), "ops-admin", 92)
        .unwrap();
    let processed = engine.process_withdrawal(request.id(), 93).unwrap();
    assert!(matches!(
        processed.approval(),
        ApprovalStatus::Approved { approver } if approver == "ops-admin"
    ));
}

#[test]
fn test_terminal_request_rejects_all_transitions() {
    let engine = engine_with(locked_tier());
    let investment = engine.open_investment("alice", 100_000, 24, 0).unwrap();

    let request = engine
        .request_withdrawal(investment.id(), "alice", WithdrawalKind::Early, 50_000, 90)
        .unwrap();
    engine.approve_withdrawal(request.id(), "system", 90).unwrap();
    engine.process_withdrawal(request.id(), 91).unwrap();

    // At-most-once payout: every further transition fails.
    assert!(engine.process_withdrawal(request.id(), 92).is_err());
    assert!(engine.approve_withdrawal(request.id(), "system", 92).is_err());
    assert!(engine.reject_withdrawal(request.id(), "late", 92).is_err());
}

#[test]
fn test_rejected_request_cannot_be_processed() {
    let engine = engine_with(locked_tier());
    let investment = engine.open_investment("alice", 100_000, 24, 0).unwrap();

    let request = engine
        .request_withdrawal(investment.id(), "alice", WithdrawalKind::Early, 50_000, 90)
        .unwrap();
    engine
        .reject_withdrawal(request.id(), "operator veto", 91)
        .unwrap();

    assert!(engine.approve_withdrawal(request.id(), "system", 92).is_err());
    assert!(engine.process_withdrawal(request.id(), 92).is_err());
}
