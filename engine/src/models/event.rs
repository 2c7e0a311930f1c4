//! Compensation event types
//!
//! Every monetary effect the engine produces is recorded as one of these
//! append-only events. Events are immutable after creation except for a
//! single status transition, recorded with the day it happened; nothing is
//! ever deleted, superseding events are appended instead.
//!
//! # Event Types
//!
//! - **ProfitShareEvent**: one per (investment, cycle), the investor's own
//!   profit for the cycle
//! - **ReferralCommissionEvent**: one per sponsor-chain hop per cycle
//! - **WithdrawalRequest**: principal/profit withdrawal with approval and
//!   processing state machines
//! - **TierUpgradeEvent**: a lazy tier-pointer advance
//! - **LoyaltyLedgerEntry**: loyalty point award or withdrawal delta
//!
//! CRITICAL: all money values are i64 (cents)

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from event status transitions
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    /// The event has already reached a terminal status; enforces
    /// at-most-once payout.
    #[error("Already processed: {0}")]
    AlreadyProcessed(String),

    /// Processing was attempted while an administrative approval is
    /// still outstanding.
    #[error("Approval pending for request {0}")]
    ApprovalPending(String),

    /// Processing was attempted on a request that was never approved.
    #[error("Request {0} is not approved")]
    NotApproved(String),
}

// ============================================================================
// Profit shares
// ============================================================================

/// Lifecycle of a profit-share payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfitShareStatus {
    /// Dispatched to the payout sink, confirmation outstanding
    Pending,
    /// Payout confirmed
    Processed { day: i64 },
    /// Payout failed; retried by a later reconciliation pass
    Failed { day: i64, reason: String },
}

/// The investor's own profit for one cycle of one investment.
///
/// Created exactly once per (investment, payment day); the ledger store
/// enforces the idempotency key on append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitShareEvent {
    id: String,
    investment_id: String,
    account_id: String,
    /// Payout amount (i64 cents)
    amount: i64,
    /// Annual rate the amount was computed from (basis points)
    rate_bps: u32,
    /// Payment day this cycle fell due on; half of the idempotency key
    cycle_day: i64,
    status: ProfitShareStatus,
}

impl ProfitShareEvent {
    pub fn new(
        investment_id: impl Into<String>,
        account_id: impl Into<String>,
        amount: i64,
        rate_bps: u32,
        cycle_day: i64,
    ) -> Self {
        assert!(amount >= 0, "amount must be non-negative");
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            investment_id: investment_id.into(),
            account_id: account_id.into(),
            amount,
            rate_bps,
            cycle_day,
            status: ProfitShareStatus::Pending,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn investment_id(&self) -> &str {
        &self.investment_id
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn rate_bps(&self) -> u32 {
        self.rate_bps
    }

    pub fn cycle_day(&self) -> i64 {
        self.cycle_day
    }

    pub fn status(&self) -> &ProfitShareStatus {
        &self.status
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, ProfitShareStatus::Pending)
    }

    /// Idempotency key: (investment, payment day).
    pub fn idempotency_key(&self) -> String {
        profit_share_key(&self.investment_id, self.cycle_day)
    }

    /// Confirm the payout.
    pub fn mark_processed(&mut self, day: i64) -> Result<(), EventError> {
        match self.status {
            ProfitShareStatus::Pending | ProfitShareStatus::Failed { .. } => {
                self.status = ProfitShareStatus::Processed { day };
                Ok(())
            }
            ProfitShareStatus::Processed { .. } => {
                Err(EventError::AlreadyProcessed(self.id.clone()))
            }
        }
    }

    /// Record a failed payout attempt; the event stays retryable.
    pub fn mark_failed(&mut self, day: i64, reason: impl Into<String>) -> Result<(), EventError> {
        match self.status {
            ProfitShareStatus::Pending | ProfitShareStatus::Failed { .. } => {
                self.status = ProfitShareStatus::Failed {
                    day,
                    reason: reason.into(),
                };
                Ok(())
            }
            ProfitShareStatus::Processed { .. } => {
                Err(EventError::AlreadyProcessed(self.id.clone()))
            }
        }
    }
}

/// Idempotency key for a profit share before the event exists.
pub fn profit_share_key(investment_id: &str, cycle_day: i64) -> String {
    format!("{investment_id}:{cycle_day}")
}

// ============================================================================
// Referral commissions
// ============================================================================

/// Lifecycle of a referral commission payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommissionStatus {
    /// Awaiting settlement
    Pending,
    /// Settled to the referrer
    Paid { day: i64 },
    /// Terminal: referrer disqualified at settlement time; never retried
    Cancelled { day: i64, reason: String },
}

/// One commission hop up the sponsor chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralCommissionEvent {
    id: String,
    /// Account receiving the commission
    referrer_id: String,
    /// Account whose investment generated it
    investor_id: String,
    /// Source investment
    investment_id: String,
    /// Commission amount (i64 cents)
    amount: i64,
    /// Level rate from the referrer's own tier (basis points)
    rate_bps: u32,
    /// Depth in the sponsor chain (1 = direct sponsor)
    level: u8,
    /// Payment day of the cycle that generated the commission
    cycle_day: i64,
    status: CommissionStatus,
}

impl ReferralCommissionEvent {
    pub fn new(
        referrer_id: impl Into<String>,
        investor_id: impl Into<String>,
        investment_id: impl Into<String>,
        amount: i64,
        rate_bps: u32,
        level: u8,
        cycle_day: i64,
    ) -> Self {
        assert!(amount >= 0, "amount must be non-negative");
        assert!((1..=3).contains(&level), "level must be 1..=3");
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            referrer_id: referrer_id.into(),
            investor_id: investor_id.into(),
            investment_id: investment_id.into(),
            amount,
            rate_bps,
            level,
            cycle_day,
            status: CommissionStatus::Pending,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn referrer_id(&self) -> &str {
        &self.referrer_id
    }

    pub fn investor_id(&self) -> &str {
        &self.investor_id
    }

    pub fn investment_id(&self) -> &str {
        &self.investment_id
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn rate_bps(&self) -> u32 {
        self.rate_bps
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn cycle_day(&self) -> i64 {
        self.cycle_day
    }

    pub fn status(&self) -> &CommissionStatus {
        &self.status
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, CommissionStatus::Pending)
    }

    /// Idempotency key: (referrer, source investment, cycle, level).
    pub fn idempotency_key(&self) -> String {
        commission_key(
            &self.referrer_id,
            &self.investment_id,
            self.cycle_day,
            self.level,
        )
    }

    /// Settle the commission to the referrer.
    pub fn mark_paid(&mut self, day: i64) -> Result<(), EventError> {
        match self.status {
            CommissionStatus::Pending => {
                self.status = CommissionStatus::Paid { day };
                Ok(())
            }
            _ => Err(EventError::AlreadyProcessed(self.id.clone())),
        }
    }

    /// Cancel the commission (terminal).
    pub fn mark_cancelled(&mut self, day: i64, reason: impl Into<String>) -> Result<(), EventError> {
        match self.status {
            CommissionStatus::Pending => {
                self.status = CommissionStatus::Cancelled {
                    day,
                    reason: reason.into(),
                };
                Ok(())
            }
            _ => Err(EventError::AlreadyProcessed(self.id.clone())),
        }
    }
}

/// Idempotency key for a commission hop before the event exists.
pub fn commission_key(referrer_id: &str, investment_id: &str, cycle_day: i64, level: u8) -> String {
    format!("{referrer_id}:{investment_id}:{cycle_day}:{level}")
}

// ============================================================================
// Withdrawal requests
// ============================================================================

/// Kind of withdrawal requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawalKind {
    /// Principal before lock-in; always allowed, penalized
    Early,
    /// Principal after lock-in
    Full,
    /// A slice of accumulated unpaid profit
    Partial,
}

/// Processing status of a withdrawal request.
///
/// `pending → {approved, rejected}`; `approved → processed`.
/// `rejected` and `processed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawalStatus {
    Pending,
    Approved { day: i64 },
    Rejected { day: i64, reason: String },
    Processed { day: i64 },
}

/// Administrative approval, tracked separately from processing status for
/// tiers configured to require a human decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStatus {
    /// Tier does not gate withdrawals on approval
    NotRequired,
    /// Waiting for an administrative decision
    AwaitingApproval,
    /// Approved by an administrator
    Approved { approver: String },
}

/// A withdrawal request with its computed penalty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    id: String,
    investment_id: String,
    account_id: String,
    kind: WithdrawalKind,
    /// Requested amount (i64 cents)
    requested: i64,
    /// Penalty withheld from the payout (i64 cents)
    penalty: i64,
    /// requested − penalty (i64 cents)
    net_payout: i64,
    status: WithdrawalStatus,
    approval: ApprovalStatus,
    created_day: i64,
}

impl WithdrawalRequest {
    pub fn new(
        investment_id: impl Into<String>,
        account_id: impl Into<String>,
        kind: WithdrawalKind,
        requested: i64,
        penalty: i64,
        requires_approval: bool,
        created_day: i64,
    ) -> Self {
        assert!(requested > 0, "requested must be positive");
        assert!(
            (0..=requested).contains(&penalty),
            "penalty must be within requested amount"
        );
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            investment_id: investment_id.into(),
            account_id: account_id.into(),
            kind,
            requested,
            penalty,
            net_payout: requested - penalty,
            status: WithdrawalStatus::Pending,
            approval: if requires_approval {
                ApprovalStatus::AwaitingApproval
            } else {
                ApprovalStatus::NotRequired
            },
            created_day,
        }
    }

    /// Construct a request directly in the `Rejected` state, recording why
    /// a policy check turned it down.
    pub fn new_rejected(
        investment_id: impl Into<String>,
        account_id: impl Into<String>,
        kind: WithdrawalKind,
        requested: i64,
        reason: impl Into<String>,
        day: i64,
    ) -> Self {
        let mut request = Self::new(investment_id, account_id, kind, requested, 0, false, day);
        request.status = WithdrawalStatus::Rejected {
            day,
            reason: reason.into(),
        };
        request
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn investment_id(&self) -> &str {
        &self.investment_id
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn kind(&self) -> WithdrawalKind {
        self.kind
    }

    pub fn requested(&self) -> i64 {
        self.requested
    }

    pub fn penalty(&self) -> i64 {
        self.penalty
    }

    pub fn net_payout(&self) -> i64 {
        self.net_payout
    }

    pub fn status(&self) -> &WithdrawalStatus {
        &self.status
    }

    pub fn approval(&self) -> &ApprovalStatus {
        &self.approval
    }

    pub fn created_day(&self) -> i64 {
        self.created_day
    }

    /// Rejection reason, if the request was rejected.
    pub fn rejection_reason(&self) -> Option<&str> {
        match &self.status {
            WithdrawalStatus::Rejected { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            WithdrawalStatus::Rejected { .. } | WithdrawalStatus::Processed { .. }
        )
    }

    /// Approve the request. For tiers requiring approval this records the
    /// administrative decision; otherwise it is the system approval step.
    pub fn approve(&mut self, approver: impl Into<String>, day: i64) -> Result<(), EventError> {
        match self.status {
            WithdrawalStatus::Pending => {
                if matches!(self.approval, ApprovalStatus::AwaitingApproval) {
                    self.approval = ApprovalStatus::Approved {
                        approver: approver.into(),
                    };
                }
                self.status = WithdrawalStatus::Approved { day };
                Ok(())
            }
            _ => Err(EventError::AlreadyProcessed(self.id.clone())),
        }
    }

    /// Reject the request with a caller-visible reason (terminal).
    pub fn reject(&mut self, reason: impl Into<String>, day: i64) -> Result<(), EventError> {
        match self.status {
            WithdrawalStatus::Pending | WithdrawalStatus::Approved { .. } => {
                self.status = WithdrawalStatus::Rejected {
                    day,
                    reason: reason.into(),
                };
                Ok(())
            }
            _ => Err(EventError::AlreadyProcessed(self.id.clone())),
        }
    }

    /// Mark the request processed (terminal). Requires prior approval;
    /// fails with `ApprovalPending` while an administrative decision is
    /// still outstanding.
    pub fn process(&mut self, day: i64) -> Result<(), EventError> {
        if matches!(self.approval, ApprovalStatus::AwaitingApproval) {
            return Err(EventError::ApprovalPending(self.id.clone()));
        }
        match self.status {
            WithdrawalStatus::Approved { .. } => {
                self.status = WithdrawalStatus::Processed { day };
                Ok(())
            }
            WithdrawalStatus::Pending => Err(EventError::NotApproved(self.id.clone())),
            _ => Err(EventError::AlreadyProcessed(self.id.clone())),
        }
    }
}

// ============================================================================
// Tier upgrades and loyalty deltas
// ============================================================================

/// A lazily computed tier-pointer advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierUpgradeEvent {
    pub account_id: String,
    pub from_tier: String,
    pub to_tier: String,
    /// Cumulative investment at upgrade time (i64 cents)
    pub total_invested: i64,
    pub reason: String,
    pub processed_day: i64,
}

/// What earned (or spent) the loyalty points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoyaltySource {
    ProfitPayout,
    CommissionPayout,
    ManualAward,
    Withdrawal,
}

/// One loyalty point delta; positive for awards, negative for withdrawals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltyLedgerEntry {
    pub id: String,
    pub account_id: String,
    pub delta: i64,
    pub source: LoyaltySource,
    pub day: i64,
}

impl LoyaltyLedgerEntry {
    pub fn new(account_id: impl Into<String>, delta: i64, source: LoyaltySource, day: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.into(),
            delta,
            source,
            day,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profit_share_processed_is_terminal() {
        let mut event = ProfitShareEvent::new("inv", "alice", 5_000, 500, 30);
        event.mark_processed(31).unwrap();

        assert!(event.mark_processed(32).is_err());
        assert!(event.mark_failed(32, "late").is_err());
    }

    #[test]
    fn test_profit_share_failed_is_retryable() {
        let mut event = ProfitShareEvent::new("inv", "alice", 5_000, 500, 30);
        event.mark_failed(31, "gateway down").unwrap();
        event.mark_processed(32).unwrap();
        assert_eq!(event.status(), &ProfitShareStatus::Processed { day: 32 });
    }

    #[test]
    fn test_commission_cancel_is_terminal() {
        let mut event = ReferralCommissionEvent::new("b", "c", "inv", 500, 1_000, 1, 30);
        event.mark_cancelled(31, "referrer suspended").unwrap();

        assert!(event.mark_paid(32).is_err());
    }

    #[test]
    fn test_withdrawal_state_machine() {
        let mut request = WithdrawalRequest::new("inv", "alice", WithdrawalKind::Early, 100_000, 50_000, false, 90);
        assert_eq!(request.net_payout(), 50_000);

        request.approve("system", 90).unwrap();
        request.process(91).unwrap();

        // Terminal: every further transition is rejected.
        assert!(request.approve("system", 92).is_err());
        assert!(request.reject("late", 92).is_err());
        assert!(request.process(92).is_err());
    }

    #[test]
    fn test_withdrawal_process_requires_approval_decision() {
        let mut request =
            WithdrawalRequest::new("inv", "alice", WithdrawalKind::Full, 100_000, 0, true, 400);

        // Status approval without the administrative decision is impossible:
        // approve() records both at once. Simulate a direct process attempt.
        let err = request.process(401).unwrap_err();
        assert_eq!(err, EventError::ApprovalPending(request.id().to_string()));

        request.approve("ops-admin", 401).unwrap();
        request.process(402).unwrap();
        assert!(matches!(
            request.approval(),
            ApprovalStatus::Approved { approver } if approver == "ops-admin"
        ));
    }

    #[test]
    fn test_withdrawal_process_unapproved_fails() {
        let mut request =
            WithdrawalRequest::new("inv", "alice", WithdrawalKind::Partial, 1_000, 0, false, 10);

        let err = request.process(11).unwrap_err();
        assert_eq!(err, EventError::NotApproved(request.id().to_string()));
    }

    #[test]
    fn test_idempotency_keys() {
        let event = ReferralCommissionEvent::new("b", "c", "inv-1", 500, 1_000, 2, 60);
        assert_eq!(event.idempotency_key(), "b:inv-1:60:2");

        let profit = ProfitShareEvent::new("inv-1", "c", 5_000, 500, 60);
        assert_eq!(profit.idempotency_key(), "inv-1:60");
    }
}
