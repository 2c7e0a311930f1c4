//! Investment model
//!
//! A fixed-duration investment paying monthly profit shares. The
//! `next_payment_day` field is advanced only by the cycle orchestrator,
//! and only through the compare-and-advance in
//! [`Investment::advance_payment`], which doubles as the per-cycle
//! idempotency check: a retry that observes an already-advanced schedule
//! is a detected no-op, never a second payment.
//!
//! CRITICAL: all money values are i64 (cents)

use crate::core::time::{CycleSchedule, DAYS_PER_MONTH};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Investment lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvestmentStatus {
    /// Accruing profit on schedule
    Active,

    /// Duration exhausted or principal withdrawn after lock-in
    Completed { day: i64 },

    /// Principal withdrawn early
    Cancelled { day: i64 },

    /// Flagged for manual review after a processing failure; excluded
    /// from the due set until resumed
    Suspended { day: i64, reason: String },
}

/// Errors from investment state transitions
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvestmentError {
    #[error("Investment is not active")]
    NotActive,

    #[error("Cycle already processed: expected payment day {expected}, schedule is at {actual}")]
    CycleAlreadyProcessed { expected: i64, actual: i64 },

    #[error("Profit withdrawal {requested} exceeds unpaid profit {unpaid}")]
    ExceedsUnpaidProfit { requested: i64, unpaid: i64 },

    #[error("Investment is not suspended")]
    NotSuspended,
}

/// A fixed-duration investment.
///
/// # Example
/// ```
/// use compensation_engine_core_rs::models::investment::Investment;
///
/// let inv = Investment::new("alice", "gold", 100_000, 1_200, 12, 0);
/// assert!(inv.is_active());
/// assert_eq!(inv.next_payment_day(), 30);
/// assert!(inv.is_due(30));
/// assert!(!inv.is_due(29));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Investment {
    /// Unique investment identifier (UUID)
    id: String,

    /// Owning account
    account_id: String,

    /// Tier at time of creation (immutable; rate table snapshot)
    tier_id: String,

    /// Principal amount (i64 cents)
    principal: i64,

    /// Annual profit rate copied from the tier at creation (basis points)
    annual_rate_bps: u32,

    /// Total duration in scheduling months
    duration_months: u32,

    /// Day the investment started
    start_day: i64,

    /// Next scheduled payment day; advanced only by the orchestrator
    next_payment_day: i64,

    /// Cycles already paid
    cycles_paid: u32,

    /// Total profit credited so far (i64 cents)
    profit_accrued_total: i64,

    /// Profit already paid out through partial withdrawals (i64 cents)
    profit_withdrawn_total: i64,

    /// Current status
    status: InvestmentStatus,
}

impl Investment {
    /// Create a new active investment starting at `start_day`.
    ///
    /// # Panics
    /// Panics if principal <= 0 or duration_months == 0.
    pub fn new(
        account_id: impl Into<String>,
        tier_id: impl Into<String>,
        principal: i64,
        annual_rate_bps: u32,
        duration_months: u32,
        start_day: i64,
    ) -> Self {
        assert!(principal > 0, "principal must be positive");
        assert!(duration_months > 0, "duration_months must be positive");

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.into(),
            tier_id: tier_id.into(),
            principal,
            annual_rate_bps,
            duration_months,
            start_day,
            next_payment_day: start_day + DAYS_PER_MONTH,
            cycles_paid: 0,
            profit_accrued_total: 0,
            profit_withdrawn_total: 0,
            status: InvestmentStatus::Active,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn tier_id(&self) -> &str {
        &self.tier_id
    }

    pub fn principal(&self) -> i64 {
        self.principal
    }

    pub fn annual_rate_bps(&self) -> u32 {
        self.annual_rate_bps
    }

    pub fn duration_months(&self) -> u32 {
        self.duration_months
    }

    pub fn start_day(&self) -> i64 {
        self.start_day
    }

    pub fn next_payment_day(&self) -> i64 {
        self.next_payment_day
    }

    pub fn cycles_paid(&self) -> u32 {
        self.cycles_paid
    }

    pub fn profit_accrued_total(&self) -> i64 {
        self.profit_accrued_total
    }

    pub fn profit_withdrawn_total(&self) -> i64 {
        self.profit_withdrawn_total
    }

    /// Profit credited but not yet paid out through partial withdrawals.
    pub fn unpaid_profit(&self) -> i64 {
        self.profit_accrued_total - self.profit_withdrawn_total
    }

    pub fn status(&self) -> &InvestmentStatus {
        &self.status
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, InvestmentStatus::Active)
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self.status, InvestmentStatus::Suspended { .. })
    }

    /// True when the investment is active and its next payment has come due.
    pub fn is_due(&self, as_of_day: i64) -> bool {
        self.is_active() && self.next_payment_day <= as_of_day
    }

    /// Payment schedule derived from start day and duration.
    pub fn schedule(&self) -> CycleSchedule {
        CycleSchedule::new(self.start_day, self.duration_months)
    }

    /// Credit a cycle's profit and advance the schedule by one month.
    ///
    /// `expected_payment_day` is the payment day the caller computed the
    /// cycle for; if the schedule has already moved past it another run
    /// processed this cycle first, and the call fails with
    /// `CycleAlreadyProcessed` instead of double-crediting.
    pub fn advance_payment(
        &mut self,
        expected_payment_day: i64,
        profit_amount: i64,
    ) -> Result<(), InvestmentError> {
        if !self.is_active() {
            return Err(InvestmentError::NotActive);
        }
        if self.next_payment_day != expected_payment_day {
            return Err(InvestmentError::CycleAlreadyProcessed {
                expected: expected_payment_day,
                actual: self.next_payment_day,
            });
        }
        debug_assert!(profit_amount >= 0, "profit must be non-negative");

        self.profit_accrued_total += profit_amount;
        self.cycles_paid += 1;
        self.next_payment_day += DAYS_PER_MONTH;
        Ok(())
    }

    /// Mark the investment completed (duration exhausted, or full
    /// withdrawal after lock-in). Idempotent on an already-completed
    /// investment.
    pub fn complete(&mut self, day: i64) {
        if matches!(self.status, InvestmentStatus::Completed { .. }) {
            return;
        }
        self.status = InvestmentStatus::Completed { day };
    }

    /// Cancel the investment (early withdrawal of principal).
    pub fn cancel(&mut self, day: i64) -> Result<(), InvestmentError> {
        if !self.is_active() {
            return Err(InvestmentError::NotActive);
        }
        self.status = InvestmentStatus::Cancelled { day };
        Ok(())
    }

    /// Suspend for manual review after a processing failure.
    pub fn suspend(&mut self, day: i64, reason: impl Into<String>) {
        if self.is_active() {
            self.status = InvestmentStatus::Suspended {
                day,
                reason: reason.into(),
            };
        }
    }

    /// Return a suspended investment to the due set.
    pub fn resume(&mut self) -> Result<(), InvestmentError> {
        match self.status {
            InvestmentStatus::Suspended { .. } => {
                self.status = InvestmentStatus::Active;
                Ok(())
            }
            _ => Err(InvestmentError::NotSuspended),
        }
    }

    /// Record a partial withdrawal of accrued profit.
    pub fn record_profit_withdrawal(&mut self, amount: i64) -> Result<(), InvestmentError> {
        let unpaid = self.unpaid_profit();
        if amount > unpaid {
            return Err(InvestmentError::ExceedsUnpaidProfit {
                requested: amount,
                unpaid,
            });
        }
        self.profit_withdrawn_total += amount;
        Ok(())
    }
}
