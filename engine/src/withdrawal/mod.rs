//! Withdrawal Policy Engine
//!
//! Evaluates withdrawal requests against the investment's tier policy:
//! lock-in eligibility, early-withdrawal penalties, and the partial
//! withdrawal cap over accumulated unpaid profit.
//!
//! Assessment is pure; persistence and the request state machine live on
//! [`crate::models::event::WithdrawalRequest`], driven by the engine
//! facade. Policy failures here become terminal rejected requests with
//! the error's display string as the caller-visible reason.

use crate::core::math::apply_bps;
use crate::core::time::months_elapsed;
use crate::models::event::WithdrawalKind;
use crate::models::investment::Investment;
use crate::models::tier::Tier;
use thiserror::Error;

/// Policy errors; each becomes a rejection reason on the persisted request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WithdrawalError {
    #[error("Lock-in not elapsed: {months_elapsed} of {lock_in_months} months served")]
    LockInNotElapsed {
        months_elapsed: u32,
        lock_in_months: u32,
    },

    #[error("Exceeds partial withdrawal limit: requested {requested}, limit {limit}")]
    ExceedsPartialLimit { requested: i64, limit: i64 },

    #[error("Investment is not active")]
    InvestmentNotActive,

    #[error("Requested amount {requested} exceeds principal {principal}")]
    ExceedsPrincipal { requested: i64, principal: i64 },
}

/// Outcome of a successful policy assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalAssessment {
    /// Penalty withheld (i64 cents)
    pub penalty: i64,
    /// requested − penalty (i64 cents)
    pub net_payout: i64,
}

/// Assess a withdrawal request against tier policy.
///
/// - **Early**: always allowed; penalized at the tier's early-withdrawal
///   rate while the lock-in has not elapsed, penalty-free afterwards.
/// - **Full**: blocked until the lock-in elapses; penalty-free.
/// - **Partial**: capped at the tier's partial-withdrawal limit applied to
///   accumulated unpaid profit; penalty-free.
///
/// # Example
/// ```
/// use compensation_engine_core_rs::models::event::WithdrawalKind;
/// use compensation_engine_core_rs::models::investment::Investment;
/// use compensation_engine_core_rs::models::tier::Tier;
/// use compensation_engine_core_rs::withdrawal::assess;
///
/// let tier = Tier::new("gold", "Gold", 0, 1_200)
///     .with_lock_in_months(12)
///     .with_early_withdrawal_penalty_bps(5_000);
/// let inv = Investment::new("alice", "gold", 100_000, 1_200, 12, 0);
///
/// // Full early withdrawal at month 3: 50% penalty.
/// let assessment = assess(&tier, &inv, WithdrawalKind::Early, 100_000, 90).unwrap();
/// assert_eq!(assessment.penalty, 50_000);
/// assert_eq!(assessment.net_payout, 50_000);
/// ```
pub fn assess(
    tier: &Tier,
    investment: &Investment,
    kind: WithdrawalKind,
    requested: i64,
    as_of_day: i64,
) -> Result<WithdrawalAssessment, WithdrawalError> {
    if !investment.is_active() {
        return Err(WithdrawalError::InvestmentNotActive);
    }

    let served = months_elapsed(investment.start_day(), as_of_day);
    let lock_in = tier.lock_in_months();

    match kind {
        WithdrawalKind::Early => {
            if requested > investment.principal() {
                return Err(WithdrawalError::ExceedsPrincipal {
                    requested,
                    principal: investment.principal(),
                });
            }
            let penalty = if served < lock_in {
                apply_bps(requested, tier.early_withdrawal_penalty_bps())
            } else {
                0
            };
            Ok(WithdrawalAssessment {
                penalty,
                net_payout: requested - penalty,
            })
        }
        WithdrawalKind::Full => {
            if requested > investment.principal() {
                return Err(WithdrawalError::ExceedsPrincipal {
                    requested,
                    principal: investment.principal(),
                });
            }
            if served < lock_in {
                return Err(WithdrawalError::LockInNotElapsed {
                    months_elapsed: served,
                    lock_in_months: lock_in,
                });
            }
            Ok(WithdrawalAssessment {
                penalty: 0,
                net_payout: requested,
            })
        }
        WithdrawalKind::Partial => {
            let limit = apply_bps(investment.unpaid_profit(), tier.partial_withdrawal_limit_bps());
            if requested > limit {
                return Err(WithdrawalError::ExceedsPartialLimit { requested, limit });
            }
            Ok(WithdrawalAssessment {
                penalty: 0,
                net_payout: requested,
            })
        }
    }
}
