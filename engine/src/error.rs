//! Engine-wide error taxonomy
//!
//! - **Validation**: bad input, rejected synchronously, nothing persisted
//! - **Policy** (lock-in, partial limit, loyalty blocks/balance): the
//!   request is persisted in a terminal rejected state with a reason
//! - **Conflict**: optimistic-concurrency or duplicate-cycle detection;
//!   retried with a fresh read up to a bounded attempt count first
//! - **Integrity** (referral cycle, missing tier): aborts processing for
//!   the one affected investment, never the batch

use crate::models::account::LoyaltyError;
use crate::models::event::EventError;
use crate::models::investment::InvestmentError;
use crate::referral::ReferralError;
use crate::tier::TierError;
use crate::withdrawal::WithdrawalError;
use thiserror::Error;

/// Top-level error type returned by the engine facade.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Bad input; nothing was persisted
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Concurrent-update conflict that survived bounded retries
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The KYC collaborator declined the operation
    #[error("Account {0} is not eligible for this operation")]
    NotEligible(String),

    #[error(transparent)]
    Tier(#[from] TierError),

    #[error(transparent)]
    Referral(#[from] ReferralError),

    #[error(transparent)]
    Loyalty(#[from] LoyaltyError),

    #[error(transparent)]
    Withdrawal(#[from] WithdrawalError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    Investment(#[from] InvestmentError),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}
