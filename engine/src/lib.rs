//! Investment Compensation Engine - Core
//!
//! Deterministic, auditable computation of how profit flows from an
//! investment into the investor's own profit share, multi-level referral
//! commissions, tier-based benefits, loyalty-point accrual, and
//! early/partial withdrawal penalties.
//!
//! # Architecture
//!
//! - **core**: schedule arithmetic and money math
//! - **models**: domain types (Tier, Account, Investment, event types)
//! - **ledger**: append-only event tables with idempotency keys
//! - **tier**: tier resolution and lazy upgrades
//! - **referral**: read-only sponsor-tree view for commission fan-out
//! - **profit**: per-cycle profit-share calculation
//! - **commission**: multi-level commission distribution
//! - **withdrawal**: lock-in, penalty, and partial-limit policy
//! - **loyalty**: point accrual with a capped withdrawable fraction
//! - **orchestrator**: the cycle runner and operation facade
//! - **collab**: seams to the platform (KYC, payouts, notifications)
//!
//! # Critical Invariants
//!
//! 1. All money values are i64 (cents); all rates are basis points
//! 2. Every unit of work carries an idempotency key; retries are no-ops
//! 3. Account balance updates are atomic read-modify-writes
//! 4. Events are append-only: one status transition, never deleted

// Module declarations
pub mod collab;
pub mod commission;
pub mod config;
pub mod core;
pub mod error;
pub mod ledger;
pub mod loyalty;
pub mod models;
pub mod orchestrator;
pub mod profit;
pub mod referral;
pub mod tier;
pub mod withdrawal;

// Re-exports for convenience
pub use collab::{ApproveAllKyc, KycProvider, NotificationSink, NullGateway, NullNotifier, PayoutGateway};
pub use commission::{CommissionBasis, MAX_COMMISSION_LEVELS};
pub use config::{GlobalSettings, SettingsSnapshot};
pub use error::EngineError;
pub use ledger::{AuditEntry, InMemoryLedger, LedgerSnapshot};
pub use loyalty::{LoyaltyBalance, LoyaltyEngine};
pub use models::{
    account::{Account, LoyaltyError},
    event::{
        ApprovalStatus, CommissionStatus, EventError, LoyaltyLedgerEntry, LoyaltySource,
        ProfitShareEvent, ProfitShareStatus, ReferralCommissionEvent, TierUpgradeEvent,
        WithdrawalKind, WithdrawalRequest, WithdrawalStatus,
    },
    investment::{Investment, InvestmentError, InvestmentStatus},
    tier::Tier,
};
pub use orchestrator::{CompensationEngine, CycleReport, EngineConfig, EngineSnapshot};
pub use referral::{ReferralError, ReferralGraph, MAX_REFERRAL_DEPTH};
pub use tier::{TierError, TierRegistry};
pub use withdrawal::{WithdrawalAssessment, WithdrawalError};
