//! Compensation Engine - cycle orchestrator and operation facade
//!
//! Drives the recurring compensation cycle across all active investments
//! and exposes the operations the surrounding platform calls:
//!
//! ```text
//! For each due (investment, payment day):
//! 1. Compute and persist the profit-share event (keyed, idempotent)
//! 2. Distribute referral commissions up the sponsor chain
//! 3. Re-evaluate the investor's tier
//! 4. Advance next_payment_day by one cycle
//! 5. Complete the investment once its duration is exhausted
//! ```
//!
//! Steps 1-4 are individually idempotent and run under a per-investment
//! advisory lock, so a crash between steps (or a concurrent second run)
//! replays as a no-op instead of double-posting. A failure in any step
//! suspends that one investment for manual review and the batch moves on.
//!
//! # Determinism
//!
//! A run reads one settings snapshot and one referral-graph snapshot at
//! the start, and walks due investments in (payment day, id) order; the
//! same ledger state and `as_of_day` always produce the same event set.

use crate::collab::{ApproveAllKyc, KycProvider, NotificationSink, NullGateway, NullNotifier, PayoutGateway};
use crate::commission::{self, CommissionBasis};
use crate::config::{GlobalSettings, SettingsSnapshot};
use crate::error::EngineError;
use crate::ledger::InMemoryLedger;
use crate::loyalty::{points_for_amount, LoyaltyBalance, LoyaltyEngine};
use crate::models::account::Account;
use crate::models::event::{
    LoyaltySource, ProfitShareEvent, WithdrawalKind, WithdrawalRequest,
};
use crate::models::investment::Investment;
use crate::models::tier::Tier;
use crate::profit;
use crate::referral::ReferralGraph;
use crate::tier::{TierError, TierRegistry};
use crate::withdrawal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ============================================================================
// Configuration Types
// ============================================================================

/// Engine configuration: the tier table and the mutable platform settings.
///
/// Accounts and investments are registered through the engine API after
/// construction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Platform-wide settings; snapshotted per cycle run
    pub settings: GlobalSettings,

    /// Initial tier table (at least one tier)
    pub tiers: Vec<Tier>,
}

/// Result of one cycle run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Day the run was executed for
    pub as_of_day: i64,

    /// Investments that had at least one cycle posted
    pub processed: usize,

    /// Investments suspended for manual review this run
    pub failed: usize,

    /// Investments skipped (no longer due, or claimed by a concurrent run)
    pub skipped: usize,

    /// Hash of the settings snapshot the run executed under
    pub settings_hash: String,
}

/// Outcome of processing one investment in a run.
enum ProcessOutcome {
    /// At least one cycle was posted
    Processed,
    /// Nothing due (already processed, or schedule raced ahead)
    Skipped,
}

// ============================================================================
// Engine
// ============================================================================

/// The compensation engine facade.
///
/// Owns the ledger store, the tier registry, the settings, and the
/// collaborator seams. Cycle runs and all exposed operations go through
/// this type.
pub struct CompensationEngine {
    ledger: Arc<InMemoryLedger>,
    tiers: TierRegistry,
    settings: GlobalSettings,
    kyc: Box<dyn KycProvider>,
    gateway: Box<dyn PayoutGateway>,
    notifier: Box<dyn NotificationSink>,
}

impl CompensationEngine {
    /// Create an engine from configuration with no-op collaborators.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        if config.tiers.is_empty() {
            return Err(EngineError::Validation(
                "at least one tier must be configured".to_string(),
            ));
        }

        let mut tiers = TierRegistry::new();
        for tier in config.tiers {
            tiers.register(tier)?;
        }

        Ok(Self {
            ledger: Arc::new(InMemoryLedger::new()),
            tiers,
            settings: config.settings,
            kyc: Box::new(ApproveAllKyc),
            gateway: Box::new(NullGateway),
            notifier: Box::new(NullNotifier),
        })
    }

    /// Wire the platform collaborators (builder pattern).
    pub fn with_collaborators(
        mut self,
        kyc: Box<dyn KycProvider>,
        gateway: Box<dyn PayoutGateway>,
        notifier: Box<dyn NotificationSink>,
    ) -> Self {
        self.kyc = kyc;
        self.gateway = gateway;
        self.notifier = notifier;
        self
    }

    /// Shared handle to the ledger store.
    pub fn ledger(&self) -> Arc<InMemoryLedger> {
        Arc::clone(&self.ledger)
    }

    pub fn settings(&self) -> &GlobalSettings {
        &self.settings
    }

    /// Replace the platform settings. Takes effect from the next cycle
    /// run; a run in progress keeps its snapshot.
    pub fn update_settings(&mut self, settings: GlobalSettings) {
        self.settings = settings;
    }

    pub fn tier_registry(&self) -> &TierRegistry {
        &self.tiers
    }

    /// Register an additional tier (new tier versions are appended, never
    /// edited in place).
    pub fn register_tier(&mut self, tier: Tier) -> Result<(), EngineError> {
        self.tiers.register(tier)?;
        Ok(())
    }

    /// Loyalty engine over this engine's ledger and current settings.
    pub fn loyalty(&self) -> LoyaltyEngine {
        LoyaltyEngine::new(Arc::clone(&self.ledger), self.settings.clone())
    }

    pub(crate) fn restore_parts(
        ledger: InMemoryLedger,
        tiers: TierRegistry,
        settings: GlobalSettings,
    ) -> Self {
        Self {
            ledger: Arc::new(ledger),
            tiers,
            settings,
            kyc: Box::new(ApproveAllKyc),
            gateway: Box::new(NullGateway),
            notifier: Box::new(NullNotifier),
        }
    }

    // ========================================================================
    // Account and investment registration
    // ========================================================================

    /// Register an account, optionally under a sponsor.
    ///
    /// Acyclicity of the referral tree is enforced here, at link-creation
    /// time, never on the commission hot path.
    pub fn register_account(
        &self,
        account_id: &str,
        sponsor_id: Option<&str>,
        day: i64,
    ) -> Result<Account, EngineError> {
        if account_id.is_empty() {
            return Err(EngineError::Validation("account id must not be empty".to_string()));
        }
        if self.ledger.account_exists(account_id) {
            return Err(EngineError::Validation(format!(
                "Duplicate account ID: {account_id}"
            )));
        }
        if let Some(sponsor) = sponsor_id {
            let graph = ReferralGraph::snapshot(&self.ledger);
            graph.validate_new_link(account_id, sponsor)?;
        }

        let tier = self
            .tiers
            .default_tier()
            .ok_or_else(|| EngineError::Validation("no active tiers configured".to_string()))?;

        let account = Account::new(account_id, sponsor_id.map(str::to_string), tier.id());
        self.ledger.insert_account(account.clone())?;
        self.ledger.audit(
            day,
            "AccountRegistered",
            account_id,
            match sponsor_id {
                Some(sponsor) => format!("sponsor {sponsor}"),
                None => "root account".to_string(),
            },
        );
        Ok(account)
    }

    /// Open an investment for an account.
    ///
    /// The investment's tier is resolved from the principal (so the
    /// tier-minimum invariant holds by construction); accounts below every
    /// minimum fall back to the entry tier. The account's own tier pointer
    /// is re-evaluated against its new cumulative total.
    pub fn open_investment(
        &self,
        account_id: &str,
        principal: i64,
        duration_months: u32,
        day: i64,
    ) -> Result<Investment, EngineError> {
        if principal <= 0 {
            return Err(EngineError::Validation("principal must be positive".to_string()));
        }
        if duration_months == 0 {
            return Err(EngineError::Validation(
                "duration must be at least one month".to_string(),
            ));
        }
        if !self.ledger.account_exists(account_id) {
            return Err(EngineError::NotFound(format!("account {account_id}")));
        }
        if !self.kyc.can_invest(account_id) {
            return Err(EngineError::NotEligible(account_id.to_string()));
        }

        let tier = match self.tiers.resolve(principal) {
            Ok(tier) => tier,
            Err(TierError::NoTierAvailable { .. }) => self
                .tiers
                .default_tier()
                .ok_or_else(|| EngineError::Validation("no active tiers configured".to_string()))?,
            Err(e) => return Err(e.into()),
        };

        let investment = Investment::new(
            account_id,
            tier.id(),
            principal,
            tier.profit_rate_bps(),
            duration_months,
            day,
        );
        self.ledger.insert_investment(investment.clone())?;

        self.ledger.update_account(account_id, |account| {
            account.record_investment(principal);
            Ok(())
        })?;
        self.tiers
            .evaluate_upgrade(&self.ledger, account_id, "investment", day)?;

        self.ledger.audit(
            day,
            "InvestmentOpened",
            investment.id(),
            format!("{account_id}: {principal} for {duration_months} months"),
        );
        self.notifier
            .notify(account_id, "Your investment has been activated");
        Ok(investment)
    }

    // ========================================================================
    // Cycle runs
    // ========================================================================

    /// Run the compensation cycle for every due investment.
    pub fn run_cycle(&self, as_of_day: i64) -> Result<CycleReport, EngineError> {
        self.run_cycle_halting(as_of_day, &AtomicBool::new(false))
    }

    /// Run the compensation cycle, checking `halt` between investments.
    ///
    /// A halted run stops cleanly at an investment boundary: everything
    /// committed so far stays committed, and a later run picks up the
    /// remainder through the idempotency keys.
    pub fn run_cycle_halting(
        &self,
        as_of_day: i64,
        halt: &AtomicBool,
    ) -> Result<CycleReport, EngineError> {
        let snapshot = SettingsSnapshot::capture(&self.settings)?;
        let graph = ReferralGraph::snapshot(&self.ledger);
        let due = self.ledger.due_investments(as_of_day);

        log::info!(
            "cycle run as of day {as_of_day}: {} due investments (settings {})",
            due.len(),
            snapshot.hash()
        );

        let mut report = CycleReport {
            as_of_day,
            processed: 0,
            failed: 0,
            skipped: 0,
            settings_hash: snapshot.hash().to_string(),
        };

        for investment_id in due {
            if halt.load(Ordering::SeqCst) {
                log::warn!("cycle run halted before investment {investment_id}");
                break;
            }

            // A concurrent run already holds this investment: its cycles
            // will be posted exactly once there, so this run moves on.
            if !self.ledger.try_begin_processing(&investment_id) {
                report.skipped += 1;
                continue;
            }
            let outcome = self.process_due_investment(
                &investment_id,
                as_of_day,
                &graph,
                snapshot.settings(),
            );
            self.ledger.finish_processing(&investment_id);

            match outcome {
                Ok(ProcessOutcome::Processed) => report.processed += 1,
                Ok(ProcessOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    let reason = e.to_string();
                    log::error!("investment {investment_id} failed: {reason}");
                    // Isolated failure domain: suspend this investment for
                    // manual review, keep the batch going.
                    let suspended = self.ledger.update_investment(&investment_id, |inv| {
                        inv.suspend(as_of_day, reason.clone());
                        Ok(())
                    });
                    if suspended.is_ok() {
                        self.ledger.audit(
                            as_of_day,
                            "InvestmentSuspended",
                            investment_id.as_str(),
                            reason,
                        );
                    }
                    report.failed += 1;
                }
            }
        }

        log::info!(
            "cycle run complete: {} processed, {} failed, {} skipped",
            report.processed,
            report.failed,
            report.skipped
        );
        Ok(report)
    }

    /// Post every cycle an investment owes up to `as_of_day`.
    ///
    /// Each iteration handles one (investment, payment day) unit of work;
    /// every step inside is idempotent under that key, so a crash-retry
    /// resumes exactly where the previous attempt stopped.
    fn process_due_investment(
        &self,
        investment_id: &str,
        as_of_day: i64,
        graph: &ReferralGraph,
        settings: &GlobalSettings,
    ) -> Result<ProcessOutcome, EngineError> {
        let mut did_work = false;

        loop {
            let investment = self.ledger.get_investment(investment_id)?;
            if !investment.is_due(as_of_day) {
                break;
            }
            let cycle_day = investment.next_payment_day();
            let amount = profit::cycle_profit_for(&investment);

            // Step 1: persist the profit share. A false return means a
            // previous attempt already recorded this cycle; the remaining
            // steps re-run idempotently to finish the unit of work.
            let event = ProfitShareEvent::new(
                investment_id,
                investment.account_id(),
                amount,
                investment.annual_rate_bps(),
                cycle_day,
            );
            if self.ledger.append_profit_share(event.clone()) {
                self.ledger.audit(
                    cycle_day,
                    "ProfitShare",
                    event.id(),
                    format!("{} to {}", amount, investment.account_id()),
                );
                self.gateway.dispatch_profit_share(&event);
                self.notifier.notify(
                    investment.account_id(),
                    "A profit share has been credited to your investment",
                );
            }

            // Step 2: fan commissions up the sponsor chain.
            let base_amount = match settings.commission_basis {
                CommissionBasis::Profit => amount,
                CommissionBasis::Principal => investment.principal(),
            };
            let commissions = commission::distribute(
                &self.ledger,
                graph,
                &self.tiers,
                investment.account_id(),
                investment_id,
                cycle_day,
                base_amount,
            )?;
            for commission_event in &commissions {
                self.gateway.dispatch_commission(commission_event);
                self.notifier.notify(
                    commission_event.referrer_id(),
                    "A referral commission is on its way",
                );
            }

            // Step 3: lazy tier re-evaluation (no-op unless a threshold
            // was crossed since the last look).
            self.tiers
                .evaluate_upgrade(&self.ledger, investment.account_id(), "cycle", as_of_day)?;

            // Step 4: advance the schedule; step 5: complete on exhaustion.
            self.ledger.update_investment(investment_id, |inv| {
                inv.advance_payment(cycle_day, amount)
                    .map_err(EngineError::from)?;
                if inv.schedule().is_exhausted(inv.cycles_paid()) {
                    inv.complete(as_of_day);
                }
                Ok(())
            })?;

            did_work = true;
        }

        Ok(if did_work {
            ProcessOutcome::Processed
        } else {
            ProcessOutcome::Skipped
        })
    }

    /// Return a suspended investment to the due set after manual review.
    pub fn resume_investment(&self, investment_id: &str, day: i64) -> Result<(), EngineError> {
        self.ledger.update_investment(investment_id, |inv| {
            inv.resume().map_err(EngineError::from)
        })?;
        self.ledger
            .audit(day, "InvestmentResumed", investment_id, "manual review cleared");
        Ok(())
    }

    // ========================================================================
    // Payout confirmation (gateway callbacks)
    // ========================================================================

    /// Gateway callback: a profit-share payout settled. Awards the
    /// investor's loyalty points for the confirmed amount.
    pub fn confirm_profit_payout(&self, event_id: &str, day: i64) -> Result<(), EngineError> {
        let event = self.ledger.update_profit_share(event_id, |e| {
            e.mark_processed(day).map_err(EngineError::from)?;
            Ok(e.clone())
        })?;
        self.ledger
            .audit(day, "ProfitPayoutConfirmed", event_id, event.amount().to_string());

        let points = points_for_amount(event.amount(), self.settings.profit_payout_points_per_unit);
        self.loyalty()
            .award(event.account_id(), points, LoyaltySource::ProfitPayout, day)?;
        Ok(())
    }

    /// Gateway callback: a profit-share payout failed. The event stays
    /// retryable and is never silently dropped.
    pub fn fail_profit_payout(
        &self,
        event_id: &str,
        reason: &str,
        day: i64,
    ) -> Result<(), EngineError> {
        self.ledger.update_profit_share(event_id, |e| {
            e.mark_failed(day, reason).map_err(EngineError::from)
        })?;
        self.ledger.audit(day, "ProfitPayoutFailed", event_id, reason);
        Ok(())
    }

    /// Gateway callback: a commission settled to the referrer. Awards the
    /// referrer's loyalty points.
    pub fn confirm_commission_paid(&self, event_id: &str, day: i64) -> Result<(), EngineError> {
        let event = self.ledger.update_commission(event_id, |e| {
            e.mark_paid(day).map_err(EngineError::from)?;
            Ok(e.clone())
        })?;
        self.ledger
            .audit(day, "CommissionPaid", event_id, event.amount().to_string());

        let points =
            points_for_amount(event.amount(), self.settings.commission_payout_points_per_unit);
        self.loyalty().award(
            event.referrer_id(),
            points,
            LoyaltySource::CommissionPayout,
            day,
        )?;
        Ok(())
    }

    /// Cancel a pending commission (referrer disqualified at settlement
    /// time). Terminal; never retried.
    pub fn cancel_commission(
        &self,
        event_id: &str,
        reason: &str,
        day: i64,
    ) -> Result<(), EngineError> {
        self.ledger.update_commission(event_id, |e| {
            e.mark_cancelled(day, reason).map_err(EngineError::from)
        })?;
        self.ledger.audit(day, "CommissionCancelled", event_id, reason);
        Ok(())
    }

    // ========================================================================
    // Withdrawals
    // ========================================================================

    /// File a withdrawal request.
    ///
    /// Validation failures (non-positive amount, unknown investment, wrong
    /// owner) return an error with nothing persisted. Policy failures
    /// (lock-in, partial limit, ineligible account) persist the request in
    /// a terminal `Rejected` state carrying the reason, and return it.
    pub fn request_withdrawal(
        &self,
        investment_id: &str,
        account_id: &str,
        kind: WithdrawalKind,
        amount: i64,
        day: i64,
    ) -> Result<WithdrawalRequest, EngineError> {
        if amount <= 0 {
            return Err(EngineError::Validation(
                "requested amount must be positive".to_string(),
            ));
        }
        let investment = self.ledger.get_investment(investment_id)?;
        if investment.account_id() != account_id {
            return Err(EngineError::Validation(format!(
                "investment {investment_id} does not belong to account {account_id}"
            )));
        }
        let tier = self.tiers.get(investment.tier_id())?;

        if !self.kyc.can_withdraw(account_id) {
            return Ok(self.persist_rejected(
                investment_id,
                account_id,
                kind,
                amount,
                "Account is not eligible to withdraw",
                day,
            ));
        }

        match withdrawal::assess(tier, &investment, kind, amount, day) {
            Ok(assessment) => {
                let request = WithdrawalRequest::new(
                    investment_id,
                    account_id,
                    kind,
                    amount,
                    assessment.penalty,
                    tier.requires_approval(),
                    day,
                );
                self.ledger.insert_withdrawal(request.clone());
                self.ledger.audit(
                    day,
                    "WithdrawalRequested",
                    request.id(),
                    format!("{account_id}: {amount} (penalty {})", assessment.penalty),
                );
                self.notifier
                    .notify(account_id, "Your withdrawal request has been received");
                Ok(request)
            }
            Err(policy) => Ok(self.persist_rejected(
                investment_id,
                account_id,
                kind,
                amount,
                &policy.to_string(),
                day,
            )),
        }
    }

    fn persist_rejected(
        &self,
        investment_id: &str,
        account_id: &str,
        kind: WithdrawalKind,
        amount: i64,
        reason: &str,
        day: i64,
    ) -> WithdrawalRequest {
        let request =
            WithdrawalRequest::new_rejected(investment_id, account_id, kind, amount, reason, day);
        self.ledger.insert_withdrawal(request.clone());
        self.ledger
            .audit(day, "WithdrawalRejected", request.id(), reason);
        request
    }

    /// Approve a pending request (administrative decision for tiers that
    /// require one, system approval otherwise).
    pub fn approve_withdrawal(
        &self,
        request_id: &str,
        approver: &str,
        day: i64,
    ) -> Result<WithdrawalRequest, EngineError> {
        let request = self.ledger.update_withdrawal(request_id, |r| {
            r.approve(approver, day).map_err(EngineError::from)?;
            Ok(r.clone())
        })?;
        self.ledger
            .audit(day, "WithdrawalApproved", request_id, approver);
        Ok(request)
    }

    /// Reject a pending request with a caller-visible reason (terminal).
    pub fn reject_withdrawal(
        &self,
        request_id: &str,
        reason: &str,
        day: i64,
    ) -> Result<WithdrawalRequest, EngineError> {
        let request = self.ledger.update_withdrawal(request_id, |r| {
            r.reject(reason, day).map_err(EngineError::from)?;
            Ok(r.clone())
        })?;
        self.ledger.audit(day, "WithdrawalRejected", request_id, reason);
        Ok(request)
    }

    /// Process an approved request: dispatch the payout and apply the
    /// principal/profit effect to the investment.
    ///
    /// The status transition is the at-most-once gate; a concurrent or
    /// repeated call fails with `AlreadyProcessed` before any effect.
    pub fn process_withdrawal(
        &self,
        request_id: &str,
        day: i64,
    ) -> Result<WithdrawalRequest, EngineError> {
        let request = self.ledger.update_withdrawal(request_id, |r| {
            r.process(day).map_err(EngineError::from)?;
            Ok(r.clone())
        })?;

        match request.kind() {
            WithdrawalKind::Early => {
                self.ledger.update_investment(request.investment_id(), |inv| {
                    inv.cancel(day).map_err(EngineError::from)
                })?;
            }
            WithdrawalKind::Full => {
                self.ledger.update_investment(request.investment_id(), |inv| {
                    inv.complete(day);
                    Ok(())
                })?;
            }
            WithdrawalKind::Partial => {
                self.ledger.update_investment(request.investment_id(), |inv| {
                    inv.record_profit_withdrawal(request.requested())
                        .map_err(EngineError::from)
                })?;
            }
        }

        self.gateway.dispatch_withdrawal(&request);
        self.ledger.audit(
            day,
            "WithdrawalProcessed",
            request_id,
            format!("net payout {}", request.net_payout()),
        );
        self.notifier
            .notify(request.account_id(), "Your withdrawal has been processed");
        Ok(request)
    }

    // ========================================================================
    // Loyalty and tiers
    // ========================================================================

    /// Current loyalty balance summary for an account.
    pub fn loyalty_balance(&self, account_id: &str) -> Result<LoyaltyBalance, EngineError> {
        self.loyalty().balance(account_id)
    }

    /// Manually award loyalty points.
    pub fn award_loyalty(&self, account_id: &str, points: i64, day: i64) -> Result<(), EngineError> {
        if points <= 0 {
            return Err(EngineError::Validation("points must be positive".to_string()));
        }
        self.loyalty()
            .award(account_id, points, LoyaltySource::ManualAward, day)
    }

    /// Withdraw loyalty points against the capped balance.
    pub fn withdraw_loyalty(
        &self,
        account_id: &str,
        points: i64,
        day: i64,
    ) -> Result<(), EngineError> {
        self.loyalty().withdraw(account_id, points, day)
    }

    /// The tier an account currently sits on.
    pub fn resolve_tier(&self, account_id: &str) -> Result<Tier, EngineError> {
        let account = self.ledger.get_account(account_id)?;
        Ok(self.tiers.get(account.tier_id())?.clone())
    }
}
