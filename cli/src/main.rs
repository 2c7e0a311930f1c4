//! Compensation engine scenario runner
//!
//! Loads a JSON scenario (tiers, accounts, investments), runs the
//! compensation cycle month by month, and prints per-cycle reports plus
//! final balances. Payout confirmations are simulated inline so loyalty
//! accrual is visible in the output.

use compensation_engine_core_rs::{
    CompensationEngine, EngineConfig, GlobalSettings, Tier,
};
use serde::Deserialize;
use std::process::ExitCode;

#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(default)]
    settings: Option<GlobalSettings>,
    tiers: Vec<TierSpec>,
    accounts: Vec<AccountSpec>,
    investments: Vec<InvestmentSpec>,
    /// Number of monthly cycles to simulate
    months: u32,
}

#[derive(Debug, Deserialize)]
struct TierSpec {
    id: String,
    name: String,
    minimum_investment: i64,
    profit_rate_bps: u32,
    #[serde(default)]
    referral_rates_bps: [Option<u32>; 3],
    #[serde(default)]
    lock_in_months: u32,
    #[serde(default)]
    early_withdrawal_penalty_bps: u32,
    #[serde(default)]
    partial_withdrawal_limit_bps: u32,
    #[serde(default)]
    order: u32,
}

#[derive(Debug, Deserialize)]
struct AccountSpec {
    id: String,
    #[serde(default)]
    sponsor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InvestmentSpec {
    account: String,
    principal: i64,
    duration_months: u32,
}

fn build_tier(spec: &TierSpec) -> Tier {
    Tier::new(
        spec.id.clone(),
        spec.name.clone(),
        spec.minimum_investment,
        spec.profit_rate_bps,
    )
    .with_referral_rates(spec.referral_rates_bps)
    .with_lock_in_months(spec.lock_in_months)
    .with_early_withdrawal_penalty_bps(spec.early_withdrawal_penalty_bps)
    .with_partial_withdrawal_limit_bps(spec.partial_withdrawal_limit_bps)
    .with_order(spec.order)
}

fn run(path: &str) -> Result<(), String> {
    let raw = std::fs::read_to_string(path).map_err(|e| format!("cannot read {path}: {e}"))?;
    let scenario: Scenario =
        serde_json::from_str(&raw).map_err(|e| format!("invalid scenario: {e}"))?;

    let engine = CompensationEngine::new(EngineConfig {
        settings: scenario.settings.unwrap_or_default(),
        tiers: scenario.tiers.iter().map(build_tier).collect(),
    })
    .map_err(|e| e.to_string())?;

    for account in &scenario.accounts {
        engine
            .register_account(&account.id, account.sponsor.as_deref(), 0)
            .map_err(|e| format!("account {}: {e}", account.id))?;
    }
    for spec in &scenario.investments {
        engine
            .open_investment(&spec.account, spec.principal, spec.duration_months, 0)
            .map_err(|e| format!("investment for {}: {e}", spec.account))?;
    }
    log::info!(
        "scenario loaded: {} accounts, {} investments",
        scenario.accounts.len(),
        scenario.investments.len()
    );

    for month in 1..=scenario.months {
        let as_of_day = month as i64 * 30;
        let report = engine.run_cycle(as_of_day).map_err(|e| e.to_string())?;
        println!(
            "month {month:>3}: processed {:>4}  failed {:>3}  skipped {:>3}",
            report.processed, report.failed, report.skipped
        );

        // Simulate the payout gateway confirming everything immediately.
        let ledger = engine.ledger();
        for event in ledger.pending_profit_shares() {
            engine
                .confirm_profit_payout(event.id(), as_of_day)
                .map_err(|e| e.to_string())?;
        }
        for event in ledger.pending_commissions() {
            engine
                .confirm_commission_paid(event.id(), as_of_day)
                .map_err(|e| e.to_string())?;
        }
    }

    println!("\naccount summary:");
    let ledger = engine.ledger();
    for account in ledger.accounts() {
        let balance = engine
            .loyalty_balance(account.id())
            .map_err(|e| e.to_string())?;
        println!(
            "  {:<16} tier {:<10} invested {:>12}  loyalty {:>8} ({} available)",
            account.id(),
            account.tier_id(),
            account.cumulative_invested(),
            balance.awarded,
            balance.available
        );
    }

    let profit_total: i64 = ledger.profit_shares().iter().map(|e| e.amount()).sum();
    let commission_total: i64 = ledger.commissions().iter().map(|e| e.amount()).sum();
    println!("\ntotal profit shares:  {profit_total}");
    println!("total commissions:    {commission_total}");
    println!("audit entries:        {}", ledger.audit_log().len());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: compensation-engine <scenario.json>");
        return ExitCode::from(2);
    };

    match run(&path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}
