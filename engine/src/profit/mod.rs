//! Profit-Share Calculator
//!
//! Computes the investor's own profit for one monthly cycle:
//! `principal × annual_rate × 1/12`, in cents with round-half-up.
//!
//! Amounts are paid on a cumulative-rounding schedule: cycle k pays
//! `round(expected through k+1) − round(expected through k)`, so the sum
//! over the full duration lands exactly on the rounded expected total.
//! Rounding drift can therefore never accumulate: the running total
//! stays within one cent of the pro-rata expectation at every cycle, and
//! the final cycle settles whatever fraction the earlier roundings left
//! over.
//!
//! Pure functions of their inputs; no hidden state.

use crate::core::math::round_half_up_div;
use crate::models::investment::Investment;

/// Denominator for one monthly cycle of an annual basis-point rate:
/// 10_000 bp × 12 months.
const ANNUAL_BPS_MONTHS: i128 = 10_000 * 12;

/// Expected profit over the first `months` months of the schedule,
/// rounded half-up to whole cents.
fn cumulative_profit(principal: i64, annual_rate_bps: u32, months: u32) -> i64 {
    round_half_up_div(
        principal as i128 * annual_rate_bps as i128 * months as i128,
        ANNUAL_BPS_MONTHS,
    )
}

/// Expected total profit over the investment's whole duration.
pub fn expected_total(principal: i64, annual_rate_bps: u32, duration_months: u32) -> i64 {
    cumulative_profit(principal, annual_rate_bps, duration_months)
}

/// Profit owed for the next unpaid cycle.
///
/// Returns 0 once the duration is exhausted. Never negative: the
/// cumulative expectation is non-decreasing in the cycle index.
///
/// # Example
/// ```
/// use compensation_engine_core_rs::profit::cycle_profit;
///
/// // $1,000.00 at 60% annual, paid monthly: $50.00 per cycle.
/// assert_eq!(cycle_profit(100_000, 6_000, 12, 0), 5_000);
/// assert_eq!(cycle_profit(100_000, 6_000, 12, 11), 5_000);
/// assert_eq!(cycle_profit(100_000, 6_000, 12, 12), 0);
/// ```
pub fn cycle_profit(
    principal: i64,
    annual_rate_bps: u32,
    duration_months: u32,
    cycles_paid: u32,
) -> i64 {
    if cycles_paid >= duration_months {
        return 0;
    }
    cumulative_profit(principal, annual_rate_bps, cycles_paid + 1)
        - cumulative_profit(principal, annual_rate_bps, cycles_paid)
}

/// Profit owed to an investment for its next cycle; zero unless the
/// investment is active.
pub fn cycle_profit_for(investment: &Investment) -> i64 {
    if !investment.is_active() {
        return 0;
    }
    cycle_profit(
        investment.principal(),
        investment.annual_rate_bps(),
        investment.duration_months(),
        investment.cycles_paid(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_rate_splits_exactly() {
        // 12% annual on $1,000.00 = $10.00/month, no rounding involved.
        for k in 0..12 {
            assert_eq!(cycle_profit(100_000, 1_200, 12, k), 1_000);
        }
    }

    #[test]
    fn test_sum_equals_expected_total() {
        // An awkward rate: 7.77% annual on $123.45 over 36 months.
        let principal = 12_345;
        let rate = 777;
        let duration = 36;

        let total: i64 = (0..duration)
            .map(|k| cycle_profit(principal, rate, duration, k))
            .sum();
        assert_eq!(total, expected_total(principal, rate, duration));
    }

    #[test]
    fn test_half_cent_cycles_do_not_drift() {
        // Exactly 0.5 cents/month: 1 cent every other month, never more.
        // Per-cycle rounding alone would pay 12 cents; the cumulative
        // schedule pays 6.
        let principal = 100;
        let rate = 600; // 6% annual => 0.5 cents/month
        let duration = 12;

        let payments: Vec<i64> = (0..duration)
            .map(|k| cycle_profit(principal, rate, duration, k))
            .collect();

        assert_eq!(payments.iter().sum::<i64>(), 6);
        assert!(payments.iter().all(|&p| p == 0 || p == 1));
    }

    #[test]
    fn test_never_negative() {
        for k in 0..48 {
            assert!(cycle_profit(1, 1, 48, k) >= 0);
        }
    }

    #[test]
    fn test_exhausted_duration_pays_zero() {
        assert_eq!(cycle_profit(100_000, 1_200, 12, 12), 0);
        assert_eq!(cycle_profit(100_000, 1_200, 12, 13), 0);
    }

    #[test]
    fn test_inactive_investment_pays_zero() {
        let mut inv = Investment::new("alice", "gold", 100_000, 1_200, 12, 0);
        assert!(cycle_profit_for(&inv) > 0);

        inv.cancel(10).unwrap();
        assert_eq!(cycle_profit_for(&inv), 0);
    }
}
