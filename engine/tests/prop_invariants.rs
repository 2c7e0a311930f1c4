//! Property Tests
//!
//! Randomized checks of the engine's core numeric invariants:
//! - rounding: half-up division stays within half a unit of exact
//! - profit: running totals never drift past the expected total
//! - loyalty: the withdrawable cap holds under any operation interleaving

use compensation_engine_core_rs::core::math::{apply_bps, round_half_up_div};
use compensation_engine_core_rs::models::account::Account;
use compensation_engine_core_rs::profit::{cycle_profit, expected_total};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_round_half_up_is_within_half_a_unit(
        num in 0i128..1_000_000_000_000,
        den in 1i128..1_000_000,
    ) {
        let result = round_half_up_div(num, den) as i128;
        // |num/den - result| <= 1/2, i.e. |2*num - 2*den*result| <= den.
        prop_assert!((2 * num - 2 * den * result).abs() <= den);
    }

    #[test]
    fn prop_profit_running_total_never_drifts(
        principal in 1i64..1_000_000_000,
        rate in 0u32..20_000,
        duration in 1u32..120,
    ) {
        let expected = expected_total(principal, rate, duration);
        let mut running = 0i64;
        for k in 0..duration {
            let amount = cycle_profit(principal, rate, duration, k);
            prop_assert!(amount >= 0);
            running += amount;
            prop_assert!(running <= expected + 1);
        }
        prop_assert_eq!(running, expected);
    }

    #[test]
    fn prop_loyalty_cap_holds_under_any_interleaving(
        ops in proptest::collection::vec((any::<bool>(), 1i64..1_000), 1..40),
        pct in 0u32..=10_000,
    ) {
        let mut account = Account::new("a", None, "basic");
        account.set_withdrawable_override_bps(Some(pct));

        for (is_award, amount) in ops {
            if is_award {
                account.award_loyalty(amount).unwrap();
            } else {
                // Over-limit withdrawals fail; that is the point.
                let _ = account.try_withdraw_loyalty(amount, 10_000, false);
            }
            prop_assert!(
                account.loyalty_withdrawn_total()
                    <= apply_bps(account.loyalty_awarded_total(), pct)
            );
        }
    }
}
