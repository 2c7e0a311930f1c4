//! Money math helpers
//!
//! All monetary values are i64 (cents/minor units). All rates are integer
//! basis points (100 bp = 1%). Percentage math runs through i128
//! intermediates with round-half-up, so identical inputs always produce
//! identical cent amounts.

/// Basis points in one whole (100%)
pub const BPS_SCALE: i64 = 10_000;

/// Divide with round-half-up semantics.
///
/// Both operands must be non-negative; the denominator must be positive.
/// Used for every percentage computation in the engine so that rounding
/// behaves identically everywhere.
///
/// # Example
/// ```
/// use compensation_engine_core_rs::core::math::round_half_up_div;
///
/// assert_eq!(round_half_up_div(5, 2), 3);  // 2.5 rounds up
/// assert_eq!(round_half_up_div(4, 2), 2);
/// assert_eq!(round_half_up_div(7, 4), 2);  // 1.75 rounds up
/// assert_eq!(round_half_up_div(1, 4), 0);  // 0.25 rounds down
/// ```
pub fn round_half_up_div(numerator: i128, denominator: i128) -> i64 {
    debug_assert!(numerator >= 0, "numerator must be non-negative");
    debug_assert!(denominator > 0, "denominator must be positive");

    ((2 * numerator + denominator) / (2 * denominator)) as i64
}

/// Apply a basis-point rate to an amount, rounding half-up to whole cents.
///
/// # Example
/// ```
/// use compensation_engine_core_rs::core::math::apply_bps;
///
/// // 10% of $50.00 = $5.00
/// assert_eq!(apply_bps(5_000, 1_000), 500);
/// // 50% of $10.00 = $5.00
/// assert_eq!(apply_bps(1_000, 5_000), 500);
/// ```
pub fn apply_bps(amount: i64, rate_bps: u32) -> i64 {
    debug_assert!(amount >= 0, "amount must be non-negative");
    round_half_up_div(amount as i128 * rate_bps as i128, BPS_SCALE as i128)
}
