//! Schedule arithmetic for compensation cycles
//!
//! Engine time is a discrete day index (i64, days since the engine epoch).
//! One scheduling month is a fixed 30-day period: lock-in periods, payment
//! cycles and durations are all expressed in these months, so schedule
//! arithmetic stays deterministic and calendar-free.

use serde::{Deserialize, Serialize};

/// Length of one scheduling month in days.
pub const DAYS_PER_MONTH: i64 = 30;

/// Convert whole months into days.
pub fn months_to_days(months: u32) -> i64 {
    months as i64 * DAYS_PER_MONTH
}

/// Whole scheduling months elapsed between two day indices.
///
/// Saturates at zero when `as_of_day` precedes `start_day`.
///
/// # Example
/// ```
/// use compensation_engine_core_rs::core::time::months_elapsed;
///
/// assert_eq!(months_elapsed(0, 89), 2);   // 89 days = 2 full months
/// assert_eq!(months_elapsed(0, 90), 3);
/// assert_eq!(months_elapsed(100, 50), 0); // before start
/// ```
pub fn months_elapsed(start_day: i64, as_of_day: i64) -> u32 {
    if as_of_day <= start_day {
        return 0;
    }
    ((as_of_day - start_day) / DAYS_PER_MONTH) as u32
}

/// Payment schedule for a fixed-duration investment.
///
/// The k-th cycle (0-indexed) falls due one month after the previous one,
/// with the first payment one month after the start day.
///
/// # Example
/// ```
/// use compensation_engine_core_rs::core::time::CycleSchedule;
///
/// let schedule = CycleSchedule::new(10, 12);
/// assert_eq!(schedule.payment_day(0), 40);  // first cycle
/// assert_eq!(schedule.payment_day(11), 370); // last cycle
/// assert_eq!(schedule.total_cycles(), 12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSchedule {
    start_day: i64,
    duration_months: u32,
}

impl CycleSchedule {
    pub fn new(start_day: i64, duration_months: u32) -> Self {
        assert!(duration_months > 0, "duration_months must be positive");
        Self {
            start_day,
            duration_months,
        }
    }

    /// Day on which the k-th (0-indexed) cycle falls due.
    pub fn payment_day(&self, cycle: u32) -> i64 {
        self.start_day + months_to_days(cycle + 1)
    }

    /// Total number of payment cycles over the investment's life.
    pub fn total_cycles(&self) -> u32 {
        self.duration_months
    }

    /// True once `cycles_paid` covers the whole duration.
    pub fn is_exhausted(&self, cycles_paid: u32) -> bool {
        cycles_paid >= self.duration_months
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_months_elapsed_boundaries() {
        assert_eq!(months_elapsed(0, 0), 0);
        assert_eq!(months_elapsed(0, 29), 0);
        assert_eq!(months_elapsed(0, 30), 1);
        assert_eq!(months_elapsed(0, 359), 11);
        assert_eq!(months_elapsed(0, 360), 12);
    }

    #[test]
    fn test_schedule_payment_days_are_monotone() {
        let schedule = CycleSchedule::new(0, 6);
        let mut prev = 0;
        for k in 0..schedule.total_cycles() {
            let day = schedule.payment_day(k);
            assert!(day > prev);
            prev = day;
        }
    }

    #[test]
    fn test_schedule_exhaustion() {
        let schedule = CycleSchedule::new(0, 3);
        assert!(!schedule.is_exhausted(2));
        assert!(schedule.is_exhausted(3));
        assert!(schedule.is_exhausted(4));
    }
}
