//! Domain models
//!
//! - `tier`: rate/benefit tiers accounts qualify for
//! - `account`: investor accounts with sponsor links and loyalty totals
//! - `investment`: fixed-duration investments on a monthly payment schedule
//! - `event`: the append-only event types that form the audit trail
//!
//! CRITICAL: all money values are i64 (cents), all rates are basis points.

pub mod account;
pub mod event;
pub mod investment;
pub mod tier;
