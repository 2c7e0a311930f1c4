//! Global settings and versioned snapshots
//!
//! Mutable platform-wide settings (loyalty withdrawable percentage, global
//! blocks, commission basis, point values) are read once per cycle run as
//! a [`SettingsSnapshot`]: a frozen copy plus the SHA-256 hash of its
//! canonical JSON form. A run records the hash it executed under, and a
//! checkpoint can only be restored against matching settings.

use crate::commission::CommissionBasis;
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Platform-wide mutable settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSettings {
    /// Default withdrawable fraction of lifetime loyalty points (basis
    /// points); overridable per account
    pub loyalty_withdrawable_bps: u32,

    /// Block loyalty withdrawals platform-wide
    pub loyalty_globally_blocked: bool,

    /// What referral commissions are computed from
    pub commission_basis: CommissionBasis,

    /// Loyalty points per whole currency unit of confirmed profit payout
    pub profit_payout_points_per_unit: i64,

    /// Loyalty points per whole currency unit of settled commission
    pub commission_payout_points_per_unit: i64,

    /// Bounded retry attempts for conflicting account updates
    pub max_update_attempts: u32,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            loyalty_withdrawable_bps: 10_000, // fully withdrawable
            loyalty_globally_blocked: false,
            commission_basis: CommissionBasis::Profit,
            profit_payout_points_per_unit: 1,
            commission_payout_points_per_unit: 1,
            max_update_attempts: 3,
        }
    }
}

/// A frozen settings copy with its content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    settings: GlobalSettings,
    hash: String,
}

impl SettingsSnapshot {
    /// Freeze the given settings and compute their hash.
    pub fn capture(settings: &GlobalSettings) -> Result<Self, EngineError> {
        Ok(Self {
            settings: settings.clone(),
            hash: settings_hash(settings)?,
        })
    }

    pub fn settings(&self) -> &GlobalSettings {
        &self.settings
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }
}

/// Deterministic SHA-256 hash of a serializable value.
///
/// Serializes through `serde_json::Value` with recursively sorted object
/// keys, so the hash does not depend on map iteration order.
pub fn settings_hash<T: Serialize>(value: &T) -> Result<String, EngineError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let value = serde_json::to_value(value)
        .map_err(|e| EngineError::Serialization(format!("settings serialization failed: {e}")))?;
    let json = serde_json::to_string(&canonicalize(value))
        .map_err(|e| EngineError::Serialization(format!("settings serialization failed: {e}")))?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
