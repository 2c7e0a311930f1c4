//! Checkpoint - save/load engine state
//!
//! A batch run can be halted between investments; a snapshot taken at
//! that point captures every committed event, the summary rows, and the
//! settings the run executed under. Restoring validates the settings hash
//! so a checkpoint can never silently resume under different rules.
//!
//! # Critical Invariants
//!
//! - **Event-set identity**: a restored engine reports exactly the events
//!   the snapshot carried, idempotency keys included, so replays still
//!   dedup.
//! - **Settings matching**: restore fails on a settings/hash mismatch.

use crate::config::{settings_hash, GlobalSettings};
use crate::error::EngineError;
use crate::ledger::{InMemoryLedger, LedgerSnapshot};
use crate::models::tier::Tier;
use crate::orchestrator::engine::CompensationEngine;
use crate::tier::TierRegistry;
use serde::{Deserialize, Serialize};

/// Complete engine state snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Settings in force when the snapshot was taken
    pub settings: GlobalSettings,

    /// Hash of `settings` (validated on restore)
    pub settings_hash: String,

    /// The full tier table, archived tiers included
    pub tiers: Vec<Tier>,

    /// Every account, investment, and event table
    pub ledger: LedgerSnapshot,
}

impl EngineSnapshot {
    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::Serialization(format!("snapshot encoding failed: {e}")))
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json)
            .map_err(|e| EngineError::Serialization(format!("snapshot decoding failed: {e}")))
    }
}

impl CompensationEngine {
    /// Capture the whole engine state.
    pub fn snapshot(&self) -> Result<EngineSnapshot, EngineError> {
        Ok(EngineSnapshot {
            settings: self.settings().clone(),
            settings_hash: settings_hash(self.settings())?,
            tiers: self.tier_registry().all().to_vec(),
            ledger: self.ledger().snapshot(),
        })
    }

    /// Rebuild an engine from a snapshot. Collaborators reset to the
    /// no-op defaults; re-wire them with `with_collaborators`.
    pub fn restore(snapshot: EngineSnapshot) -> Result<Self, EngineError> {
        let expected = settings_hash(&snapshot.settings)?;
        if expected != snapshot.settings_hash {
            return Err(EngineError::Validation(
                "snapshot settings hash mismatch".to_string(),
            ));
        }

        let mut tiers = TierRegistry::new();
        for tier in snapshot.tiers {
            tiers.register(tier)?;
        }
        let ledger = InMemoryLedger::restore(snapshot.ledger);

        Ok(CompensationEngine::restore_parts(
            ledger,
            tiers,
            snapshot.settings,
        ))
    }
}
