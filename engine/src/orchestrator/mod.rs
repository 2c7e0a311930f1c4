//! Orchestrator - the cycle runner and operation facade
//!
//! See `engine.rs` for the cycle loop and `checkpoint.rs` for halt/resume
//! snapshots.

pub mod checkpoint;
pub mod engine;

pub use checkpoint::EngineSnapshot;
pub use engine::{CompensationEngine, CycleReport, EngineConfig};
