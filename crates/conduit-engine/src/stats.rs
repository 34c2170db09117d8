//! Engine statistics counters.
//!
//! Contained failures never reach a player; these counters (and the log) are
//! where they show up.

use serde::{Deserialize, Serialize};

/// Cumulative counters since the engine was constructed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub ticks: u64,
    pub energy_transferred: u64,
    pub distributions: u64,
    pub items_moved: u64,
    pub items_returned: u64,
    pub sources_registered: u64,
    pub sources_purged: u64,
    pub corrupt_entries: u64,
    pub scans_started: u64,
    pub scans_completed: u64,
    pub scan_chunks: u64,
    pub task_failures: u64,
    pub invariant_violations: u64,
    pub truncated_discoveries: u64,
}
