//! Engine configuration.
//!
//! Every field has a serde default, so a configuration file only needs to
//! name the values it changes.

use crate::discovery::DEFAULT_VISIT_LIMIT;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub energy: EnergyConfig,
    pub items: ItemConfig,
    pub schedule: ScheduleConfig,
}

/// Energy network bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    /// Maximum nodes in a discovered energy network.
    pub max_nodes: usize,
    pub visit_limit: usize,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            max_nodes: 90,
            visit_limit: DEFAULT_VISIT_LIMIT,
        }
    }
}

/// Item network bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemConfig {
    /// Maximum nodes in a discovered item network.
    pub max_nodes: usize,
    pub visit_limit: usize,
    /// Conduit cells walked when deriving a network identifier.
    pub anchor_cap: usize,
}

impl Default for ItemConfig {
    fn default() -> Self {
        Self {
            max_nodes: 50,
            visit_limit: DEFAULT_VISIT_LIMIT,
            anchor_cap: 100,
        }
    }
}

/// Task intervals (in ticks) and per-tick budgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub distribution_interval: u64,
    pub transport_interval: u64,
    pub cache_refresh_interval: u64,
    pub cleanup_interval: u64,
    /// How often a region scan is started around each connected actor.
    /// Zero disables actor scans.
    pub actor_scan_interval: u64,
    pub scan_radius: u32,
    /// Edge length of one scan sub-volume.
    pub scan_chunk_size: u32,
    pub scan_chunks_per_tick: usize,
    /// Wall-clock allowance for scan continuation per tick.
    pub tick_budget_micros: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            distribution_interval: 20,
            transport_interval: 20,
            cache_refresh_interval: 200,
            cleanup_interval: 600,
            actor_scan_interval: 1200,
            scan_radius: 32,
            scan_chunk_size: 8,
            scan_chunks_per_tick: 4,
            tick_budget_micros: 2_000,
        }
    }
}
