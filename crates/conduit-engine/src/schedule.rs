//! Task intervals and the per-tick work budget.

use conduit_core::config::ScheduleConfig;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// The engine's scheduled tasks, in the order they run within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Task {
    CacheRefresh,
    Distribution,
    Transport,
    Cleanup,
    ScanContinuation,
    ActorScan,
}

impl Task {
    pub const ORDER: [Task; 6] = [
        Task::CacheRefresh,
        Task::Distribution,
        Task::Transport,
        Task::Cleanup,
        Task::ScanContinuation,
        Task::ActorScan,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Task::CacheRefresh => "cache_refresh",
            Task::Distribution => "distribution",
            Task::Transport => "transport",
            Task::Cleanup => "cleanup",
            Task::ScanContinuation => "scan_continuation",
            Task::ActorScan => "actor_scan",
        }
    }
}

/// Decides which interval tasks are due on a tick.
#[derive(Debug, Clone)]
pub struct Schedule {
    config: ScheduleConfig,
}

impl Schedule {
    pub fn new(config: ScheduleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Interval for a task. `None` for tasks that are not interval driven.
    pub fn interval(&self, task: Task) -> Option<u64> {
        match task {
            Task::CacheRefresh => Some(self.config.cache_refresh_interval),
            Task::Distribution => Some(self.config.distribution_interval),
            Task::Transport => Some(self.config.transport_interval),
            Task::Cleanup => Some(self.config.cleanup_interval),
            Task::ActorScan => Some(self.config.actor_scan_interval),
            Task::ScanContinuation => None,
        }
    }

    /// Whether an interval task runs on `tick`. A zero interval disables it.
    pub fn is_due(&self, task: Task, tick: u64) -> bool {
        match self.interval(task) {
            Some(0) | None => false,
            Some(interval) => tick % interval == 0,
        }
    }

    pub fn budget(&self) -> TickBudget {
        TickBudget::new(
            self.config.scan_chunks_per_tick,
            Duration::from_micros(self.config.tick_budget_micros),
        )
    }
}

/// Work allowance for scan continuation within one tick.
///
/// Spending stops when either the chunk allowance or the wall-clock
/// allowance runs out. The first chunk of a tick is always granted.
#[derive(Debug)]
pub struct TickBudget {
    started: Instant,
    limit: Duration,
    chunks_left: usize,
    spent: usize,
}

impl TickBudget {
    pub fn new(chunks: usize, limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit,
            chunks_left: chunks.max(1),
            spent: 0,
        }
    }

    /// Claim one chunk of work. Returns `false` once the budget is spent.
    pub fn try_spend(&mut self) -> bool {
        if self.spent > 0 && (self.chunks_left == 0 || self.started.elapsed() >= self.limit) {
            return false;
        }
        self.chunks_left = self.chunks_left.saturating_sub(1);
        self.spent += 1;
        true
    }

    pub fn spent(&self) -> usize {
        self.spent
    }
}
