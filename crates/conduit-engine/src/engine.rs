//! The tick driver.
//!
//! [`Engine`] owns every piece of cross-tick state: the transport registry,
//! the fairness index, the active-node cache, pending region scans and the
//! statistics. The world and the durable store are borrowed per call.
//!
//! # Tick order
//!
//! 1. **Cache refresh** -- reconcile the active-node cache with persisted
//!    energy keys.
//! 2. **Distribution** -- generators push into their networks, then storages
//!    discharge into consumers.
//! 3. **Transport** -- one item per item network.
//! 4. **Cleanup** -- purge transport sources that no longer qualify.
//! 5. **Scan continuation** -- advance pending region scans within the
//!    per-tick budget.
//! 6. **Actor scans** -- queue a region scan around each connected actor.
//!
//! Steps 1-4 and 6 run on their configured intervals; step 5 runs whenever
//! a scan is pending. Each step is wrapped by [`Engine::run_task`], which is
//! the only place failures are logged.

use crate::cache::ActiveCache;
use crate::schedule::{Schedule, Task};
use crate::stats::EngineStats;
use conduit_core::catalog::{BlockCatalog, Capabilities, Classifiable};
use conduit_core::config::EngineConfig;
use conduit_core::coord::Location;
use conduit_core::error::EngineError;
use conduit_core::id::BlockTypeId;
use conduit_core::keys::{parse_energy_key, ENERGY_PREFIX};
use conduit_core::node::Classifier;
use conduit_core::store::KvStore;
use conduit_core::world::{Cell, World};
use conduit_logistics::fairness::FairnessIndex;
use conduit_logistics::registry::{TransportRegistry, Validation};
use conduit_logistics::scan::{ScanCursor, ScanProgress};
use conduit_logistics::transport::ItemTransport;
use conduit_power::{EnergyDistributor, EnergyLedger, NetworkAnalysis, ReceiverFilter};
use std::collections::{HashSet, VecDeque};

/// What happened during one [`Engine::step`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    /// Tasks that ran, in order.
    pub ran: Vec<Task>,
    /// Contained failures during this tick.
    pub failures: u64,
}

/// Summary of [`Engine::recover`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Recovery {
    pub sources: usize,
    pub corrupted: usize,
    pub active_nodes: usize,
}

pub struct Engine {
    catalog: BlockCatalog,
    config: EngineConfig,
    schedule: Schedule,
    registry: TransportRegistry,
    fairness: FairnessIndex,
    cache: ActiveCache,
    scans: VecDeque<ScanCursor>,
    stats: EngineStats,
    tick: u64,
}

impl Engine {
    /// Construct an engine at world load.
    pub fn new(catalog: BlockCatalog, config: EngineConfig) -> Self {
        Self {
            schedule: Schedule::new(config.schedule.clone()),
            catalog,
            config,
            registry: TransportRegistry::new(),
            fairness: FairnessIndex::new(),
            cache: ActiveCache::new(),
            scans: VecDeque::new(),
            stats: EngineStats::default(),
            tick: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn catalog(&self) -> &BlockCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The next tick to run.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn registry(&self) -> &TransportRegistry {
        &self.registry
    }

    pub fn fairness(&self) -> &FairnessIndex {
        &self.fairness
    }

    pub fn active_nodes(&self) -> &ActiveCache {
        &self.cache
    }

    pub fn pending_scans(&self) -> usize {
        self.scans.len()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Rebuild the registry and the active-node cache from the store.
    ///
    /// Corrupt entries are purged and counted; recovery itself never fails.
    pub fn recover<W, S>(&mut self, world: &W, store: &mut S) -> Recovery
    where
        W: World + ?Sized,
        S: KvStore + ?Sized,
    {
        let report = self.registry.recover(world, store);
        for err in &report.corrupted {
            Self::record_failure(&mut self.stats, "recovery", err);
        }
        if let Err(err) = self.refresh_cache(world, store) {
            Self::record_failure(&mut self.stats, "recovery", &err);
        }
        let recovery = Recovery {
            sources: report.recovered,
            corrupted: report.corrupted.len(),
            active_nodes: self.cache.len(),
        };
        tracing::info!(
            sources = recovery.sources,
            corrupted = recovery.corrupted,
            active_nodes = recovery.active_nodes,
            "engine recovered"
        );
        recovery
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// A block was placed. Registers transport sources and opens an energy
    /// entry for energy-bearing blocks.
    pub fn on_block_placed<S>(&mut self, store: &mut S, loc: Location, block_type: BlockTypeId)
    where
        S: KvStore + ?Sized,
    {
        let Some(def) = self.catalog.get(block_type) else {
            tracing::debug!(%loc, ?block_type, "placed block type not in catalog");
            return;
        };
        if def.is_transport_source() && self.registry.register(store, loc, self.tick) {
            self.stats.sources_registered += 1;
        }
        if def.capabilities.intersects(Capabilities::ENERGY) {
            let capacity = def.energy_capacity;
            let mut ledger = EnergyLedger::new(store);
            let amount = ledger.amount(loc, capacity);
            ledger.set(loc, amount, capacity);
            self.cache.insert(loc);
        }
    }

    /// A block was removed. Drops any registry entry and energy entry at `loc`.
    pub fn on_block_removed<S>(&mut self, store: &mut S, loc: Location, block_type: BlockTypeId)
    where
        S: KvStore + ?Sized,
    {
        tracing::debug!(%loc, ?block_type, "block removed");
        self.registry.unregister(store, loc);
        if self.cache.remove(loc) {
            EnergyLedger::new(store).clear(loc);
        }
    }

    /// Queue a region scan around `center`.
    pub fn scan_region(&mut self, center: Location, radius: u32) {
        let cursor = ScanCursor::new(center, radius, self.config.schedule.scan_chunk_size);
        tracing::debug!(%center, radius, chunks = cursor.total_chunks(), "region scan queued");
        self.scans.push_back(cursor);
        self.stats.scans_started += 1;
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    pub fn analyze_network<W, S>(&self, world: &W, store: &S, seed: Location) -> NetworkAnalysis
    where
        W: World + ?Sized,
        S: KvStore + ?Sized,
    {
        EnergyDistributor::new(&self.catalog, &self.config.energy).analyze_network(world, store, seed)
    }

    pub fn get_resource_display<W, S>(&self, world: &W, store: &S, loc: Location) -> Option<(u64, u64)>
    where
        W: World + ?Sized,
        S: KvStore + ?Sized,
    {
        EnergyDistributor::new(&self.catalog, &self.config.energy).get_resource_display(world, store, loc)
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Run one tick. Never fails; contained failures are logged, counted and
    /// reported.
    pub fn step<W, S>(&mut self, world: &mut W, store: &mut S) -> TickReport
    where
        W: World + ?Sized,
        S: KvStore + ?Sized,
    {
        let tick = self.tick;
        let failures_before = self.stats.task_failures;
        let mut report = TickReport {
            tick,
            ..TickReport::default()
        };

        for task in Task::ORDER {
            let due = match task {
                Task::ScanContinuation => !self.scans.is_empty(),
                _ => self.schedule.is_due(task, tick),
            };
            if !due {
                continue;
            }
            self.run_task(task, &mut report, |e| match task {
                Task::CacheRefresh => e.refresh_cache(&*world, &mut *store),
                Task::Distribution => e.distribute_energy(&*world, &mut *store),
                Task::Transport => e.transport_items(&mut *world, &*store),
                Task::Cleanup => e.cleanup(&*world, &mut *store),
                Task::ScanContinuation => e.continue_scans(&*world, &mut *store),
                Task::ActorScan => e.schedule_actor_scans(&*world),
            });
        }

        self.tick += 1;
        self.stats.ticks += 1;
        report.failures = self.stats.task_failures - failures_before;
        report
    }

    /// Run one scheduled task, containing and logging its failure.
    fn run_task<F>(&mut self, task: Task, report: &mut TickReport, f: F)
    where
        F: FnOnce(&mut Self) -> Result<(), EngineError>,
    {
        report.ran.push(task);
        if let Err(err) = f(self) {
            Self::record_failure(&mut self.stats, task.name(), &err);
        }
    }

    /// Log and count one contained failure.
    fn record_failure(stats: &mut EngineStats, task: &'static str, err: &EngineError) {
        stats.task_failures += 1;
        match err {
            EngineError::InvariantViolation(_) => {
                stats.invariant_violations += 1;
                tracing::error!(task, error = %err, "invariant violated; unit of work aborted");
            }
            EngineError::RegistryCorruption { .. } => {
                stats.corrupt_entries += 1;
                tracing::warn!(task, error = %err, "corrupt entry purged");
            }
            _ => tracing::warn!(task, error = %err, "task failed"),
        }
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    fn refresh_cache<W, S>(&mut self, world: &W, store: &mut S) -> Result<(), EngineError>
    where
        W: World + ?Sized,
        S: KvStore + ?Sized,
    {
        let classifier = Classifier::new(&self.catalog);
        let mut live = Vec::new();
        let mut stale = Vec::new();

        for key in store.list_keys(ENERGY_PREFIX) {
            let Some(loc) = parse_energy_key(&key) else {
                store.delete(&key);
                let err = EngineError::corruption(key, "unparseable energy key");
                Self::record_failure(&mut self.stats, Task::CacheRefresh.name(), &err);
                continue;
            };
            match world.get_cell(loc) {
                // Unknown until loaded; keep it.
                Cell::Unloaded => live.push(loc),
                Cell::Empty => stale.push(key),
                Cell::Block(_) => {
                    let energy_bearing = classifier
                        .definition_at(world, loc)
                        .is_some_and(|(_, def)| def.capabilities.intersects(Capabilities::ENERGY));
                    if energy_bearing {
                        live.push(loc);
                    } else {
                        stale.push(key);
                    }
                }
            }
        }

        // Survivors keep their place; keys seen for the first time go last.
        let keep: HashSet<Location> = live.iter().copied().collect();
        self.cache.retain(|loc| keep.contains(&loc));
        for loc in live {
            self.cache.insert(loc);
        }
        for key in &stale {
            store.delete(key);
        }
        tracing::debug!(active = self.cache.len(), stale = stale.len(), "active-node cache refreshed");
        Ok(())
    }

    fn distribute_energy<W, S>(&mut self, world: &W, store: &mut S) -> Result<(), EngineError>
    where
        W: World + ?Sized,
        S: KvStore + ?Sized,
    {
        let distributor = EnergyDistributor::new(&self.catalog, &self.config.energy);
        let classifier = distributor.classifier();

        let mut generators = Vec::new();
        let mut storages = Vec::new();
        for loc in self.cache.iter() {
            let Some((_, def)) = classifier.definition_at(world, loc) else {
                continue;
            };
            if !def.outputs_energy() {
                continue;
            }
            if def.capabilities.contains(Capabilities::GENERATOR) {
                generators.push(loc);
            } else {
                storages.push(loc);
            }
        }

        let passes = [
            (generators, ReceiverFilter::Any),
            (storages, ReceiverFilter::ConsumersOnly),
        ];
        for (sources, filter) in passes {
            for source in sources {
                let result = distributor.push_from(world, store, source, filter);
                self.stats.distributions += 1;
                self.stats.energy_transferred += result.transferred;
                if result.truncated {
                    self.stats.truncated_discoveries += 1;
                }
            }
        }
        Ok(())
    }

    fn transport_items<W, S>(&mut self, world: &mut W, store: &S) -> Result<(), EngineError>
    where
        W: World + ?Sized,
        S: KvStore + ?Sized,
    {
        let transport = ItemTransport::new(&self.catalog, &self.config.items);
        let report = transport.run(world, store, &mut self.registry, &mut self.fairness);

        self.stats.items_moved += report.moved;
        self.stats.items_returned += report.returned;
        self.stats.truncated_discoveries += report.truncated_discoveries as u64;
        for err in &report.errors {
            Self::record_failure(&mut self.stats, Task::Transport.name(), err);
        }
        Ok(())
    }

    fn cleanup<W, S>(&mut self, world: &W, store: &mut S) -> Result<(), EngineError>
    where
        W: World + ?Sized,
        S: KvStore + ?Sized,
    {
        let classifier = Classifier::new(&self.catalog);
        let report = self.registry.validate_all(&classifier, world, store, self.tick);
        self.stats.sources_purged += report.removed.len() as u64;
        if !report.removed.is_empty() {
            tracing::info!(
                purged = report.removed.len(),
                deferred = report.deferred,
                remaining = self.registry.len(),
                "transport registry cleaned"
            );
        }
        Ok(())
    }

    fn continue_scans<W, S>(&mut self, world: &W, store: &mut S) -> Result<(), EngineError>
    where
        W: World + ?Sized,
        S: KvStore + ?Sized,
    {
        let classifier = Classifier::new(&self.catalog);
        let mut budget = self.schedule.budget();
        let mut found = Vec::new();

        while let Some(cursor) = self.scans.front_mut() {
            if !budget.try_spend() {
                break;
            }
            if cursor.advance(&classifier, world, 1, &mut found) == ScanProgress::Finished {
                let center = cursor.center();
                self.scans.pop_front();
                self.stats.scans_completed += 1;
                tracing::info!(%center, "region scan finished");
            }
        }

        self.stats.scan_chunks += budget.spent() as u64;

        for loc in found {
            if self.registry.contains(loc) {
                continue;
            }
            if TransportRegistry::check(&classifier, world, loc) == Validation::Valid
                && self.registry.register(store, loc, self.tick)
            {
                self.stats.sources_registered += 1;
            }
        }
        Ok(())
    }

    fn schedule_actor_scans<W>(&mut self, world: &W) -> Result<(), EngineError>
    where
        W: World + ?Sized,
    {
        let radius = self.config.schedule.scan_radius;
        for pos in world.actor_positions() {
            if self.scans.iter().any(|s| s.center() == pos) {
                continue;
            }
            self.scan_region(pos, radius);
        }
        Ok(())
    }
}
