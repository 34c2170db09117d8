//! Energy distribution for conduit networks.
//!
//! A source (generator or storage) pushes part of its buffer into the
//! receivers reachable over energy cables. Receivers are priority-sorted and
//! each gets at most an even floor share of the amount offered.
//!
//! # Design
//!
//! - Networks are discovered per call, never cached; cable edits take effect
//!   on the next distribution.
//! - Amounts live in the durable store and are only written through
//!   [`EnergyLedger`], which clamps every write into `[0, capacity]`.
//! - The floor split strands up to `receivers - 1` units per call. Those
//!   units stay in the source's buffer and are offered again next cycle.
//! - Storages discharge into consumers only ([`ReceiverFilter::ConsumersOnly`]),
//!   so two batteries on one cable never trade energy back and forth.

use conduit_core::catalog::{BlockCatalog, Capabilities, Classifiable, Medium};
use conduit_core::config::EnergyConfig;
use conduit_core::coord::Location;
use conduit_core::discovery::{discover, DiscoveryOptions};
use conduit_core::keys::energy_key;
use conduit_core::node::{stored_amount, Classifier, Node};
use conduit_core::store::{KvStore, Value};
use conduit_core::world::World;
use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Deterministic ratio type for reporting.
pub type Ratio = I32F32;

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Clamped read/write access to persisted energy amounts.
pub struct EnergyLedger<'s, S: KvStore + ?Sized> {
    store: &'s mut S,
}

impl<'s, S: KvStore + ?Sized> EnergyLedger<'s, S> {
    pub fn new(store: &'s mut S) -> Self {
        Self { store }
    }

    pub fn amount(&self, loc: Location, capacity: u64) -> u64 {
        stored_amount(&*self.store, loc, capacity)
    }

    /// Write an amount, clamped to `capacity`. Returns what was written.
    pub fn set(&mut self, loc: Location, amount: u64, capacity: u64) -> u64 {
        let clamped = amount.min(capacity);
        let stored = i64::try_from(clamped).unwrap_or(i64::MAX);
        self.store.set(&energy_key(loc), Value::Int(stored));
        clamped
    }

    /// Add up to `amount`, never past `capacity`. Returns the amount added.
    pub fn credit(&mut self, loc: Location, amount: u64, capacity: u64) -> u64 {
        let current = self.amount(loc, capacity);
        let next = current.saturating_add(amount).min(capacity);
        self.set(loc, next, capacity);
        next - current
    }

    /// Remove up to `amount`, never below zero. Returns the amount removed.
    pub fn debit(&mut self, loc: Location, amount: u64, capacity: u64) -> u64 {
        let current = self.amount(loc, capacity);
        let taken = amount.min(current);
        self.set(loc, current - taken, capacity);
        taken
    }

    /// Forget the amount for a block that no longer exists.
    pub fn clear(&mut self, loc: Location) {
        self.store.delete(&energy_key(loc));
    }
}

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

/// Which receivers a distribution may feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReceiverFilter {
    /// Any block that accepts energy.
    #[default]
    Any,
    /// Only blocks with the consumer capability.
    ConsumersOnly,
}

impl ReceiverFilter {
    fn admits(self, node: &Node) -> bool {
        match self {
            ReceiverFilter::Any => true,
            ReceiverFilter::ConsumersOnly => node.capabilities.contains(Capabilities::CONSUMER),
        }
    }
}

/// Outcome of one distribution call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Distribution {
    pub transferred: u64,
    /// `(receiver, amount)` in the order the transfers were made.
    pub transfers: Vec<(Location, u64)>,
    /// Eligible receivers after filtering.
    pub receivers: usize,
    /// Discovery stopped at a bound; some receivers may have been missed.
    pub truncated: bool,
}

struct Receiver {
    location: Location,
    capacity: u64,
    needed: u64,
    priority: u32,
}

/// Pushes energy from sources into their networks.
#[derive(Debug, Clone, Copy)]
pub struct EnergyDistributor<'a> {
    classifier: Classifier<'a>,
    max_nodes: usize,
    visit_limit: usize,
}

impl<'a> EnergyDistributor<'a> {
    pub fn new(catalog: &'a BlockCatalog, config: &EnergyConfig) -> Self {
        Self {
            classifier: Classifier::new(catalog),
            max_nodes: config.max_nodes,
            visit_limit: config.visit_limit,
        }
    }

    pub fn classifier(&self) -> &Classifier<'a> {
        &self.classifier
    }

    fn options(&self) -> DiscoveryOptions {
        DiscoveryOptions::new(Medium::Energy, self.max_nodes).with_visit_limit(self.visit_limit)
    }

    /// Offer `amount` from `source` to every eligible receiver. Returns the
    /// amount actually transferred.
    ///
    /// Receivers are credited; the source is not debited. The caller keeps
    /// whatever was not transferred.
    pub fn distribute<W, S>(&self, world: &W, store: &mut S, source: Location, amount: u64) -> u64
    where
        W: World + ?Sized,
        S: KvStore + ?Sized,
    {
        self.distribute_filtered(world, store, source, amount, ReceiverFilter::Any)
            .transferred
    }

    /// [`distribute`](Self::distribute) restricted to the receivers `filter` admits.
    pub fn distribute_filtered<W, S>(
        &self,
        world: &W,
        store: &mut S,
        source: Location,
        amount: u64,
        filter: ReceiverFilter,
    ) -> Distribution
    where
        W: World + ?Sized,
        S: KvStore + ?Sized,
    {
        let mut result = Distribution::default();
        if amount == 0 {
            return result;
        }
        let Some(src) = self.classifier.classify(world, &*store, source) else {
            return result;
        };
        if !src.outputs_energy() {
            return result;
        }

        let network = discover(
            &self.classifier,
            world,
            &*store,
            source,
            self.options().excluding_seed(),
        );
        result.truncated = network.is_truncated();

        let mut receivers: Vec<Receiver> = network
            .iter()
            .filter(|node| node.accepts_energy() && filter.admits(node))
            .filter_map(|node| {
                let level = node.energy?;
                (level.needed() > 0).then_some(Receiver {
                    location: node.location,
                    capacity: level.capacity,
                    needed: level.needed(),
                    priority: node.energy_priority,
                })
            })
            .collect();
        result.receivers = receivers.len();
        if receivers.is_empty() {
            return result;
        }

        // Stable: equal priorities keep discovery order.
        receivers.sort_by(|a, b| b.priority.cmp(&a.priority));

        let share = amount / receivers.len() as u64;
        let mut ledger = EnergyLedger::new(store);
        for r in &receivers {
            if result.transferred >= amount {
                break;
            }
            let give = share.min(r.needed).min(amount - result.transferred);
            if give == 0 {
                continue;
            }
            let added = ledger.credit(r.location, give, r.capacity);
            if added > 0 {
                tracing::debug!(from = %source, to = %r.location, amount = added, "energy transfer");
                result.transferred += added;
                result.transfers.push((r.location, added));
            }
        }
        result
    }

    /// Offer a source's buffer to its network and debit what was delivered.
    ///
    /// The offer is the stored amount, capped by the block type's
    /// `max_output`. Returns the distribution outcome.
    pub fn push_from<W, S>(
        &self,
        world: &W,
        store: &mut S,
        source: Location,
        filter: ReceiverFilter,
    ) -> Distribution
    where
        W: World + ?Sized,
        S: KvStore + ?Sized,
    {
        let Some((_, def)) = self.classifier.definition_at(world, source) else {
            return Distribution::default();
        };
        let capacity = def.energy_capacity;
        let stored = stored_amount(&*store, source, capacity);
        let offer = def.max_output.map_or(stored, |cap| stored.min(cap));

        let result = self.distribute_filtered(world, store, source, offer, filter);
        if result.transferred > 0 {
            EnergyLedger::new(store).debit(source, result.transferred, capacity);
        }
        result
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// Summarise the full network around `seed`, conduits included.
    pub fn analyze_network<W, S>(&self, world: &W, store: &S, seed: Location) -> NetworkAnalysis
    where
        W: World + ?Sized,
        S: KvStore + ?Sized,
    {
        let network = discover(
            &self.classifier,
            world,
            store,
            seed,
            self.options().full_topology(),
        );

        let mut analysis = NetworkAnalysis {
            total_nodes: network.len(),
            conduit_count: network.conduit_count(),
            truncated: network.is_truncated(),
            ..NetworkAnalysis::default()
        };
        for node in network.iter() {
            if node.capabilities.contains(Capabilities::GENERATOR) {
                analysis.generators += 1;
            }
            if node.capabilities.contains(Capabilities::CONSUMER) {
                analysis.consumers += 1;
            }
            if node.capabilities.contains(Capabilities::STORAGE) {
                analysis.storages += 1;
                if let Some(level) = node.energy {
                    analysis.stored += level.amount;
                    analysis.capacity += level.capacity;
                }
            }
        }
        analysis.fill_ratio = fill_ratio(analysis.stored, analysis.capacity);
        analysis
    }

    /// `(amount, capacity)` for an energy-bearing block.
    pub fn get_resource_display<W, S>(&self, world: &W, store: &S, loc: Location) -> Option<(u64, u64)>
    where
        W: World + ?Sized,
        S: KvStore + ?Sized,
    {
        self.classifier
            .classify(world, store, loc)?
            .energy
            .map(|level| (level.amount, level.capacity))
    }
}

/// Counts and totals for one energy network.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkAnalysis {
    pub generators: usize,
    pub storages: usize,
    pub consumers: usize,
    pub conduit_count: usize,
    pub total_nodes: usize,
    /// Energy held by storages.
    pub stored: u64,
    /// Combined storage capacity.
    pub capacity: u64,
    /// `stored / capacity`, zero for a network without storage.
    pub fill_ratio: Ratio,
    pub truncated: bool,
}

fn fill_ratio(stored: u64, capacity: u64) -> Ratio {
    if capacity == 0 {
        return Ratio::ZERO;
    }
    // Keep both operands inside the i32 integer range of the ratio type.
    let shift = (64 - capacity.leading_zeros()).saturating_sub(31);
    let stored = stored.min(capacity) >> shift;
    let capacity = capacity >> shift;
    Ratio::from_num(stored) / Ratio::from_num(capacity)
}

// ===========================================================================
// Tests
// ===========================================================================
