//! Durable registry of item transport sources.
//!
//! Every entry is mirrored into the store under `"source_<x>,<y>,<z>"` with a
//! record value `{dimension, validated_at}`. The in-memory map is rebuilt
//! from those keys at world load.
//!
//! The key carries no dimension, so two sources at the same coordinates in
//! different dimensions share one key; the most recent write wins.

use conduit_core::catalog::Classifiable;
use conduit_core::coord::{DimensionId, Direction, Location};
use conduit_core::error::EngineError;
use conduit_core::keys::{parse_source_key, source_key, SOURCE_PREFIX};
use conduit_core::node::Classifier;
use conduit_core::store::{KvStore, Value};
use conduit_core::world::{Cell, World};
use std::collections::BTreeMap;

/// One registered source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub location: Location,
    /// Tick of the last successful validation.
    pub validated_at: u64,
    /// Adjacent face to try first on the next transfer.
    pub next_face: usize,
}

impl SourceEntry {
    fn new(location: Location, validated_at: u64) -> Self {
        Self {
            location,
            validated_at,
            next_face: 0,
        }
    }

    fn record(&self) -> Value {
        Value::record([
            ("dimension", Value::Int(i64::from(self.location.dim.0))),
            ("validated_at", Value::Int(i64::try_from(self.validated_at).unwrap_or(i64::MAX))),
        ])
    }
}

/// Why an entry no longer qualifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// The cell is empty or holds an uncatalogued block.
    Missing,
    /// The block is not an output item conduit.
    WrongType,
    /// No adjacent block holds items.
    NoInventory,
}

/// Result of checking one entry against the live world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid(InvalidReason),
    /// Part of the neighbourhood is unloaded; decide on a later pass.
    Deferred,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub checked: usize,
    pub removed: Vec<Location>,
    pub deferred: usize,
}

#[derive(Debug, Default)]
pub struct RecoveryReport {
    pub recovered: usize,
    /// Entries that were purged from the store, one error each.
    pub corrupted: Vec<EngineError>,
}

#[derive(Debug, Clone, Default)]
pub struct TransportRegistry {
    entries: BTreeMap<Location, SourceEntry>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, loc: Location) -> bool {
        self.entries.contains_key(&loc)
    }

    pub fn get(&self, loc: Location) -> Option<&SourceEntry> {
        self.entries.get(&loc)
    }

    /// Entries in location order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceEntry> {
        self.entries.values()
    }

    pub fn locations(&self) -> Vec<Location> {
        self.entries.keys().copied().collect()
    }

    /// Remember which face delivered so the next attempt starts after it.
    pub fn advance_face(&mut self, loc: Location, delivered: Direction) {
        if let Some(entry) = self.entries.get_mut(&loc) {
            entry.next_face = (delivered.index() + 1) % Direction::ALL.len();
        }
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Add a source. Returns `false` if it was already registered.
    pub fn register<S: KvStore + ?Sized>(&mut self, store: &mut S, loc: Location, tick: u64) -> bool {
        if self.entries.contains_key(&loc) {
            return false;
        }
        let entry = SourceEntry::new(loc, tick);
        store.set(&source_key(loc.at), entry.record());
        self.entries.insert(loc, entry);
        tracing::debug!(source = %loc, "transport source registered");
        true
    }

    /// Remove a source. Returns `false` if it was not registered.
    pub fn unregister<S: KvStore + ?Sized>(&mut self, store: &mut S, loc: Location) -> bool {
        if self.entries.remove(&loc).is_none() {
            return false;
        }
        let key = source_key(loc.at);
        match self.entries.values().find(|e| e.location.at == loc.at) {
            Some(other) => store.set(&key, other.record()),
            None => store.delete(&key),
        }
        tracing::debug!(source = %loc, "transport source unregistered");
        true
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Check one location against the live world.
    pub fn check<W>(classifier: &Classifier<'_>, world: &W, loc: Location) -> Validation
    where
        W: World + ?Sized,
    {
        match world.get_cell(loc) {
            Cell::Unloaded => return Validation::Deferred,
            Cell::Empty => return Validation::Invalid(InvalidReason::Missing),
            Cell::Block(_) => {}
        }
        let Some((_, def)) = classifier.definition_at(world, loc) else {
            return Validation::Invalid(InvalidReason::Missing);
        };
        if !def.is_transport_source() {
            return Validation::Invalid(InvalidReason::WrongType);
        }

        let mut unloaded = false;
        for dir in Direction::ALL {
            let next = loc.offset(dir);
            match world.get_cell(next) {
                Cell::Unloaded => unloaded = true,
                Cell::Empty => {}
                Cell::Block(_) => {
                    let holds = classifier
                        .definition_at(world, next)
                        .is_some_and(|(_, d)| d.holds_items());
                    if holds {
                        return Validation::Valid;
                    }
                }
            }
        }
        if unloaded {
            Validation::Deferred
        } else {
            Validation::Invalid(InvalidReason::NoInventory)
        }
    }

    /// Re-check every entry and purge the ones that no longer qualify.
    ///
    /// Entries in unloaded regions are kept. With no world changes, a second
    /// call removes nothing.
    pub fn validate_all<W, S>(
        &mut self,
        classifier: &Classifier<'_>,
        world: &W,
        store: &mut S,
        tick: u64,
    ) -> ValidationReport
    where
        W: World + ?Sized,
        S: KvStore + ?Sized,
    {
        let mut report = ValidationReport::default();
        let mut refreshed = Vec::new();
        for loc in self.locations() {
            report.checked += 1;
            match Self::check(classifier, world, loc) {
                Validation::Valid => refreshed.push(loc),
                Validation::Deferred => report.deferred += 1,
                Validation::Invalid(reason) => {
                    tracing::debug!(source = %loc, ?reason, "purging transport source");
                    report.removed.push(loc);
                }
            }
        }
        for &loc in &report.removed {
            self.unregister(store, loc);
        }
        for loc in refreshed {
            if let Some(entry) = self.entries.get_mut(&loc) {
                entry.validated_at = tick;
            }
        }
        report
    }

    // -----------------------------------------------------------------------
    // Recovery
    // -----------------------------------------------------------------------

    /// Re-populate the registry from the store.
    ///
    /// Entries are loaded without validation. Corrupt keys are deleted and
    /// returned as errors for the caller to log.
    pub fn recover<W, S>(&mut self, world: &W, store: &mut S) -> RecoveryReport
    where
        W: World + ?Sized,
        S: KvStore + ?Sized,
    {
        let mut report = RecoveryReport::default();
        for key in store.list_keys(SOURCE_PREFIX) {
            match decode_entry(world, &key, store.get(&key)) {
                Ok(entry) => {
                    if !self.entries.contains_key(&entry.location) {
                        self.entries.insert(entry.location, entry);
                        report.recovered += 1;
                    }
                }
                Err(err) => {
                    store.delete(&key);
                    report.corrupted.push(err);
                }
            }
        }
        tracing::info!(
            recovered = report.recovered,
            corrupted = report.corrupted.len(),
            "transport registry recovered"
        );
        report
    }
}

fn decode_entry<W: World + ?Sized>(
    world: &W,
    key: &str,
    value: Option<Value>,
) -> Result<SourceEntry, EngineError> {
    let at = parse_source_key(key).map_err(|e| EngineError::corruption(key, e))?;
    let value = value.ok_or_else(|| EngineError::corruption(key, "missing value"))?;

    // Older entries store the bare dimension.
    let (dim, validated_at) = match &value {
        Value::Int(dim) => (*dim, 0),
        Value::Record(_) => {
            let dim = value
                .field("dimension")
                .and_then(Value::as_int)
                .ok_or_else(|| EngineError::corruption(key, "record has no dimension"))?;
            let validated_at = value.field("validated_at").and_then(Value::as_int).unwrap_or(0);
            (dim, validated_at)
        }
        other => return Err(EngineError::corruption(key, format!("unexpected value {other:?}"))),
    };

    let dim = u16::try_from(dim)
        .map(DimensionId)
        .map_err(|_| EngineError::corruption(key, format!("dimension {dim} out of range")))?;
    if !world.has_dimension(dim) {
        return Err(EngineError::corruption(key, format!("unknown dimension {dim}")));
    }
    Ok(SourceEntry::new(
        Location::new(dim, at),
        u64::try_from(validated_at).unwrap_or(0),
    ))
}
