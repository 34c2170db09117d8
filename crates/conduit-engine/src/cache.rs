//! Active-node cache: the energy-bearing blocks evaluated on distribution ticks.
//!
//! Reconciled with the persisted energy keys every cache-refresh interval,
//! and patched in between by placement and removal events. Reconciling keeps
//! surviving entries in place, so evaluation order is placement order.

use conduit_core::coord::{DimensionId, Location};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct ActiveCache {
    dims: BTreeMap<DimensionId, Vec<Location>>,
    members: HashSet<Location>,
}

impl ActiveCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a location. Returns `false` if it was already cached.
    pub fn insert(&mut self, loc: Location) -> bool {
        if !self.members.insert(loc) {
            return false;
        }
        self.dims.entry(loc.dim).or_default().push(loc);
        true
    }

    pub fn remove(&mut self, loc: Location) -> bool {
        if !self.members.remove(&loc) {
            return false;
        }
        if let Some(list) = self.dims.get_mut(&loc.dim) {
            list.retain(|l| *l != loc);
        }
        true
    }

    pub fn contains(&self, loc: Location) -> bool {
        self.members.contains(&loc)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Drop every location `keep` rejects. Survivors keep their order.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(Location) -> bool,
    {
        let members = &mut self.members;
        for list in self.dims.values_mut() {
            list.retain(|l| {
                let kept = keep(*l);
                if !kept {
                    members.remove(l);
                }
                kept
            });
        }
        self.dims.retain(|_, list| !list.is_empty());
    }

    /// Cached locations, by dimension, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Location> + '_ {
        self.dims.values().flat_map(|list| list.iter().copied())
    }
}
