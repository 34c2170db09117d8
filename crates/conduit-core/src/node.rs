//! Node classification: turning a world cell into a capability-bearing view.
//!
//! A [`Node`] is recomputed from live world state every time it is needed
//! and never cached across ticks. Only the energy amount (read from the
//! durable store) and registry membership outlive a single operation.

use crate::catalog::{BlockCatalog, BlockTypeDef, Capabilities, Classifiable, Directionality, Medium};
use crate::coord::Location;
use crate::id::BlockTypeId;
use crate::keys::energy_key;
use crate::store::{KvStore, Value};
use crate::world::{Cell, World};

/// Stored energy and its ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnergyLevel {
    pub amount: u64,
    pub capacity: u64,
}

impl EnergyLevel {
    /// Room left before the node is full.
    pub fn needed(&self) -> u64 {
        self.capacity.saturating_sub(self.amount)
    }
}

/// A classified view of one world cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub location: Location,
    pub block_type: BlockTypeId,
    pub capabilities: Capabilities,
    pub directionality: Directionality,
    pub medium: Option<Medium>,
    /// Present for blocks with any energy capability.
    pub energy: Option<EnergyLevel>,
    pub energy_priority: u32,
    pub item_priority: u32,
}

impl Classifiable for Node {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
    fn directionality(&self) -> Directionality {
        self.directionality
    }
    fn medium(&self) -> Option<Medium> {
        self.medium
    }
}

/// Classifies world cells against a frozen [`BlockCatalog`].
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    catalog: &'a BlockCatalog,
}

impl<'a> Classifier<'a> {
    pub fn new(catalog: &'a BlockCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'a BlockCatalog {
        self.catalog
    }

    /// The block type and definition at a location, without touching the
    /// store. `None` for unloaded, empty, or uncatalogued cells.
    pub fn definition_at<W>(&self, world: &W, loc: Location) -> Option<(BlockTypeId, &'a BlockTypeDef)>
    where
        W: World + ?Sized,
    {
        match world.get_cell(loc) {
            Cell::Block(block_type) => {
                let def = self.catalog.get(block_type);
                if def.is_none() {
                    tracing::debug!(%loc, ?block_type, "block type missing from catalog");
                }
                def.map(|d| (block_type, d))
            }
            Cell::Unloaded | Cell::Empty => None,
        }
    }

    /// Classify the cell at `loc`.
    ///
    /// Returns `None` when the cell is unloaded, empty, or not in the catalog.
    /// An unreadable cell is "currently unknown", never an error.
    pub fn classify<W, S>(&self, world: &W, store: &S, loc: Location) -> Option<Node>
    where
        W: World + ?Sized,
        S: KvStore + ?Sized,
    {
        let (block_type, def) = self.definition_at(world, loc)?;
        let energy = def
            .capabilities
            .intersects(Capabilities::ENERGY)
            .then(|| EnergyLevel {
                amount: stored_amount(store, loc, def.energy_capacity),
                capacity: def.energy_capacity,
            });
        Some(Node {
            location: loc,
            block_type,
            capabilities: def.capabilities,
            directionality: def.directionality,
            medium: def.medium,
            energy,
            energy_priority: def.energy_priority,
            item_priority: def.item_priority,
        })
    }
}

/// Read a persisted energy amount, clamped into `[0, capacity]`.
pub fn stored_amount<S: KvStore + ?Sized>(store: &S, loc: Location, capacity: u64) -> u64 {
    match store.get(&energy_key(loc)) {
        Some(Value::Int(v)) => (v.max(0) as u64).min(capacity),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{ChunkPos, Coord, DimensionId};
    use crate::store::MemoryStore;
    use crate::test_utils::*;
    use crate::world::GridWorld;

    #[test]
    fn classify_generator_reads_store() {
        let catalog = standard_catalog();
        let mut world = GridWorld::with_dimensions([OVERWORLD]);
        let mut store = MemoryStore::new();
        let at = loc(0, 0, 0);
        place(&mut world, &catalog, at, GENERATOR);
        store.set(&energy_key(at), Value::Int(250));

        let node = Classifier::new(&catalog).classify(&world, &store, at).unwrap();
        assert!(node.outputs_energy());
        assert!(!node.accepts_energy());
        assert_eq!(node.energy.unwrap().amount, 250);
    }

    #[test]
    fn classify_clamps_corrupt_amounts() {
        let catalog = standard_catalog();
        let mut world = GridWorld::with_dimensions([OVERWORLD]);
        let mut store = MemoryStore::new();
        let high = loc(0, 0, 0);
        let low = loc(1, 0, 0);
        place(&mut world, &catalog, high, BATTERY);
        place(&mut world, &catalog, low, BATTERY);
        store.set(&energy_key(high), Value::Int(i64::MAX));
        store.set(&energy_key(low), Value::Int(-40));

        let classifier = Classifier::new(&catalog);
        let h = classifier.classify(&world, &store, high).unwrap().energy.unwrap();
        let l = classifier.classify(&world, &store, low).unwrap().energy.unwrap();
        assert_eq!(h.amount, h.capacity);
        assert_eq!(l.amount, 0);
    }

    #[test]
    fn classify_conduit_has_no_energy() {
        let catalog = standard_catalog();
        let mut world = GridWorld::with_dimensions([OVERWORLD]);
        place(&mut world, &catalog, loc(0, 0, 0), CABLE);
        let node = Classifier::new(&catalog)
            .classify(&world, &MemoryStore::new(), loc(0, 0, 0))
            .unwrap();
        assert!(node.is_conduit());
        assert_eq!(node.medium, Some(Medium::Energy));
        assert!(node.energy.is_none());
    }

    #[test]
    fn classify_unloaded_and_empty_is_none() {
        let catalog = standard_catalog();
        let mut world = GridWorld::with_dimensions([OVERWORLD]);
        place(&mut world, &catalog, loc(0, 0, 0), CHEST);
        world.unload_chunk(OVERWORLD, ChunkPos::new(0, 0));

        let classifier = Classifier::new(&catalog);
        let store = MemoryStore::new();
        assert!(classifier.classify(&world, &store, loc(0, 0, 0)).is_none());
        assert!(classifier.classify(&world, &store, loc(100, 0, 0)).is_none());
        let elsewhere = Location::new(DimensionId(9), Coord::new(0, 0, 0));
        assert!(classifier.classify(&world, &store, elsewhere).is_none());
    }

    #[test]
    fn uncatalogued_block_is_none() {
        let catalog = standard_catalog();
        let mut world = GridWorld::with_dimensions([OVERWORLD]);
        world.place(loc(0, 0, 0), BlockTypeId(999), None).unwrap();
        let classifier = Classifier::new(&catalog);
        assert!(classifier.classify(&world, &MemoryStore::new(), loc(0, 0, 0)).is_none());
    }

    #[test]
    fn energy_level_needed() {
        let level = EnergyLevel { amount: 30, capacity: 100 };
        assert_eq!(level.needed(), 70);
        let full = EnergyLevel { amount: 100, capacity: 100 };
        assert_eq!(full.needed(), 0);
    }
}
