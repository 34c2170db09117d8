//! Shared test helpers for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available to downstream crates via the `test-utils` feature.

use crate::catalog::{BlockCatalog, BlockTypeDef, Capabilities, CatalogBuilder, Directionality, Medium};
use crate::coord::{Coord, DimensionId, Direction, Location};
use crate::item::Inventory;
use crate::id::{BlockId, ItemKindId};
use crate::item::ItemStack;
use crate::keys::energy_key;
use crate::store::{KvStore, Value};
use crate::world::{Cell, CellState, GridWorld, World};

// ===========================================================================
// Locations
// ===========================================================================

pub const OVERWORLD: DimensionId = DimensionId(0);
pub const NETHER: DimensionId = DimensionId(1);

pub fn loc(x: i32, y: i32, z: i32) -> Location {
    Location::new(OVERWORLD, Coord::new(x, y, z))
}

// ===========================================================================
// Standard catalog
// ===========================================================================

pub const GENERATOR: &str = "generator";
pub const BATTERY: &str = "battery";
pub const BATTERY_T2: &str = "battery_t2";
pub const BATTERY_T3: &str = "battery_t3";
pub const MACHINE: &str = "machine";
pub const FURNACE: &str = "furnace";
pub const DISCHARGER: &str = "discharger";
pub const CHARGER: &str = "charger";
pub const CABLE: &str = "cable";
pub const CHEST: &str = "chest";
pub const HOPPER: &str = "hopper";
pub const ITEM_PIPE: &str = "item_pipe";
pub const EXTRACTOR: &str = "extraction_pipe";
pub const STONE: &str = "stone";

/// A catalog covering every capability and directionality combination the
/// engine distinguishes.
pub fn standard_catalog() -> BlockCatalog {
    let mut b = CatalogBuilder::new();
    let defs = [
        BlockTypeDef::new(GENERATOR, Capabilities::GENERATOR).with_energy(1_000, 1),
        BlockTypeDef::new(BATTERY, Capabilities::STORAGE).with_energy(10_000, 2),
        BlockTypeDef::new(BATTERY_T2, Capabilities::STORAGE).with_energy(40_000, 3),
        BlockTypeDef::new(BATTERY_T3, Capabilities::STORAGE).with_energy(160_000, 4),
        BlockTypeDef::new(MACHINE, Capabilities::CONSUMER).with_energy(100, 1),
        BlockTypeDef::new(FURNACE, Capabilities::CONSUMER)
            .with_energy(200, 10)
            .with_inventory(3, 10),
        BlockTypeDef::new(DISCHARGER, Capabilities::STORAGE)
            .with_energy(5_000, 2)
            .with_directionality(Directionality::OutputOnly),
        BlockTypeDef::new(CHARGER, Capabilities::STORAGE)
            .with_energy(5_000, 2)
            .with_directionality(Directionality::InputOnly),
        BlockTypeDef::conduit(CABLE, Medium::Energy, Directionality::Bidirectional),
        BlockTypeDef::new(CHEST, Capabilities::empty()).with_inventory(27, 5),
        BlockTypeDef::new(HOPPER, Capabilities::empty()).with_inventory(5, 1),
        BlockTypeDef::conduit(ITEM_PIPE, Medium::Items, Directionality::Bidirectional),
        BlockTypeDef::conduit(EXTRACTOR, Medium::Items, Directionality::OutputOnly),
        BlockTypeDef::new(STONE, Capabilities::empty()),
    ];
    for def in defs {
        b.register(def).expect("standard catalog names are unique");
    }
    b.build().expect("standard catalog is valid")
}

// ===========================================================================
// World helpers
// ===========================================================================

/// Place a catalogued block by name.
pub fn place(world: &mut GridWorld, catalog: &BlockCatalog, at: Location, name: &str) -> BlockId {
    let id = catalog.id(name).expect("block name in catalog");
    let def = catalog.get(id).expect("block id in catalog");
    world.place_def(at, id, def).expect("location is free")
}

/// Place `len` blocks in a straight line starting at `start`.
pub fn line(
    world: &mut GridWorld,
    catalog: &BlockCatalog,
    start: Location,
    dir: Direction,
    len: usize,
    name: &str,
) -> Vec<Location> {
    let mut at = start;
    let mut placed = Vec::with_capacity(len);
    for _ in 0..len {
        place(world, catalog, at, name);
        placed.push(at);
        at = at.offset(dir);
    }
    placed
}

// ===========================================================================
// Items
// ===========================================================================

pub fn cobblestone() -> ItemKindId {
    ItemKindId(0)
}
pub fn iron_ingot() -> ItemKindId {
    ItemKindId(1)
}

/// Put a stack into a slot of the inventory at `at`.
pub fn fill(world: &mut GridWorld, at: Location, slot: usize, kind: ItemKindId, count: u32) {
    world
        .inventory_mut(at)
        .expect("inventory at location")
        .set_slot(slot, Some(ItemStack::new(kind, count)));
}

/// Sum of items held at the given locations.
pub fn total_items<W: World>(world: &W, at: &[Location]) -> u32 {
    at.iter()
        .filter_map(|l| world.inventory(*l))
        .map(|inv| inv.total())
        .sum()
}

// ===========================================================================
// Fault injection
// ===========================================================================

/// What [`FaultyWorld`] does on the second mutable access to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The inventory is unreachable.
    Vanish,
    /// Every slot now holds one unit of this kind.
    Swap(ItemKindId),
}

/// A [`GridWorld`] whose inventory at `target` misbehaves after the first
/// mutable access, as when another system edits it mid-transfer.
#[derive(Debug)]
pub struct FaultyWorld {
    pub inner: GridWorld,
    target: Location,
    fault: Fault,
    accesses: usize,
}

impl FaultyWorld {
    pub fn new(inner: GridWorld, target: Location, fault: Fault) -> Self {
        Self {
            inner,
            target,
            fault,
            accesses: 0,
        }
    }
}

impl World for FaultyWorld {
    fn get_cell(&self, loc: Location) -> Cell {
        self.inner.get_cell(loc)
    }

    fn inventory(&self, loc: Location) -> Option<&Inventory> {
        self.inner.inventory(loc)
    }

    fn inventory_mut(&mut self, loc: Location) -> Option<&mut Inventory> {
        if loc != self.target {
            return self.inner.inventory_mut(loc);
        }
        self.accesses += 1;
        if self.accesses < 2 {
            return self.inner.inventory_mut(loc);
        }
        match self.fault {
            Fault::Vanish => None,
            Fault::Swap(kind) => {
                let inv = self.inner.inventory_mut(loc)?;
                for slot in 0..inv.slots().len() {
                    inv.set_slot(slot, Some(ItemStack::new(kind, 1)));
                }
                Some(inv)
            }
        }
    }

    fn set_cell_state(&mut self, loc: Location, state: CellState) -> bool {
        self.inner.set_cell_state(loc, state)
    }

    fn has_dimension(&self, dim: DimensionId) -> bool {
        self.inner.has_dimension(dim)
    }

    fn actor_positions(&self) -> Vec<Location> {
        self.inner.actor_positions()
    }
}

// ===========================================================================
// Energy
// ===========================================================================

pub fn set_energy<S: KvStore>(store: &mut S, at: Location, amount: u64) {
    store.set(&energy_key(at), Value::Int(amount as i64));
}

pub fn energy<S: KvStore>(store: &S, at: Location) -> u64 {
    store
        .get(&energy_key(at))
        .and_then(|v| v.as_int())
        .unwrap_or(0) as u64
}
