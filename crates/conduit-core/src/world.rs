//! World query interface and an in-memory voxel world.
//!
//! The world is authoritative for what block sits where. The engine only
//! ever holds transient views of it, so every query answers for the current
//! instant and unloaded regions answer [`Cell::Unloaded`] instead of failing.
//!
//! [`GridWorld`] is the reference implementation: a slot map of live blocks
//! plus a sorted spatial index from [`Location`] to [`BlockId`].

use crate::catalog::{BlockTypeDef, Classifiable};
use crate::coord::{ChunkPos, DimensionId, Direction, Location};
use crate::id::{BlockId, BlockTypeId};
use crate::item::Inventory;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::collections::{BTreeMap, BTreeSet, HashSet};

// ---------------------------------------------------------------------------
// Interface
// ---------------------------------------------------------------------------

/// The result of looking at one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    /// Not currently readable (chunk not resident, unknown dimension).
    /// Callers treat this as "unknown" and retry on a later tick.
    Unloaded,
    /// Loaded and empty.
    Empty,
    Block(BlockTypeId),
}

/// Per-block display state the engine may toggle (e.g. a pipe that just moved
/// an item). Purely cosmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CellState {
    #[default]
    Idle,
    Active,
}

/// World queries the engine depends on. Implementations must never panic on
/// an unloaded or invalid location.
pub trait World {
    fn get_cell(&self, loc: Location) -> Cell;

    fn adjacent(&self, loc: Location, dir: Direction) -> Cell {
        self.get_cell(loc.offset(dir))
    }

    fn inventory(&self, loc: Location) -> Option<&Inventory>;

    fn inventory_mut(&mut self, loc: Location) -> Option<&mut Inventory>;

    /// Set the display state of a block. Returns `false` if no block is there.
    fn set_cell_state(&mut self, loc: Location, state: CellState) -> bool;

    fn has_dimension(&self, dim: DimensionId) -> bool;

    /// Positions of connected actors (players), used to centre region scans.
    fn actor_positions(&self) -> Vec<Location> {
        Vec::new()
    }
}

// ---------------------------------------------------------------------------
// GridWorld
// ---------------------------------------------------------------------------

/// Errors from placing or removing blocks.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    #[error("location {0} is occupied")]
    Occupied(Location),
    #[error("no block at {0}")]
    NotPlaced(Location),
    #[error("unknown dimension {0}")]
    UnknownDimension(DimensionId),
}

/// A live block in the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub location: Location,
    pub block_type: BlockTypeId,
    pub inventory: Option<Inventory>,
    pub state: CellState,
}

/// In-memory voxel world.
#[derive(Debug, Default)]
pub struct GridWorld {
    blocks: SlotMap<BlockId, Block>,
    index: BTreeMap<Location, BlockId>,
    dimensions: BTreeSet<DimensionId>,
    unloaded: HashSet<(DimensionId, ChunkPos)>,
    actors: Vec<Location>,
}

impl GridWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// A world with the given dimensions registered.
    pub fn with_dimensions(dims: impl IntoIterator<Item = DimensionId>) -> Self {
        let mut world = Self::new();
        for dim in dims {
            world.add_dimension(dim);
        }
        world
    }

    pub fn add_dimension(&mut self, dim: DimensionId) {
        self.dimensions.insert(dim);
    }

    // -- Placement --

    /// Place a block. Blocks that hold items get the inventory passed in.
    pub fn place(
        &mut self,
        location: Location,
        block_type: BlockTypeId,
        inventory: Option<Inventory>,
    ) -> Result<BlockId, SpatialError> {
        if !self.dimensions.contains(&location.dim) {
            return Err(SpatialError::UnknownDimension(location.dim));
        }
        if self.index.contains_key(&location) {
            return Err(SpatialError::Occupied(location));
        }
        let id = self.blocks.insert(Block {
            location,
            block_type,
            inventory,
            state: CellState::Idle,
        });
        self.index.insert(location, id);
        Ok(id)
    }

    /// Place a block, creating an empty inventory sized from its definition.
    pub fn place_def(
        &mut self,
        location: Location,
        block_type: BlockTypeId,
        def: &BlockTypeDef,
    ) -> Result<BlockId, SpatialError> {
        let inventory = def
            .holds_items()
            .then(|| Inventory::new(def.inventory_slots as usize, def.stack_limit));
        self.place(location, block_type, inventory)
    }

    /// Remove the block at a location. Returns it.
    pub fn remove(&mut self, location: Location) -> Result<Block, SpatialError> {
        let id = self
            .index
            .remove(&location)
            .ok_or(SpatialError::NotPlaced(location))?;
        self.blocks
            .remove(id)
            .ok_or(SpatialError::NotPlaced(location))
    }

    // -- Point queries --

    pub fn block_at(&self, location: Location) -> Option<BlockId> {
        self.index.get(&location).copied()
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    // -- Loading --

    pub fn unload_chunk(&mut self, dim: DimensionId, chunk: ChunkPos) {
        self.unloaded.insert((dim, chunk));
    }

    pub fn load_chunk(&mut self, dim: DimensionId, chunk: ChunkPos) {
        self.unloaded.remove(&(dim, chunk));
    }

    pub fn is_loaded(&self, location: Location) -> bool {
        self.dimensions.contains(&location.dim)
            && !self.unloaded.contains(&(location.dim, location.at.chunk()))
    }

    // -- Actors --

    pub fn set_actors(&mut self, actors: Vec<Location>) {
        self.actors = actors;
    }

    // -- Stats --

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn loaded_block(&self, location: Location) -> Option<&Block> {
        if !self.is_loaded(location) {
            return None;
        }
        self.block_at(location).and_then(|id| self.blocks.get(id))
    }
}

impl World for GridWorld {
    fn get_cell(&self, loc: Location) -> Cell {
        if !self.is_loaded(loc) {
            return Cell::Unloaded;
        }
        match self.block_at(loc).and_then(|id| self.blocks.get(id)) {
            Some(block) => Cell::Block(block.block_type),
            None => Cell::Empty,
        }
    }

    fn inventory(&self, loc: Location) -> Option<&Inventory> {
        self.loaded_block(loc).and_then(|b| b.inventory.as_ref())
    }

    fn inventory_mut(&mut self, loc: Location) -> Option<&mut Inventory> {
        if !self.is_loaded(loc) {
            return None;
        }
        let id = self.block_at(loc)?;
        self.blocks.get_mut(id).and_then(|b| b.inventory.as_mut())
    }

    fn set_cell_state(&mut self, loc: Location, state: CellState) -> bool {
        if !self.is_loaded(loc) {
            return false;
        }
        let Some(id) = self.block_at(loc) else {
            return false;
        };
        match self.blocks.get_mut(id) {
            Some(block) => {
                block.state = state;
                true
            }
            None => false,
        }
    }

    fn has_dimension(&self, dim: DimensionId) -> bool {
        self.dimensions.contains(&dim)
    }

    fn actor_positions(&self) -> Vec<Location> {
        self.actors.clone()
    }
}
