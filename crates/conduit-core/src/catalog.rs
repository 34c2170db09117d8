//! Block type catalog: the static table of what every block type can do.
//!
//! Capabilities are an explicit bitset computed once per type at catalog
//! build time. Classification never inspects names or tags at runtime.

use crate::id::BlockTypeId;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

bitflags! {
    /// What a block can do within a resource network.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Capabilities: u8 {
        const GENERATOR = 1 << 0;
        const STORAGE   = 1 << 1;
        const CONSUMER  = 1 << 2;
        const CONDUIT   = 1 << 3;
        const INVENTORY = 1 << 4;
    }
}

impl Capabilities {
    /// Capabilities that carry an energy amount.
    pub const ENERGY: Capabilities = Capabilities::GENERATOR
        .union(Capabilities::STORAGE)
        .union(Capabilities::CONSUMER);
}

/// Which way a block lets resources flow. Absent a restriction, both ways.
///
/// Applies to terminal blocks and to item conduits, where `OutputOnly` marks
/// a transport source. Energy conduits are always bidirectional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Directionality {
    #[default]
    Bidirectional,
    InputOnly,
    OutputOnly,
}

/// What a conduit carries. Energy cables and item pipes form separate networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Medium {
    Energy,
    Items,
}

// ---------------------------------------------------------------------------
// Classifiable
// ---------------------------------------------------------------------------

/// Capability queries shared by block type definitions and classified nodes.
pub trait Classifiable {
    fn capabilities(&self) -> Capabilities;
    fn directionality(&self) -> Directionality;
    /// Medium carried, for conduits. `None` for terminal blocks.
    fn medium(&self) -> Option<Medium>;

    fn is_conduit(&self) -> bool {
        self.capabilities().contains(Capabilities::CONDUIT)
    }

    /// A non-conduit block with at least one capability.
    fn is_terminal(&self) -> bool {
        !self.is_conduit() && !self.capabilities().is_empty()
    }

    /// Can act as an energy source. `InputOnly` blocks never output.
    fn outputs_energy(&self) -> bool {
        self.capabilities()
            .intersects(Capabilities::GENERATOR | Capabilities::STORAGE)
            && self.directionality() != Directionality::InputOnly
    }

    /// Can receive energy. `OutputOnly` blocks never accept input.
    fn accepts_energy(&self) -> bool {
        self.capabilities()
            .intersects(Capabilities::STORAGE | Capabilities::CONSUMER)
            && self.directionality() != Directionality::OutputOnly
    }

    fn holds_items(&self) -> bool {
        self.capabilities().contains(Capabilities::INVENTORY)
    }

    /// Can receive items. `OutputOnly` inventories are never insertion targets.
    fn accepts_items(&self) -> bool {
        self.holds_items() && self.directionality() != Directionality::OutputOnly
    }

    /// An output-class item conduit: the block the item router pulls through.
    fn is_transport_source(&self) -> bool {
        self.is_conduit()
            && self.medium() == Some(Medium::Items)
            && self.directionality() == Directionality::OutputOnly
    }

    /// Whether a cell takes part in a network of the given medium.
    fn joins(&self, medium: Medium) -> bool {
        if self.is_conduit() {
            return self.medium() == Some(medium);
        }
        match medium {
            Medium::Energy => self.capabilities().intersects(Capabilities::ENERGY),
            Medium::Items => self.holds_items(),
        }
    }
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// A block type definition in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTypeDef {
    pub name: String,
    pub capabilities: Capabilities,
    #[serde(default)]
    pub directionality: Directionality,
    /// Set for conduits only.
    #[serde(default)]
    pub medium: Option<Medium>,
    /// Maximum stored energy. Zero for blocks without energy capabilities.
    #[serde(default)]
    pub energy_capacity: u64,
    /// Maximum energy a source pushes per distribution cycle.
    /// `None` means its whole buffer.
    #[serde(default)]
    pub max_output: Option<u64>,
    /// Receiver ordering for energy. Higher goes first.
    #[serde(default = "default_priority")]
    pub energy_priority: u32,
    /// Receiver ordering for items. Higher goes first.
    #[serde(default = "default_priority")]
    pub item_priority: u32,
    /// Slot count for inventory holders.
    #[serde(default)]
    pub inventory_slots: u32,
    #[serde(default = "default_stack_limit")]
    pub stack_limit: u32,
}

fn default_priority() -> u32 {
    1
}

fn default_stack_limit() -> u32 {
    64
}

impl BlockTypeDef {
    /// A definition with the given capabilities and every other field at its default.
    pub fn new(name: &str, capabilities: Capabilities) -> Self {
        Self {
            name: name.to_string(),
            capabilities,
            directionality: Directionality::Bidirectional,
            medium: None,
            energy_capacity: 0,
            max_output: None,
            energy_priority: default_priority(),
            item_priority: default_priority(),
            inventory_slots: 0,
            stack_limit: default_stack_limit(),
        }
    }

    pub fn conduit(name: &str, medium: Medium, directionality: Directionality) -> Self {
        Self {
            medium: Some(medium),
            directionality,
            ..Self::new(name, Capabilities::CONDUIT)
        }
    }

    pub fn with_energy(mut self, capacity: u64, priority: u32) -> Self {
        self.energy_capacity = capacity;
        self.energy_priority = priority;
        self
    }

    pub fn with_max_output(mut self, max_output: u64) -> Self {
        self.max_output = Some(max_output);
        self
    }

    pub fn with_inventory(mut self, slots: u32, item_priority: u32) -> Self {
        self.capabilities |= Capabilities::INVENTORY;
        self.inventory_slots = slots;
        self.item_priority = item_priority;
        self
    }

    pub fn with_directionality(mut self, directionality: Directionality) -> Self {
        self.directionality = directionality;
        self
    }
}

impl Classifiable for BlockTypeDef {
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

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Errors from building or mutating a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("block type not found: {0}")]
    NotFound(String),
    #[error("duplicate block type: {0}")]
    Duplicate(String),
    #[error("block type '{0}' is a conduit without a medium")]
    ConduitWithoutMedium(String),
    #[error("block type '{0}' has a medium but is not a conduit")]
    MediumWithoutConduit(String),
    #[error("block type '{0}' holds items but has no slots")]
    InventoryWithoutSlots(String),
    #[error("energy conduit '{0}' must be bidirectional")]
    DirectionalEnergyConduit(String),
}

/// Builder for an immutable [`BlockCatalog`].
/// Three-phase lifecycle: registration -> mutation -> finalization.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    blocks: Vec<BlockTypeDef>,
    name_to_id: HashMap<String, BlockTypeId>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase 1: Register a block type. Returns its ID.
    pub fn register(&mut self, def: BlockTypeDef) -> Result<BlockTypeId, CatalogError> {
        if self.name_to_id.contains_key(&def.name) {
            return Err(CatalogError::Duplicate(def.name));
        }
        let id = BlockTypeId(self.blocks.len() as u32);
        self.name_to_id.insert(def.name.clone(), id);
        self.blocks.push(def);
        Ok(id)
    }

    /// Phase 2: Mutate an existing block type by name.
    pub fn mutate<F>(&mut self, name: &str, f: F) -> Result<(), CatalogError>
    where
        F: FnOnce(&mut BlockTypeDef),
    {
        let id = self
            .name_to_id
            .get(name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;
        f(&mut self.blocks[id.0 as usize]);
        Ok(())
    }

    pub fn id(&self, name: &str) -> Option<BlockTypeId> {
        self.name_to_id.get(name).copied()
    }

    /// Phase 3: Validate and freeze.
    pub fn build(self) -> Result<BlockCatalog, CatalogError> {
        for def in &self.blocks {
            let conduit = def.capabilities.contains(Capabilities::CONDUIT);
            if conduit && def.medium.is_none() {
                return Err(CatalogError::ConduitWithoutMedium(def.name.clone()));
            }
            if !conduit && def.medium.is_some() {
                return Err(CatalogError::MediumWithoutConduit(def.name.clone()));
            }
            // Cables have no flow direction; only item sources and terminals do.
            if def.medium == Some(Medium::Energy) && def.directionality != Directionality::Bidirectional {
                return Err(CatalogError::DirectionalEnergyConduit(def.name.clone()));
            }
            if def.capabilities.contains(Capabilities::INVENTORY) && def.inventory_slots == 0 {
                return Err(CatalogError::InventoryWithoutSlots(def.name.clone()));
            }
        }
        Ok(BlockCatalog {
            blocks: self.blocks,
            name_to_id: self.name_to_id,
        })
    }
}

/// Immutable catalog. Frozen after build().
#[derive(Debug, Clone)]
pub struct BlockCatalog {
    blocks: Vec<BlockTypeDef>,
    name_to_id: HashMap<String, BlockTypeId>,
}

impl BlockCatalog {
    pub fn get(&self, id: BlockTypeId) -> Option<&BlockTypeDef> {
        self.blocks.get(id.0 as usize)
    }

    pub fn id(&self, name: &str) -> Option<BlockTypeId> {
        self.name_to_id.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockTypeId, &BlockTypeDef)> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(i, def)| (BlockTypeId(i as u32), def))
    }
}
