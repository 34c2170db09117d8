//! Serde data file structs for block type definitions.
//!
//! These structs define the on-disk format of `blocks.{ron,toml,json}`. They
//! are deserialized from RON, JSON, or TOML and then resolved into
//! [`BlockTypeDef`]s by the loader.

use conduit_core::catalog::{BlockTypeDef, Capabilities, Directionality, Medium};
use serde::Deserialize;

// ===========================================================================
// Blocks
// ===========================================================================

/// A block type definition in a data file.
///
/// A block may name an earlier block in `extends`; it then starts from that
/// block's resolved definition and only the fields it sets override it.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockData {
    pub name: String,
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub roles: Vec<RoleData>,
    /// Medium carried, for conduits.
    #[serde(default)]
    pub conduit: Option<MediumData>,
    #[serde(default)]
    pub directionality: Option<DirectionalityData>,
    #[serde(default)]
    pub energy: Option<EnergyData>,
    #[serde(default)]
    pub inventory: Option<InventoryData>,
}

/// Energy role of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleData {
    Generator,
    Storage,
    Consumer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediumData {
    Energy,
    Items,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionalityData {
    Bidirectional,
    InputOnly,
    OutputOnly,
}

/// Energy buffer of a generator, storage or consumer.
#[derive(Debug, Clone, Deserialize)]
pub struct EnergyData {
    pub capacity: u64,
    #[serde(default = "default_priority")]
    pub priority: u32,
    /// Per-cycle push limit for sources.
    #[serde(default)]
    pub max_output: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryData {
    pub slots: u32,
    #[serde(default = "default_priority")]
    pub priority: u32,
    #[serde(default = "default_stack_limit")]
    pub stack_limit: u32,
}

fn default_priority() -> u32 {
    1
}

fn default_stack_limit() -> u32 {
    64
}

// ===========================================================================
// Conversion
// ===========================================================================

impl From<RoleData> for Capabilities {
    fn from(role: RoleData) -> Self {
        match role {
            RoleData::Generator => Capabilities::GENERATOR,
            RoleData::Storage => Capabilities::STORAGE,
            RoleData::Consumer => Capabilities::CONSUMER,
        }
    }
}

impl From<MediumData> for Medium {
    fn from(medium: MediumData) -> Self {
        match medium {
            MediumData::Energy => Medium::Energy,
            MediumData::Items => Medium::Items,
        }
    }
}

impl From<DirectionalityData> for Directionality {
    fn from(d: DirectionalityData) -> Self {
        match d {
            DirectionalityData::Bidirectional => Directionality::Bidirectional,
            DirectionalityData::InputOnly => Directionality::InputOnly,
            DirectionalityData::OutputOnly => Directionality::OutputOnly,
        }
    }
}

impl BlockData {
    /// Apply the fields this entry sets on top of `base`.
    pub fn apply(&self, mut base: BlockTypeDef) -> BlockTypeDef {
        base.name = self.name.clone();
        for role in &self.roles {
            base.capabilities |= Capabilities::from(*role);
        }
        if let Some(medium) = self.conduit {
            base.capabilities |= Capabilities::CONDUIT;
            base.medium = Some(medium.into());
        }
        if let Some(d) = self.directionality {
            base.directionality = d.into();
        }
        if let Some(energy) = &self.energy {
            base.energy_capacity = energy.capacity;
            base.energy_priority = energy.priority;
            base.max_output = energy.max_output;
        }
        if let Some(inv) = &self.inventory {
            base.capabilities |= Capabilities::INVENTORY;
            base.inventory_slots = inv.slots;
            base.item_priority = inv.priority;
            base.stack_limit = inv.stack_limit;
        }
        base
    }

    /// Resolve an entry without a base.
    pub fn to_def(&self) -> BlockTypeDef {
        self.apply(BlockTypeDef::new(&self.name, Capabilities::empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ron_block_with_every_section() {
        let src = r#"(
            name: "furnace",
            roles: [consumer],
            energy: Some((capacity: 200, priority: 10)),
            inventory: Some((slots: 3, priority: 10)),
        )"#;
        let data: BlockData = ron::from_str(src).unwrap();
        let def = data.to_def();
        assert_eq!(def.capabilities, Capabilities::CONSUMER | Capabilities::INVENTORY);
        assert_eq!(def.energy_capacity, 200);
        assert_eq!(def.energy_priority, 10);
        assert_eq!(def.inventory_slots, 3);
        assert_eq!(def.stack_limit, 64);
    }

    #[test]
    fn json_conduit() {
        let src = r#"{"name": "extraction_pipe", "conduit": "items", "directionality": "output_only"}"#;
        let data: BlockData = serde_json::from_str(src).unwrap();
        let def = data.to_def();
        assert!(def.capabilities.contains(Capabilities::CONDUIT));
        assert_eq!(def.medium, Some(Medium::Items));
        assert_eq!(def.directionality, Directionality::OutputOnly);
    }

    #[test]
    fn apply_overrides_only_set_fields() {
        let base: BlockData = serde_json::from_str(
            r#"{"name": "battery", "roles": ["storage"], "energy": {"capacity": 10000, "priority": 2}}"#,
        )
        .unwrap();
        let tier: BlockData = serde_json::from_str(
            r#"{"name": "battery_t2", "extends": "battery", "energy": {"capacity": 40000, "priority": 3}}"#,
        )
        .unwrap();
        let def = tier.apply(base.to_def());
        assert_eq!(def.name, "battery_t2");
        assert_eq!(def.capabilities, Capabilities::STORAGE);
        assert_eq!(def.energy_capacity, 40_000);
        assert_eq!(def.directionality, Directionality::Bidirectional);
    }

    #[test]
    fn unknown_role_is_rejected() {
        let result: Result<BlockData, _> = serde_json::from_str(r#"{"name": "x", "roles": ["reactor"]}"#);
        assert!(result.is_err());
    }
}
