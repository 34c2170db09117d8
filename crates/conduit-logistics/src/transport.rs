//! Discrete item transport.
//!
//! Each registered source is an output item conduit that pulls from the
//! inventories touching it. One transport cycle moves at most one item per
//! network: sources sharing a network take turns through the
//! [`FairnessIndex`], and each source takes turns over its own faces.
//!
//! Items are never created or destroyed. A unit that finds no receiver goes
//! back to the slot it came from; if that fails the unit of work aborts with
//! an invariant violation.

use crate::fairness::{rotation, FairnessIndex};
use crate::registry::{TransportRegistry, Validation};
use conduit_core::catalog::{BlockCatalog, Classifiable, Directionality, Medium};
use conduit_core::config::ItemConfig;
use conduit_core::coord::{Direction, Location};
use conduit_core::discovery::{discover, network_anchor, DiscoveryOptions, Network};
use conduit_core::error::EngineError;
use conduit_core::item::ItemStack;
use conduit_core::node::Classifier;
use conduit_core::store::KvStore;
use conduit_core::world::{CellState, World};
use std::collections::BTreeMap;

/// Counters for one transport cycle.
#[derive(Debug, Default)]
pub struct TransportReport {
    /// Sources that got a turn.
    pub attempted: usize,
    pub moved: u64,
    /// Units put back into their origin slot.
    pub returned: u64,
    pub failures: usize,
    pub invariant_violations: usize,
    pub truncated_discoveries: usize,
    /// Contained errors, for the caller to log.
    pub errors: Vec<EngineError>,
}

/// Where one unit went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub from: Location,
    pub face: Direction,
    pub to: Location,
}

/// Outcome of one source's turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceOutcome {
    pub delivered: Option<Delivery>,
    pub returned: u64,
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ItemTransport<'a> {
    classifier: Classifier<'a>,
    max_nodes: usize,
    visit_limit: usize,
    anchor_cap: usize,
}

impl<'a> ItemTransport<'a> {
    pub fn new(catalog: &'a BlockCatalog, config: &ItemConfig) -> Self {
        Self {
            classifier: Classifier::new(catalog),
            max_nodes: config.max_nodes,
            visit_limit: config.visit_limit,
            anchor_cap: config.anchor_cap,
        }
    }

    /// Registered sources grouped by network anchor. Group order and the
    /// order inside each group follow registry order.
    pub fn group_sources<W>(&self, world: &W, registry: &TransportRegistry) -> BTreeMap<Location, Vec<Location>>
    where
        W: World + ?Sized,
    {
        let mut groups: BTreeMap<Location, Vec<Location>> = BTreeMap::new();
        for entry in registry.iter() {
            let anchor = network_anchor(
                &self.classifier,
                world,
                entry.location,
                Medium::Items,
                self.anchor_cap,
            );
            groups.entry(anchor).or_default().push(entry.location);
        }
        groups
    }

    /// Run one transport cycle over every registered source.
    ///
    /// Within a network, sources are tried in rotated order until one moves
    /// an item; that source becomes the last in line for the next cycle.
    /// Errors are contained to the source that raised them.
    pub fn run<W, S>(
        &self,
        world: &mut W,
        store: &S,
        registry: &mut TransportRegistry,
        fairness: &mut FairnessIndex,
    ) -> TransportReport
    where
        W: World + ?Sized,
        S: KvStore + ?Sized,
    {
        let mut report = TransportReport::default();

        for (anchor, group) in self.group_sources(&*world, registry) {
            let start = fairness.offset(anchor, group.len());
            for idx in rotation(start, group.len()) {
                let source = group[idx];
                if TransportRegistry::check(&self.classifier, &*world, source) != Validation::Valid {
                    continue;
                }
                let first_face = registry.get(source).map_or(0, |e| e.next_face);
                report.attempted += 1;

                match self.transfer_one(world, store, source, first_face) {
                    Ok(outcome) => {
                        report.returned += outcome.returned;
                        if outcome.truncated {
                            report.truncated_discoveries += 1;
                        }
                        if let Some(delivery) = outcome.delivered {
                            report.moved += 1;
                            registry.advance_face(source, delivery.face);
                            fairness.advance(anchor, idx, group.len());
                            world.set_cell_state(source, CellState::Active);
                            break;
                        }
                        world.set_cell_state(source, CellState::Idle);
                    }
                    Err(err) => {
                        report.failures += 1;
                        if err.is_invariant_violation() {
                            report.invariant_violations += 1;
                        }
                        report.errors.push(err);
                    }
                }
            }
        }
        report
    }

    /// Try to move one item from an inventory adjacent to `source` into the
    /// source's network, starting with face `first_face`.
    ///
    /// Faces are tried in rotated order; the first one whose item is accepted
    /// somewhere ends the turn.
    pub fn transfer_one<W, S>(
        &self,
        world: &mut W,
        store: &S,
        source: Location,
        first_face: usize,
    ) -> Result<SourceOutcome, EngineError>
    where
        W: World + ?Sized,
        S: KvStore + ?Sized,
    {
        let options = DiscoveryOptions::new(Medium::Items, self.max_nodes)
            .with_visit_limit(self.visit_limit)
            .excluding_seed();
        let network = discover(&self.classifier, &*world, store, source, options);
        let mut outcome = SourceOutcome {
            truncated: network.is_truncated(),
            ..SourceOutcome::default()
        };

        for i in rotation(first_face, Direction::ALL.len()) {
            let face = Direction::ALL[i];
            let origin = source.offset(face);
            if !self.extractable(&*world, origin) {
                continue;
            }
            let Some((slot, unit)) = world.inventory_mut(origin).and_then(|inv| inv.take_one()) else {
                continue;
            };

            let inserted = self.insert_into_network(world, &network, origin, unit);
            let returned = if inserted.is_none() {
                world
                    .inventory_mut(origin)
                    .ok_or(EngineError::TransientWorldAccess(origin))?
                    .restore(slot, unit)?;
                1
            } else {
                0
            };

            let extracted = u64::from(unit.count);
            let placed = u64::from(inserted.is_some());
            if extracted != placed + returned {
                return Err(EngineError::InvariantViolation(format!(
                    "item conservation at {source}: extracted {extracted}, inserted {placed}, returned {returned}"
                )));
            }
            outcome.returned += returned;

            if let Some(to) = inserted {
                tracing::debug!(from = %origin, via = %source, %to, kind = unit.kind.0, "item transfer");
                outcome.delivered = Some(Delivery { from: origin, face, to });
                return Ok(outcome);
            }
        }
        Ok(outcome)
    }

    fn extractable<W: World + ?Sized>(&self, world: &W, loc: Location) -> bool {
        self.classifier
            .definition_at(world, loc)
            .is_some_and(|(_, def)| def.holds_items() && def.directionality != Directionality::InputOnly)
    }

    /// Insert `unit` into the highest-priority receiver that takes all of it.
    fn insert_into_network<W>(&self, world: &mut W, network: &Network, origin: Location, unit: ItemStack) -> Option<Location>
    where
        W: World + ?Sized,
    {
        let mut receivers: Vec<(Location, u32)> = network
            .iter()
            .filter(|node| node.location != origin && node.accepts_items())
            .map(|node| (node.location, node.item_priority))
            .collect();
        // Stable: equal priorities keep discovery order.
        receivers.sort_by(|a, b| b.1.cmp(&a.1));

        for (to, _) in receivers {
            let Some(inv) = world.inventory_mut(to) else {
                continue;
            };
            if inv.can_accept(&unit) && inv.insert(unit) == 0 {
                return Some(to);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::store::MemoryStore;
    use conduit_core::test_utils::*;
    use conduit_core::world::GridWorld;

    fn setup() -> (BlockCatalog, GridWorld, MemoryStore) {
        (standard_catalog(), GridWorld::with_dimensions([OVERWORLD]), MemoryStore::new())
    }

    #[test]
    fn moves_one_item_per_cycle() {
        let (catalog, mut world, mut store) = setup();
        let source = loc(0, 1, 0);
        place(&mut world, &catalog, source, EXTRACTOR);
        place(&mut world, &catalog, loc(0, 0, 0), CHEST);
        line(&mut world, &catalog, loc(1, 1, 0), Direction::East, 3, ITEM_PIPE);
        place(&mut world, &catalog, loc(4, 1, 0), HOPPER);
        fill(&mut world, loc(0, 0, 0), 0, cobblestone(), 10);

        let mut registry = TransportRegistry::new();
        registry.register(&mut store, source, 0);
        let mut fairness = FairnessIndex::new();
        let transport = ItemTransport::new(&catalog, &ItemConfig::default());

        let report = transport.run(&mut world, &store, &mut registry, &mut fairness);
        assert_eq!(report.moved, 1);
        assert_eq!(report.failures, 0);
        assert_eq!(total_items(&world, &[loc(0, 0, 0)]), 9);
        assert_eq!(total_items(&world, &[loc(4, 1, 0)]), 1);
    }

    #[test]
    fn unit_with_no_receiver_is_returned() {
        let (catalog, mut world, mut store) = setup();
        let source = loc(0, 1, 0);
        place(&mut world, &catalog, source, EXTRACTOR);
        place(&mut world, &catalog, loc(0, 0, 0), CHEST);
        place(&mut world, &catalog, loc(1, 1, 0), ITEM_PIPE);
        place(&mut world, &catalog, loc(2, 1, 0), HOPPER);
        fill(&mut world, loc(0, 0, 0), 3, iron_ingot(), 5);
        for slot in 0..5 {
            fill(&mut world, loc(2, 1, 0), slot, cobblestone(), 64);
        }

        let mut registry = TransportRegistry::new();
        registry.register(&mut store, source, 0);
        let transport = ItemTransport::new(&catalog, &ItemConfig::default());
        let report = transport.run(&mut world, &store, &mut registry, &mut FairnessIndex::new());
        assert_eq!(report.moved, 0);
        assert_eq!(report.returned, 1);
        let chest = world.inventory(loc(0, 0, 0)).unwrap();
        assert_eq!(chest.slots()[3], Some(ItemStack::new(iron_ingot(), 5)));
    }

    #[test]
    fn receivers_ordered_by_item_priority() {
        let (catalog, mut world, store) = setup();
        let source = loc(0, 1, 0);
        place(&mut world, &catalog, source, EXTRACTOR);
        place(&mut world, &catalog, loc(0, 0, 0), HOPPER);
        line(&mut world, &catalog, loc(1, 1, 0), Direction::East, 4, ITEM_PIPE);
        place(&mut world, &catalog, loc(1, 2, 0), CHEST);
        place(&mut world, &catalog, loc(4, 2, 0), FURNACE);
        fill(&mut world, loc(0, 0, 0), 0, iron_ingot(), 2);

        let transport = ItemTransport::new(&catalog, &ItemConfig::default());
        let outcome = transport.transfer_one(&mut world, &store, source, 0).unwrap();
        assert_eq!(outcome.delivered.map(|d| d.to), Some(loc(4, 2, 0)));
    }

    #[test]
    fn faces_rotate_per_source() {
        let (catalog, mut world, mut store) = setup();
        let source = loc(0, 5, 0);
        place(&mut world, &catalog, source, EXTRACTOR);
        let above = source.offset(Direction::Up);
        let below = source.offset(Direction::Down);
        place(&mut world, &catalog, above, CHEST);
        place(&mut world, &catalog, below, CHEST);
        fill(&mut world, above, 0, cobblestone(), 10);
        fill(&mut world, below, 0, iron_ingot(), 10);
        line(&mut world, &catalog, loc(1, 5, 0), Direction::East, 2, ITEM_PIPE);
        place(&mut world, &catalog, loc(3, 5, 0), FURNACE);

        let mut registry = TransportRegistry::new();
        registry.register(&mut store, source, 0);
        let mut fairness = FairnessIndex::new();
        let transport = ItemTransport::new(&catalog, &ItemConfig::default());

        transport.run(&mut world, &store, &mut registry, &mut fairness);
        transport.run(&mut world, &store, &mut registry, &mut fairness);
        let furnace = world.inventory(loc(3, 5, 0)).unwrap();
        assert_eq!(furnace.quantity(cobblestone()), 1);
        assert_eq!(furnace.quantity(iron_ingot()), 1);
    }

    #[test]
    fn sources_sharing_a_network_take_turns() {
        let (catalog, mut world, mut store) = setup();
        // Two extractors on one pipe run, each fed by its own chest.
        let a = loc(0, 1, 0);
        let b = loc(4, 1, 0);
        place(&mut world, &catalog, a, EXTRACTOR);
        place(&mut world, &catalog, b, EXTRACTOR);
        line(&mut world, &catalog, loc(1, 1, 0), Direction::East, 3, ITEM_PIPE);
        place(&mut world, &catalog, loc(0, 0, 0), CHEST);
        place(&mut world, &catalog, loc(4, 0, 0), CHEST);
        place(&mut world, &catalog, loc(2, 2, 0), FURNACE);
        fill(&mut world, loc(0, 0, 0), 0, cobblestone(), 10);
        fill(&mut world, loc(4, 0, 0), 0, iron_ingot(), 10);

        let mut registry = TransportRegistry::new();
        registry.register(&mut store, a, 0);
        registry.register(&mut store, b, 0);
        let mut fairness = FairnessIndex::new();
        let transport = ItemTransport::new(&catalog, &ItemConfig::default());
        assert_eq!(transport.group_sources(&world, &registry).len(), 1);

        let first = transport.run(&mut world, &store, &mut registry, &mut fairness);
        let second = transport.run(&mut world, &store, &mut registry, &mut fairness);
        assert_eq!(first.moved + second.moved, 2);
        let furnace = world.inventory(loc(2, 2, 0)).unwrap();
        assert_eq!(furnace.quantity(cobblestone()), 1);
        assert_eq!(furnace.quantity(iron_ingot()), 1);
    }

    #[test]
    fn empty_source_does_not_block_its_network() {
        let (catalog, mut world, mut store) = setup();
        let a = loc(0, 1, 0);
        let b = loc(4, 1, 0);
        place(&mut world, &catalog, a, EXTRACTOR);
        place(&mut world, &catalog, b, EXTRACTOR);
        line(&mut world, &catalog, loc(1, 1, 0), Direction::East, 3, ITEM_PIPE);
        place(&mut world, &catalog, loc(0, 0, 0), CHEST);
        place(&mut world, &catalog, loc(4, 0, 0), CHEST);
        place(&mut world, &catalog, loc(2, 2, 0), FURNACE);
        fill(&mut world, loc(4, 0, 0), 0, iron_ingot(), 10);

        let mut registry = TransportRegistry::new();
        registry.register(&mut store, a, 0);
        registry.register(&mut store, b, 0);
        let mut fairness = FairnessIndex::new();
        let transport = ItemTransport::new(&catalog, &ItemConfig::default());
        for _ in 0..3 {
            let report = transport.run(&mut world, &store, &mut registry, &mut fairness);
            assert_eq!(report.moved, 1);
        }
        assert_eq!(total_items(&world, &[loc(2, 2, 0)]), 3);
    }

    #[test]
    fn invalid_sources_are_skipped() {
        let (catalog, mut world, mut store) = setup();
        let bare = loc(0, 1, 0);
        place(&mut world, &catalog, bare, EXTRACTOR);

        let mut registry = TransportRegistry::new();
        registry.register(&mut store, bare, 0);
        registry.register(&mut store, loc(9, 9, 9), 0);
        let transport = ItemTransport::new(&catalog, &ItemConfig::default());
        let report = transport.run(&mut world, &store, &mut registry, &mut FairnessIndex::new());
        assert_eq!(report.attempted, 0);
        assert_eq!(registry.len(), 2);
    }

    /// A source with no receiver next to a healthy, separate network.
    fn two_networks(catalog: &BlockCatalog, store: &mut MemoryStore) -> (GridWorld, TransportRegistry) {
        let mut world = GridWorld::with_dimensions([OVERWORLD]);
        place(&mut world, catalog, loc(0, 1, 0), EXTRACTOR);
        place(&mut world, catalog, loc(0, 0, 0), CHEST);
        place(&mut world, catalog, loc(1, 1, 0), ITEM_PIPE);
        fill(&mut world, loc(0, 0, 0), 0, cobblestone(), 5);

        place(&mut world, catalog, loc(20, 1, 0), EXTRACTOR);
        place(&mut world, catalog, loc(20, 0, 0), CHEST);
        place(&mut world, catalog, loc(21, 1, 0), ITEM_PIPE);
        place(&mut world, catalog, loc(22, 1, 0), HOPPER);
        fill(&mut world, loc(20, 0, 0), 0, iron_ingot(), 3);

        let mut registry = TransportRegistry::new();
        registry.register(store, loc(0, 1, 0), 0);
        registry.register(store, loc(20, 1, 0), 0);
        (world, registry)
    }

    #[test]
    fn failed_return_is_contained_to_its_source() {
        let (catalog, _, mut store) = setup();
        let (grid, mut registry) = two_networks(&catalog, &mut store);
        let mut world = FaultyWorld::new(grid, loc(0, 0, 0), Fault::Vanish);
        let transport = ItemTransport::new(&catalog, &ItemConfig::default());

        let report = transport.run(&mut world, &store, &mut registry, &mut FairnessIndex::new());
        assert_eq!(report.failures, 1);
        assert_eq!(report.invariant_violations, 0);
        assert!(matches!(
            report.errors.as_slice(),
            [EngineError::TransientWorldAccess(at)] if *at == loc(0, 0, 0)
        ));
        assert_eq!(report.moved, 1);
        assert_eq!(total_items(&world, &[loc(22, 1, 0)]), 1);
    }

    #[test]
    fn conflicting_return_is_an_invariant_violation() {
        let (catalog, _, mut store) = setup();
        let (grid, mut registry) = two_networks(&catalog, &mut store);
        let mut world = FaultyWorld::new(grid, loc(0, 0, 0), Fault::Swap(iron_ingot()));
        let transport = ItemTransport::new(&catalog, &ItemConfig::default());

        let report = transport.run(&mut world, &store, &mut registry, &mut FairnessIndex::new());
        assert_eq!(report.failures, 1);
        assert_eq!(report.invariant_violations, 1);
        assert!(report.errors[0].is_invariant_violation());
        assert_eq!(report.moved, 1);
        assert_eq!(total_items(&world, &[loc(22, 1, 0)]), 1);
    }

    #[test]
    fn input_only_inventory_is_not_extracted() {
        let mut b = conduit_core::catalog::CatalogBuilder::new();
        b.register(conduit_core::catalog::BlockTypeDef::conduit(
            EXTRACTOR,
            Medium::Items,
            Directionality::OutputOnly,
        ))
        .unwrap();
        b.register(
            conduit_core::catalog::BlockTypeDef::new("drop_box", conduit_core::catalog::Capabilities::empty())
                .with_inventory(1, 1)
                .with_directionality(Directionality::InputOnly),
        )
        .unwrap();
        b.register(
            conduit_core::catalog::BlockTypeDef::new(CHEST, conduit_core::catalog::Capabilities::empty())
                .with_inventory(4, 1),
        )
        .unwrap();
        let catalog = b.build().unwrap();
        let mut world = GridWorld::with_dimensions([OVERWORLD]);
        let store = MemoryStore::new();
        let source = loc(0, 1, 0);
        place(&mut world, &catalog, source, EXTRACTOR);
        place(&mut world, &catalog, loc(0, 0, 0), "drop_box");
        place(&mut world, &catalog, loc(1, 1, 0), CHEST);
        fill(&mut world, loc(0, 0, 0), 0, cobblestone(), 1);

        let transport = ItemTransport::new(&catalog, &ItemConfig::default());
        let outcome = transport.transfer_one(&mut world, &store, source, 0).unwrap();
        assert!(outcome.delivered.is_none());
        assert_eq!(total_items(&world, &[loc(0, 0, 0)]), 1);
    }
}
