//! Property-based tests for the resource network engine.
//!
//! Uses proptest to generate random layouts and buffer levels, then verify
//! conservation, capacity, bounded discovery, direction and validation
//! invariants.

use conduit_core::catalog::Medium;
use conduit_core::config::{EnergyConfig, ItemConfig};
use conduit_core::coord::{Direction, Location};
use conduit_core::discovery::{discover, DiscoveryOptions};
use conduit_core::node::Classifier;
use conduit_core::store::MemoryStore;
use conduit_core::test_utils::*;
use conduit_core::world::GridWorld;
use conduit_logistics::fairness::FairnessIndex;
use conduit_logistics::registry::TransportRegistry;
use conduit_logistics::transport::ItemTransport;
use conduit_power::{EnergyDistributor, ReceiverFilter};
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

/// Receiver kinds hung off an energy cable.
fn arb_receiver() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just(MACHINE),
        Just(FURNACE),
        Just(BATTERY),
        Just(BATTERY_T2),
        Just(CHARGER),
        Just(DISCHARGER),
    ]
}

/// Cells of a small cube, each either a cable or empty.
fn arb_cable_mass(edge: i32) -> impl Strategy<Value = Vec<bool>> {
    proptest::collection::vec(any::<bool>(), (edge * edge * edge) as usize)
}

fn cube_loc(index: usize, edge: i32) -> Location {
    let i = index as i32;
    loc(i % edge, (i / edge) % edge, i / (edge * edge))
}

/// Inventory layout around item pipes: what sits at each attachment point.
#[derive(Debug, Clone, Copy)]
enum Attachment {
    Nothing,
    Chest(u32),
    Hopper(u32),
    Stone,
}

fn arb_attachment() -> impl Strategy<Value = Attachment> {
    prop_oneof![
        Just(Attachment::Nothing),
        (0..100u32).prop_map(Attachment::Chest),
        (0..100u32).prop_map(Attachment::Hopper),
        Just(Attachment::Stone),
    ]
}

/// A row of extractors at y=1 joined by pipes, with attachments below.
fn build_item_row(world: &mut GridWorld, attachments: &[Attachment], extractors: &[bool]) -> Vec<Location> {
    let catalog = standard_catalog();
    let mut inventories = Vec::new();
    for (x, (attachment, extractor)) in attachments.iter().zip(extractors).enumerate() {
        let x = x as i32;
        let name = if *extractor { EXTRACTOR } else { ITEM_PIPE };
        place(world, &catalog, loc(x, 1, 0), name);
        let below = loc(x, 0, 0);
        match *attachment {
            Attachment::Nothing => {}
            Attachment::Stone => {
                place(world, &catalog, below, STONE);
            }
            Attachment::Chest(count) => {
                place(world, &catalog, below, CHEST);
                fill(world, below, 0, cobblestone(), count.min(64));
                fill(world, below, 1, iron_ingot(), count.saturating_sub(64));
                inventories.push(below);
            }
            Attachment::Hopper(count) => {
                place(world, &catalog, below, HOPPER);
                fill(world, below, 2, iron_ingot(), count.min(64));
                inventories.push(below);
            }
        }
    }
    inventories
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Item transport never creates or destroys items.
    #[test]
    fn transport_conserves_items(
        layout in proptest::collection::vec((arb_attachment(), any::<bool>()), 2..10),
        cycles in 1..20usize,
    ) {
        let (attachments, extractors): (Vec<_>, Vec<_>) = layout.into_iter().unzip();
        let catalog = standard_catalog();
        let mut world = GridWorld::with_dimensions([OVERWORLD]);
        let mut store = MemoryStore::new();
        let inventories = build_item_row(&mut world, &attachments, &extractors);
        let before = total_items(&world, &inventories);

        let mut registry = TransportRegistry::new();
        for (x, extractor) in extractors.iter().enumerate() {
            if *extractor {
                registry.register(&mut store, loc(x as i32, 1, 0), 0);
            }
        }
        let mut fairness = FairnessIndex::new();
        let transport = ItemTransport::new(&catalog, &ItemConfig::default());

        for _ in 0..cycles {
            let report = transport.run(&mut world, &store, &mut registry, &mut fairness);
            prop_assert_eq!(report.invariant_violations, 0);
            // One network, at most one item per cycle.
            prop_assert!(report.moved <= 1);
            prop_assert_eq!(total_items(&world, &inventories), before);
        }
    }

    /// Every amount stays within `[0, capacity]` after a push.
    #[test]
    fn distribution_respects_capacity(
        receivers in proptest::collection::vec((arb_receiver(), 0..200_000u64), 1..8),
        offered in 0..300_000u64,
    ) {
        let catalog = standard_catalog();
        let mut world = GridWorld::with_dimensions([OVERWORLD]);
        let mut store = MemoryStore::new();
        place(&mut world, &catalog, loc(0, 0, 0), GENERATOR);
        line(&mut world, &catalog, loc(1, 0, 0), Direction::East, receivers.len(), CABLE);
        for (i, (name, amount)) in receivers.iter().enumerate() {
            let at = loc(i as i32 + 1, 1, 0);
            place(&mut world, &catalog, at, name);
            set_energy(&mut store, at, *amount);
        }
        set_energy(&mut store, loc(0, 0, 0), offered);

        let distributor = EnergyDistributor::new(&catalog, &EnergyConfig::default());
        let result = distributor.push_from(&world, &mut store, loc(0, 0, 0), ReceiverFilter::Any);

        let generator_cap = catalog.get(catalog.id(GENERATOR).unwrap()).unwrap().energy_capacity;
        prop_assert!(result.transferred <= offered.min(generator_cap));
        for (i, (name, _)) in receivers.iter().enumerate() {
            let at = loc(i as i32 + 1, 1, 0);
            let capacity = catalog.get(catalog.id(name).unwrap()).unwrap().energy_capacity;
            let received: u64 = result.transfers.iter().filter(|(l, _)| *l == at).map(|(_, a)| a).sum();
            prop_assert!(received <= capacity);
            // Credited receivers end within capacity.
            if received > 0 {
                prop_assert!(energy(&store, at) <= capacity);
            }
        }
        if result.transferred > 0 {
            prop_assert!(energy(&store, loc(0, 0, 0)) <= generator_cap);
        }
    }

    /// `OutputOnly` blocks are never targets; `InputOnly` blocks never push.
    #[test]
    fn directionality_is_respected(
        receivers in proptest::collection::vec((arb_receiver(), 0..1_000u64), 1..8),
        charge in 1..5_000u64,
    ) {
        let catalog = standard_catalog();
        let mut world = GridWorld::with_dimensions([OVERWORLD]);
        let mut store = MemoryStore::new();
        place(&mut world, &catalog, loc(0, 0, 0), GENERATOR);
        line(&mut world, &catalog, loc(1, 0, 0), Direction::East, receivers.len(), CABLE);
        let mut output_only = Vec::new();
        let mut input_only = Vec::new();
        for (i, (name, amount)) in receivers.iter().enumerate() {
            let at = loc(i as i32 + 1, 1, 0);
            place(&mut world, &catalog, at, name);
            set_energy(&mut store, at, *amount);
            if *name == DISCHARGER {
                output_only.push(at);
            }
            if *name == CHARGER {
                input_only.push(at);
            }
        }
        set_energy(&mut store, loc(0, 0, 0), 1_000);

        let distributor = EnergyDistributor::new(&catalog, &EnergyConfig::default());
        let result = distributor.push_from(&world, &mut store, loc(0, 0, 0), ReceiverFilter::Any);
        for (to, _) in &result.transfers {
            prop_assert!(!output_only.contains(to));
        }

        for at in input_only {
            set_energy(&mut store, at, charge);
            prop_assert_eq!(distributor.distribute(&world, &mut store, at, charge), 0);
        }
    }

    /// Discovery never returns more than `max_nodes` entries, loops included.
    #[test]
    fn discovery_is_bounded(
        cells in arb_cable_mass(6),
        seed in 0..216usize,
        max_nodes in 1..40usize,
        visit_limit in 1..300usize,
    ) {
        let catalog = standard_catalog();
        let mut world = GridWorld::with_dimensions([OVERWORLD]);
        let store = MemoryStore::new();
        for (i, cable) in cells.iter().enumerate() {
            if *cable {
                place(&mut world, &catalog, cube_loc(i, 6), CABLE);
            }
        }

        let classifier = Classifier::new(&catalog);
        let options = DiscoveryOptions::new(Medium::Energy, max_nodes)
            .full_topology()
            .with_visit_limit(visit_limit);
        let network = discover(&classifier, &world, &store, cube_loc(seed, 6), options);
        prop_assert!(network.len() <= max_nodes);
        prop_assert!(network.visited() <= visit_limit);
        let cables = cells.iter().filter(|c| **c).count();
        prop_assert!(network.len() <= cables);
    }

    /// A second validation pass with no world changes removes nothing.
    #[test]
    fn validation_is_idempotent(
        layout in proptest::collection::vec((arb_attachment(), any::<bool>()), 1..10),
        extra in proptest::collection::vec((0..12i32, 0..3i32), 0..6),
    ) {
        let (attachments, extractors): (Vec<_>, Vec<_>) = layout.into_iter().unzip();
        let catalog = standard_catalog();
        let mut world = GridWorld::with_dimensions([OVERWORLD]);
        let mut store = MemoryStore::new();
        build_item_row(&mut world, &attachments, &extractors);

        let mut registry = TransportRegistry::new();
        for x in 0..attachments.len() {
            registry.register(&mut store, loc(x as i32, 1, 0), 0);
        }
        for (x, y) in extra {
            registry.register(&mut store, loc(x, y, 0), 0);
        }

        let classifier = Classifier::new(&catalog);
        let first = registry.validate_all(&classifier, &world, &mut store, 1);
        let second = registry.validate_all(&classifier, &world, &mut store, 2);
        prop_assert!(second.removed.is_empty());
        prop_assert_eq!(second.checked, first.checked - first.removed.len());
        for at in registry.locations() {
            prop_assert_eq!(at.at.y, 1);
            prop_assert!(extractors.get(at.at.x as usize).copied().unwrap_or(false));
        }
    }
}
