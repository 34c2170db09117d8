//! Criterion benchmarks for network discovery.
//!
//! Three benchmark groups:
//! - `cable_grid`: a 30x30 cable plane with machines on every fifth cell
//! - `conduit_mass`: a solid 16^3 cable cube with no endpoints (visit cap bound)
//! - `anchor`: network identifier derivation along a 100-cell pipe

use conduit_core::catalog::{BlockCatalog, Medium};
use conduit_core::coord::{Direction, Location};
use conduit_core::discovery::{discover, network_anchor, DiscoveryOptions};
use conduit_core::node::Classifier;
use conduit_core::store::MemoryStore;
use conduit_core::test_utils::*;
use conduit_core::world::GridWorld;
use criterion::{criterion_group, criterion_main, Criterion};

// ===========================================================================
// World builders
// ===========================================================================

fn build_cable_grid(catalog: &BlockCatalog) -> (GridWorld, Location) {
    let mut world = GridWorld::with_dimensions([OVERWORLD]);
    for x in 0..30 {
        for z in 0..30 {
            place(&mut world, catalog, loc(x, 0, z), CABLE);
            if (x + z) % 5 == 0 {
                place(&mut world, catalog, loc(x, 1, z), MACHINE);
            }
        }
    }
    place(&mut world, catalog, loc(-1, 0, 0), GENERATOR);
    (world, loc(-1, 0, 0))
}

fn build_conduit_mass(catalog: &BlockCatalog) -> (GridWorld, Location) {
    let mut world = GridWorld::with_dimensions([OVERWORLD]);
    for x in 0..16 {
        for y in 0..16 {
            for z in 0..16 {
                place(&mut world, catalog, loc(x, y, z), CABLE);
            }
        }
    }
    (world, loc(0, 0, 0))
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_cable_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("cable_grid");
    group.sample_size(50);

    let catalog = standard_catalog();
    let (world, seed) = build_cable_grid(&catalog);
    let store = MemoryStore::new();
    let classifier = Classifier::new(&catalog);

    group.bench_function("900_cables_max_90", |b| {
        b.iter(|| {
            discover(
                &classifier,
                &world,
                &store,
                seed,
                DiscoveryOptions::new(Medium::Energy, 90).excluding_seed(),
            )
        });
    });

    group.finish();
}

fn bench_conduit_mass(c: &mut Criterion) {
    let mut group = c.benchmark_group("conduit_mass");
    group.sample_size(30);

    let catalog = standard_catalog();
    let (world, seed) = build_conduit_mass(&catalog);
    let store = MemoryStore::new();
    let classifier = Classifier::new(&catalog);

    group.bench_function("4096_cables_no_endpoints", |b| {
        b.iter(|| {
            discover(
                &classifier,
                &world,
                &store,
                seed,
                DiscoveryOptions::new(Medium::Energy, 90),
            )
        });
    });

    group.finish();
}

fn bench_anchor(c: &mut Criterion) {
    let mut group = c.benchmark_group("anchor");

    let catalog = standard_catalog();
    let mut world = GridWorld::with_dimensions([OVERWORLD]);
    line(&mut world, &catalog, loc(0, 0, 0), Direction::East, 100, ITEM_PIPE);
    let classifier = Classifier::new(&catalog);

    group.bench_function("pipe_100", |b| {
        b.iter(|| network_anchor(&classifier, &world, loc(99, 0, 0), Medium::Items, 100));
    });

    group.finish();
}

criterion_group!(benches, bench_cable_grid, bench_conduit_mass, bench_anchor);
criterion_main!(benches);
