//! Energy grid example: generators, batteries and machines on one cable.
//!
//! Builds a small grid from a catalog defined in code, then runs the engine
//! tick by tick and prints buffer levels and the network analysis. Shows the
//! floor split, storage discharge into consumers only, and a cable cut.
//!
//! Run with: `RUST_LOG=debug cargo run -p conduit-examples --example energy_grid`

use conduit_core::catalog::{BlockCatalog, BlockTypeDef, Capabilities, CatalogBuilder, Directionality, Medium};
use conduit_core::config::{EngineConfig, ScheduleConfig};
use conduit_core::coord::{Coord, DimensionId, Location};
use conduit_core::keys::energy_key;
use conduit_core::store::{KvStore, MemoryStore, Value};
use conduit_core::world::GridWorld;
use conduit_engine::Engine;
use tracing_subscriber::EnvFilter;

const OVERWORLD: DimensionId = DimensionId(0);

fn at(x: i32, y: i32, z: i32) -> Location {
    Location::new(OVERWORLD, Coord::new(x, y, z))
}

fn catalog() -> BlockCatalog {
    let mut b = CatalogBuilder::new();
    b.register(BlockTypeDef::new("generator", Capabilities::GENERATOR).with_energy(1_000, 1).with_max_output(100))
        .unwrap();
    b.register(BlockTypeDef::new("battery", Capabilities::STORAGE).with_energy(500, 2)).unwrap();
    b.register(BlockTypeDef::new("machine", Capabilities::CONSUMER).with_energy(60, 1)).unwrap();
    b.register(BlockTypeDef::conduit("cable", Medium::Energy, Directionality::Bidirectional)).unwrap();
    b.build().unwrap()
}

fn place(engine: &mut Engine, world: &mut GridWorld, store: &mut MemoryStore, loc: Location, name: &str) {
    let id = engine.catalog().id(name).unwrap();
    let def = engine.catalog().get(id).unwrap().clone();
    world.place_def(loc, id, &def).unwrap();
    engine.on_block_placed(store, loc, id);
}

fn level(store: &MemoryStore, loc: Location) -> i64 {
    store.get(&energy_key(loc)).and_then(|v| v.as_int()).unwrap_or(0)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = EngineConfig {
        schedule: ScheduleConfig {
            distribution_interval: 1,
            actor_scan_interval: 0,
            ..ScheduleConfig::default()
        },
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(catalog(), config);
    let mut world = GridWorld::with_dimensions([OVERWORLD]);
    let mut store = MemoryStore::new();

    // generator - cable x4 - battery; three machines hang off the cable.
    place(&mut engine, &mut world, &mut store, at(0, 0, 0), "generator");
    for x in 1..=4 {
        place(&mut engine, &mut world, &mut store, at(x, 0, 0), "cable");
    }
    place(&mut engine, &mut world, &mut store, at(5, 0, 0), "battery");
    let machines = [at(1, 1, 0), at(2, 1, 0), at(3, 1, 0)];
    for m in machines {
        place(&mut engine, &mut world, &mut store, m, "machine");
    }
    store.set(&energy_key(at(0, 0, 0)), Value::Int(1_000));

    println!("=== Scenario 1: generator fills machines and battery ===\n");
    for _ in 0..4 {
        let report = engine.step(&mut world, &mut store);
        println!(
            "Tick {}: generator={}, machines={:?}, battery={}",
            report.tick,
            level(&store, at(0, 0, 0)),
            machines.map(|m| level(&store, m)),
            level(&store, at(5, 0, 0)),
        );
    }

    let analysis = engine.analyze_network(&world, &store, at(0, 0, 0));
    println!(
        "\nNetwork: {} nodes ({} cables), stored {}/{} ({:.2} full)",
        analysis.total_nodes, analysis.conduit_count, analysis.stored, analysis.capacity, analysis.fill_ratio
    );

    println!("\n=== Scenario 2: generator runs dry, battery feeds machines ===\n");
    store.set(&energy_key(at(0, 0, 0)), Value::Int(0));
    for m in machines {
        store.set(&energy_key(m), Value::Int(0));
    }
    for _ in 0..2 {
        let report = engine.step(&mut world, &mut store);
        println!(
            "Tick {}: machines={:?}, battery={}",
            report.tick,
            machines.map(|m| level(&store, m)),
            level(&store, at(5, 0, 0)),
        );
    }

    println!("\n=== Scenario 3: cable cut isolates the battery ===\n");
    world.remove(at(4, 0, 0)).unwrap();
    let cable = engine.catalog().id("cable").unwrap();
    engine.on_block_removed(&mut store, at(4, 0, 0), cable);
    for m in machines {
        store.set(&energy_key(m), Value::Int(0));
    }
    let report = engine.step(&mut world, &mut store);
    println!(
        "Tick {}: machines={:?}, battery={}",
        report.tick,
        machines.map(|m| level(&store, m)),
        level(&store, at(5, 0, 0)),
    );

    println!("\nStats: {:?}", engine.stats());
    println!("\nEnergy grid demo complete.");
}
