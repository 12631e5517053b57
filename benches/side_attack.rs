//! Attack exchange benchmarks against the bundled unit and contrast data

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::path::PathBuf;
use std::sync::Arc;

use autoresolve::autoresolve::{
    calculate_side_force, side_attack, AutoResolveEngine, CombatantArena, ForceContext,
};
use autoresolve::contrast::ContrastTable;
use autoresolve::core::{AutoResolveConfig, CombatantId, Domain, PlayerId, SyncRandom};
use autoresolve::scenario::Scenario;
use autoresolve::units::{GameObject, Player, PlayerRegistry, UnitTypeRegistry};

const FLEET: [&str; 5] = ["Corvette", "Frigate", "Heavy Frigate", "Cruiser", "Bomber Squadron"];

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

fn load_data() -> (UnitTypeRegistry, ContrastTable) {
    let mut units = UnitTypeRegistry::new();
    units
        .load_file(&data_dir().join("units.toml"))
        .expect("bundled unit data");
    let table = ContrastTable::load_or_default(&data_dir().join("contrast.toml"), &units);
    (units, table)
}

/// Fill an arena with `size` ships per side, cycling through the fleet list
fn build_sides(units: &UnitTypeRegistry, size: usize) -> (CombatantArena, [Vec<CombatantId>; 2]) {
    let mut arena = CombatantArena::new();
    let mut queues = [Vec::new(), Vec::new()];
    let mut next_id = 0;
    for (side, queue) in queues.iter_mut().enumerate() {
        for i in 0..size {
            next_id += 1;
            let unit_type = units.id_of(FLEET[i % FLEET.len()]).expect("fleet unit");
            let object = GameObject::ship(next_id, PlayerId(side as u32 + 1), unit_type);
            queue.push(arena.insert(object, side, 100.0));
        }
    }
    (arena, queues)
}

fn bench_side_attack(c: &mut Criterion) {
    let (units, table) = load_data();
    let players: PlayerRegistry = [Player::new(PlayerId(1)), Player::new(PlayerId(2))]
        .into_iter()
        .collect();
    let ctx = ForceContext {
        table: &table,
        units: &units,
        players: &players,
        domain: Domain::Space,
        terrain: None,
        mid_tactical: false,
    };

    let mut group = c.benchmark_group("side_attack");
    for size in [5, 25, 100] {
        let (arena, queues) = build_sides(&units, size);
        let defender = calculate_side_force(&ctx, &arena, &queues[1], PlayerId(2))
            .expect("defender force")
            .profile;

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                side_attack(
                    black_box(&ctx),
                    &arena,
                    &queues[0],
                    black_box(&defender),
                    PlayerId(1),
                    None,
                )
            })
        });
    }
    group.finish();
}

fn bench_full_scenario(c: &mut Criterion) {
    let (units, table) = load_data();
    let units = Arc::new(units);
    let table = Arc::new(table);
    let scenario = Scenario::load(&data_dir().join("scenarios").join("orbital_siege.toml"))
        .expect("bundled scenario");

    c.bench_function("orbital_siege_instant", |b| {
        b.iter(|| {
            let mut engine = AutoResolveEngine::new(
                Arc::clone(&table),
                Arc::clone(&units),
                AutoResolveConfig::default(),
                SyncRandom::seed_from_u64(7),
            );
            scenario.run(&mut engine, true)
        })
    });
}

criterion_group!(benches, bench_side_attack, bench_full_scenario);
criterion_main!(benches);
