// Property-based tests for force profile bookkeeping, contrast weights and
// whole-battle outcomes
use std::sync::Arc;

use autoresolve::autoresolve::{
    balance_score, calculate_side_force, side_attack, transports_allowed, AutoResolveEngine, CombatantArena,
    ForceContext, RoundStatus,
};
use autoresolve::contrast::{ContrastTable, ContrastWeight, ForceProfile};
use autoresolve::core::{
    AutoResolveConfig, CategoryMask, CombatantId, Domain, MovementClass, PlayerId, SyncRandom, Terrain, UnitTypeId,
};
use autoresolve::units::{GameObject, Player, PlayerRegistry, UnitType, UnitTypeRegistry};
use proptest::test_runner::TestCaseResult;
use proptest::prelude::*;

const CATEGORIES: [CategoryMask; 5] = [
    CategoryMask::FIGHTER,
    CategoryMask::BOMBER,
    CategoryMask::CORVETTE,
    CategoryMask::FRIGATE,
    CategoryMask::CAPITAL,
];

fn table() -> ContrastTable {
    let mut table = ContrastTable::new();
    table.insert(
        CategoryMask::FIGHTER,
        vec![
            ContrastWeight::category(CategoryMask::CORVETTE, 2.0),
            ContrastWeight::category(CategoryMask::CAPITAL, 0.5),
        ],
    );
    table.insert(
        CategoryMask::CAPITAL,
        vec![ContrastWeight::category(CategoryMask::BOMBER, 2.0)],
    );
    table.insert(
        CategoryMask::FRIGATE,
        vec![
            ContrastWeight::category(CategoryMask::CAPITAL, 1.5),
            ContrastWeight::category(CategoryMask::FIGHTER, 1.0),
        ],
    );
    table
}

fn land_table(infantry_effect: f32, vehicle_effect: f32) -> ContrastTable {
    let mut table = table();
    table.insert(
        CategoryMask::INFANTRY,
        vec![
            ContrastWeight::category(CategoryMask::VEHICLE, 1.8),
            ContrastWeight::category(CategoryMask::INFANTRY, 1.0),
        ],
    );
    table.insert(
        CategoryMask::VEHICLE,
        vec![ContrastWeight::category(CategoryMask::INFANTRY, 0.6)],
    );
    table.set_terrain_effectiveness(Terrain::Desert, MovementClass::Infantry, infantry_effect);
    table.set_terrain_effectiveness(Terrain::Desert, MovementClass::HeavyVehicle, vehicle_effect);
    table
}

/// Three space types and three land types; the first of each is a hero
/// that boosts its own category
fn attack_units() -> (UnitTypeRegistry, [UnitTypeId; 3], [UnitTypeId; 3]) {
    let mut units = UnitTypeRegistry::new();
    let space = [
        units.register(
            UnitType::new("Ace Wing", 60.0, CategoryMask::FIGHTER).with_ability(CategoryMask::FIGHTER, 1.5),
        ),
        units.register(UnitType::new("Frigate", 260.0, CategoryMask::FRIGATE)),
        units.register(UnitType::new("Cruiser", 900.0, CategoryMask::CAPITAL)),
    ];
    let land = [
        units.register(
            UnitType::new("Commando", 80.0, CategoryMask::INFANTRY)
                .land()
                .with_ability(CategoryMask::INFANTRY, 1.4),
        ),
        units.register(UnitType::new("Trooper", 100.0, CategoryMask::INFANTRY).land()),
        units.register(
            UnitType::new("Tank", 400.0, CategoryMask::VEHICLE)
                .land()
                .with_movement(MovementClass::HeavyVehicle),
        ),
    ];
    (units, space, land)
}

/// Baselines and both attack results keep every domain's categories
/// under its aggregate
fn check_attack_invariant(
    table: &ContrastTable,
    units: &UnitTypeRegistry,
    domain: Domain,
    terrain: Option<Terrain>,
    rosters: [Vec<UnitTypeId>; 2],
) -> TestCaseResult {
    let players: PlayerRegistry = [Player::new(PlayerId(1)), Player::new(PlayerId(2))]
        .into_iter()
        .collect();
    let ctx = ForceContext {
        table,
        units,
        players: &players,
        domain,
        terrain,
        mid_tactical: false,
    };
    let owners = [PlayerId(1), PlayerId(2)];

    let mut arena = CombatantArena::new();
    let mut next_id = 0;
    let mut queues: [Vec<CombatantId>; 2] = [Vec::new(), Vec::new()];
    for (side, roster) in rosters.iter().enumerate() {
        for unit_type in roster {
            next_id += 1;
            let object = match domain {
                Domain::Space => GameObject::ship(next_id, owners[side], *unit_type),
                Domain::Land => GameObject::ground_unit(next_id, owners[side], *unit_type),
            };
            queues[side].push(arena.insert(object, side, 100.0));
        }
    }

    let baselines = [
        calculate_side_force(&ctx, &arena, &queues[0], owners[0]).unwrap().profile,
        calculate_side_force(&ctx, &arena, &queues[1], owners[1]).unwrap().profile,
    ];
    for baseline in &baselines {
        prop_assert!(baseline.holds_invariant());
    }

    for (attacker, defender) in [(0, 1), (1, 0)] {
        let result = side_attack(&ctx, &arena, &queues[attacker], &baselines[defender], owners[attacker], None).unwrap();
        prop_assert!(result.holds_invariant());
        prop_assert!(result.aggregate(domain) <= baselines[defender].aggregate(domain));
    }
    Ok(())
}

proptest! {
    #[test]
    fn proptest_space_attack_keeps_invariant(
        side_a in prop::collection::vec(0usize..3, 1..9),
        side_b in prop::collection::vec(0usize..3, 1..9),
    ) {
        let (units, space, _) = attack_units();
        let rosters = [
            side_a.iter().map(|pick| space[*pick]).collect(),
            side_b.iter().map(|pick| space[*pick]).collect(),
        ];
        check_attack_invariant(&table(), &units, Domain::Space, None, rosters)?;
    }

    #[test]
    fn proptest_land_attack_keeps_invariant(
        side_a in prop::collection::vec(0usize..3, 1..9),
        side_b in prop::collection::vec(0usize..3, 1..9),
        infantry_effect in 0.0f32..2.0,
        vehicle_effect in 0.0f32..3.0,
    ) {
        let (units, _, land) = attack_units();
        let rosters = [
            side_a.iter().map(|pick| land[*pick]).collect(),
            side_b.iter().map(|pick| land[*pick]).collect(),
        ];
        let table = land_table(infantry_effect, vehicle_effect);
        check_attack_invariant(&table, &units, Domain::Land, Some(Terrain::Desert), rosters)?;
    }

    #[test]
    fn proptest_rebalance_restores_invariant(
        adds in prop::collection::vec((0usize..5, 0.0f32..1000.0), 0..20),
        hits in prop::collection::vec((0usize..5, 0.0f32..1500.0), 0..20),
    ) {
        let table = table();
        let mut profile = ForceProfile::for_domain(&table, Domain::Space);
        for (category, power) in &adds {
            profile.add_force(Domain::Space, CATEGORIES[*category], *power);
        }
        prop_assert!(profile.holds_invariant());

        for (index, amount) in &hits {
            profile.subtract(*index % profile.len(), *amount);
        }
        profile.clamp_and_rebalance();
        prop_assert!(profile.holds_invariant());
    }

    #[test]
    fn proptest_average_factor_within_matching_weights(category in 0usize..5) {
        let table = table();
        let attacker = UnitType::new("Attacker", 100.0, CATEGORIES[category]);
        for target in table.categories() {
            let average = table.average_contrast_factor(&attacker, target);
            let best = table.best_contrast_factor(&attacker, target);
            prop_assert!(average >= 0.0);
            prop_assert!(average <= best.max(1.0));
        }
    }

    #[test]
    fn proptest_balance_score_bounded(remaining in 0.0f32..5000.0, scaled in 0.0f32..5000.0) {
        let score = balance_score(remaining, scaled);
        prop_assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn proptest_transport_allowance_never_exceeds_count(count in 0usize..50, rate in 0.0f32..1.0) {
        prop_assert!(transports_allowed(count, rate, false) <= count);
        prop_assert_eq!(transports_allowed(count, rate, true), 0);
    }

    #[test]
    fn proptest_battle_always_ends_with_a_standing_winner(
        side_a in prop::collection::vec(0usize..3, 1..6),
        side_b in prop::collection::vec(0usize..3, 1..6),
        seed in any::<u64>(),
    ) {
        let mut units = UnitTypeRegistry::new();
        let types = [
            units.register(UnitType::new("Corvette", 120.0, CategoryMask::CORVETTE)),
            units.register(UnitType::new("Frigate", 260.0, CategoryMask::FRIGATE)),
            units.register(UnitType::new("Cruiser", 900.0, CategoryMask::CAPITAL)),
        ];
        let mut engine = AutoResolveEngine::new(
            Arc::new(table()),
            Arc::new(units),
            AutoResolveConfig::default(),
            SyncRandom::seed_from_u64(seed),
        );
        let players: PlayerRegistry = [Player::human(PlayerId(1)), Player::new(PlayerId(2))]
            .into_iter()
            .collect();
        engine.prepare_for_space(players, 0).unwrap();

        let mut next_id = 0;
        for (owner, roster) in [(PlayerId(1), &side_a), (PlayerId(2), &side_b)] {
            for pick in roster {
                next_id += 1;
                engine.add_combatant(GameObject::ship(next_id, owner, types[*pick])).unwrap();
            }
        }
        engine.initiate_combat(PlayerId(1)).unwrap();

        let mut finished = false;
        for frame in 0..3 {
            if engine.combat_round(frame, true).unwrap() == RoundStatus::Over {
                finished = true;
                break;
            }
        }
        prop_assert!(finished);

        let winner = engine.who_won();
        prop_assert!(winner.is_some());
        if let Some(winner) = winner {
            prop_assert!(!engine.queue(winner).is_empty());
        }
    }
}
