//! Contrast data integration tests against the bundled data files

use std::path::PathBuf;

use autoresolve::contrast::{ContrastTable, ForceProfile};
use autoresolve::core::{CategoryMask, Domain, MovementClass, Terrain};
use autoresolve::units::{UnitRole, UnitTypeRegistry};

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

fn load() -> (UnitTypeRegistry, ContrastTable) {
    let mut units = UnitTypeRegistry::new();
    units.load_file(&data_dir().join("units.toml")).unwrap();
    let table = ContrastTable::load(&data_dir().join("contrast.toml"), &units).unwrap();
    (units, table)
}

#[test]
fn test_bundled_units_resolve() {
    let (units, _) = load();

    let squadron = units.get_by_name("Bomber Squadron").unwrap();
    let bomber = units.id_of("Bomber").unwrap();
    assert_eq!(squadron.squadron_units, vec![bomber]);
    assert_eq!(squadron.land_bomber, Some(bomber));
    assert!(units.contains_super_weapon_killer(squadron));

    let station = units.get_by_name("Orbital Station III").unwrap();
    assert_eq!(station.role, UnitRole::StarBase);
    assert_eq!(station.garrison_at(2).count(), 1);

    let dropship = units.get_by_name("Dropship").unwrap();
    assert!(dropship.is_transport());
    assert_eq!(dropship.unique_ground_container, units.id_of("Trooper Company"));
}

#[test]
fn test_bundled_contrast_weights() {
    let (units, table) = load();
    assert!(!table.is_empty());

    let bomber = units.get_by_name("Bomber Squadron").unwrap();
    assert_eq!(table.best_contrast_factor(bomber, CategoryMask::CAPITAL), 2.0);

    // An exact unit entry beats the category average
    let heavy = units.get_by_name("Heavy Frigate").unwrap();
    assert_eq!(table.average_contrast_factor(heavy, CategoryMask::FRIGATE), 1.25);

    let trooper = units.get_by_name("Trooper").unwrap();
    assert_eq!(table.average_contrast_factor(trooper, CategoryMask::CAPITAL), 0.0);
}

#[test]
fn test_bundled_terrain_effectiveness() {
    let (_, table) = load();
    assert_eq!(table.effectiveness_on_terrain(MovementClass::HeavyVehicle, Terrain::Swamp), 0.5);
    assert_eq!(table.effectiveness_on_terrain(MovementClass::Infantry, Terrain::Urban), 1.3);
    assert_eq!(table.effectiveness_on_terrain(MovementClass::Infantry, Terrain::Jungle), 1.0);
}

#[test]
fn test_profile_layout_follows_table() {
    let (_, table) = load();
    let profile = ForceProfile::for_domain(&table, Domain::Land);
    assert_eq!(profile.len(), table.len() + 2);
    assert!(profile.buckets()[2..].iter().all(|bucket| bucket.is_ground));

    let categories: Vec<_> = profile.buckets()[2..].iter().map(|bucket| bucket.category).collect();
    let mut sorted = categories.clone();
    sorted.sort();
    assert_eq!(categories, sorted);
}
