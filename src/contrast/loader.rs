//! TOML loading for the contrast table
//!
//! ```toml
//! [[contrast]]
//! category = "Capital"
//! weights = [
//!     { category = "Bomber", weight = 2.0 },
//!     { unit = "Heavy Frigate", weight = 0.5 },
//! ]
//!
//! [terrain.Swamp]
//! HeavyVehicle = 0.5
//! ```
//!
//! Unknown category, unit, terrain or movement names are skipped with a
//! warning rather than failing the whole file.

use serde::de::value::{Error as ValueError, StrDeserializer};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use super::table::{ContrastTable, ContrastWeight};
use crate::core::error::LoadError;
use crate::core::types::{CategoryMask, MovementClass, Terrain};
use crate::units::registry::UnitTypeRegistry;

#[derive(Debug, Deserialize)]
struct ContrastFile {
    #[serde(default)]
    contrast: Vec<ContrastDef>,
    #[serde(default)]
    terrain: BTreeMap<String, BTreeMap<String, f32>>,
}

#[derive(Debug, Deserialize)]
struct ContrastDef {
    category: String,
    #[serde(default)]
    weights: Vec<WeightDef>,
}

#[derive(Debug, Deserialize)]
struct WeightDef {
    category: Option<String>,
    unit: Option<String>,
    weight: f32,
}

/// Parse a unit-variant enum from its name
fn parse_name<T: DeserializeOwned>(name: &str) -> Option<T> {
    T::deserialize(StrDeserializer::<ValueError>::new(name)).ok()
}

impl ContrastTable {
    /// Build a table from TOML content, resolving unit names in `units`
    pub fn from_toml_str(content: &str, units: &UnitTypeRegistry) -> Result<Self, LoadError> {
        let file: ContrastFile = toml::from_str(content)?;

        let mut table = ContrastTable::new();

        for def in file.contrast {
            let Some(category) = CategoryMask::from_name(&def.category) else {
                tracing::warn!("Unknown contrast category '{}', skipping", def.category);
                continue;
            };

            let weights = def
                .weights
                .iter()
                .filter_map(|w| match (&w.unit, &w.category) {
                    (Some(unit), _) => match units.id_of(unit) {
                        Some(id) => Some(ContrastWeight::unit(id, w.weight)),
                        None => {
                            tracing::warn!("Unknown unit type '{}' in contrast data", unit);
                            None
                        }
                    },
                    (None, Some(name)) => match CategoryMask::from_name(name) {
                        Some(mask) => Some(ContrastWeight::category(mask, w.weight)),
                        None => {
                            tracing::warn!("Unknown category '{}' in contrast data", name);
                            None
                        }
                    },
                    (None, None) => {
                        tracing::warn!(
                            "Weight entry under '{}' names neither a unit nor a category",
                            def.category
                        );
                        None
                    }
                })
                .collect();
            table.insert(category, weights);
        }

        for (terrain_name, classes) in &file.terrain {
            let Some(terrain) = parse_name::<Terrain>(terrain_name) else {
                tracing::warn!("Unrecognized terrain '{}'", terrain_name);
                continue;
            };
            for (class_name, value) in classes {
                match parse_name::<MovementClass>(class_name) {
                    Some(class) => table.set_terrain_effectiveness(terrain, class, *value),
                    None => tracing::warn!("Unrecognized movement class '{}'", class_name),
                }
            }
        }

        Ok(table)
    }

    /// Load a contrast table from a TOML file
    pub fn load(path: &Path, units: &UnitTypeRegistry) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content, units)
    }

    /// Load a contrast table, falling back to an empty (neutral) one
    pub fn load_or_default(path: &Path, units: &UnitTypeRegistry) -> Self {
        match Self::load(path, units) {
            Ok(table) => table,
            Err(e) => {
                tracing::error!(
                    "Failed to load contrast data from {}: {}; using neutral weights",
                    path.display(),
                    e
                );
                ContrastTable::new()
            }
        }
    }
}
