//! Unit type registry for loading and looking up unit types.
//!
//! Types reference each other by name in data files (squadron members,
//! garrison spawns, bomber types). Loading happens in two passes: every name
//! is assigned an id first, then references are resolved.

use ahash::AHashMap;
use serde::Deserialize;
use std::path::Path;

use super::unit_type::{AbilityFactor, GarrisonSpawn, UnitRole, UnitType};
use crate::core::error::LoadError;
use crate::core::types::{CategoryMask, MovementClass, UnitTypeId};

/// Registry of every unit and structure type known to the engine
#[derive(Debug, Clone, Default)]
pub struct UnitTypeRegistry {
    /// Types indexed by ID
    types: AHashMap<UnitTypeId, UnitType>,
    /// Map from name to ID for fast lookup
    by_name: AHashMap<String, UnitTypeId>,
    /// Next type ID to assign
    next_id: u32,
}

impl UnitTypeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            types: AHashMap::new(),
            by_name: AHashMap::new(),
            next_id: 1,
        }
    }

    /// Register a type and return its assigned ID
    ///
    /// Registering a name twice replaces the earlier definition but keeps
    /// its id, so references to it stay valid.
    pub fn register(&mut self, mut unit_type: UnitType) -> UnitTypeId {
        let id = match self.by_name.get(&unit_type.name) {
            Some(id) => *id,
            None => {
                let id = UnitTypeId(self.next_id);
                self.next_id += 1;
                self.by_name.insert(unit_type.name.clone(), id);
                id
            }
        };
        unit_type.id = id;
        self.types.insert(id, unit_type);
        id
    }

    pub fn get(&self, id: UnitTypeId) -> Option<&UnitType> {
        self.types.get(&id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&UnitType> {
        self.by_name.get(name).and_then(|id| self.types.get(id))
    }

    pub fn id_of(&self, name: &str) -> Option<UnitTypeId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Movement class used for terrain effectiveness
    ///
    /// A ground company moves like its first member.
    pub fn terrain_movement_class(&self, unit_type: &UnitType) -> MovementClass {
        unit_type
            .company_units
            .first()
            .and_then(|member| self.get(*member))
            .map(|member| member.movement_class)
            .unwrap_or(unit_type.movement_class)
    }

    /// Whether the type, or any member of its company or squadron, can kill
    /// a super weapon
    pub fn contains_super_weapon_killer(&self, unit_type: &UnitType) -> bool {
        unit_type.super_weapon_killer
            || unit_type
                .company_units
                .iter()
                .chain(unit_type.squadron_units.iter())
                .filter_map(|member| self.get(*member))
                .any(|member| member.super_weapon_killer)
    }

    /// Parse unit types from TOML content and register them all
    pub fn load_str(&mut self, content: &str) -> Result<Vec<UnitTypeId>, LoadError> {
        let file: UnitTypeFile = toml::from_str(content)?;

        // First pass: assign ids so definitions may reference later entries
        for def in &file.unit {
            if !self.by_name.contains_key(&def.name) {
                let placeholder = UnitType::new(def.name.clone(), def.power, CategoryMask::NONE);
                self.register(placeholder);
            }
        }

        let mut ids = Vec::with_capacity(file.unit.len());
        for def in file.unit {
            let unit_type = self.resolve(def)?;
            ids.push(self.register(unit_type));
        }
        Ok(ids)
    }

    /// Load unit types from a TOML file
    pub fn load_file(&mut self, path: &Path) -> Result<Vec<UnitTypeId>, LoadError> {
        let content = std::fs::read_to_string(path)?;
        self.load_str(&content)
    }

    fn lookup(&self, name: &str) -> Result<UnitTypeId, LoadError> {
        self.id_of(name)
            .ok_or_else(|| LoadError::UnknownUnitType(name.to_string()))
    }

    fn lookup_all(&self, names: &[String]) -> Result<Vec<UnitTypeId>, LoadError> {
        names.iter().map(|name| self.lookup(name)).collect()
    }

    fn lookup_opt(&self, name: &Option<String>) -> Result<Option<UnitTypeId>, LoadError> {
        name.as_deref().map(|name| self.lookup(name)).transpose()
    }

    fn resolve(&self, def: UnitTypeDef) -> Result<UnitType, LoadError> {
        if def.power < 0.0 {
            return Err(LoadError::Invalid(format!(
                "unit type '{}' has negative power {}",
                def.name, def.power
            )));
        }

        let garrison = def
            .garrison
            .iter()
            .map(|spawn| {
                Ok(GarrisonSpawn {
                    tech_level: spawn.tech_level,
                    unit_type: self.lookup(&spawn.unit)?,
                    count: spawn.count,
                })
            })
            .collect::<Result<Vec<_>, LoadError>>()?;

        let mut unit_type = UnitType::new(def.name.clone(), def.power, def.categories);
        unit_type.movement_class = def.movement_class;
        unit_type.role = def.role;
        unit_type.can_space = def.space;
        unit_type.can_land = def.land;
        unit_type.base_level = def.base_level;
        if let Some(hit_points) = def.hit_points {
            unit_type.hit_points = hit_points;
        }
        if let Some(damage) = def.damage {
            unit_type.damage = damage;
        }
        unit_type.escort = def.escort;
        unit_type.formation_priority = def.formation_priority;
        unit_type.space_retreat_immunity = def.space_retreat_immunity;
        unit_type.land_retreat_immunity = def.land_retreat_immunity;
        unit_type.space_defense_bonus = def.space_defense_bonus;
        unit_type.land_defense_bonus = def.land_defense_bonus;
        unit_type.capital = def.capital;
        unit_type.super_weapon = def.super_weapon;
        unit_type.super_weapon_killer = def.super_weapon_killer;
        unit_type.squadron_units = self.lookup_all(&def.squadron_units)?;
        unit_type.company_units = self.lookup_all(&def.company_units)?;
        unit_type.unique_space_container = self.lookup_opt(&def.unique_space_container)?;
        unit_type.unique_ground_container = self.lookup_opt(&def.unique_ground_container)?;
        unit_type.land_bomber = self.lookup_opt(&def.land_bomber)?;
        unit_type.garrison = garrison;
        unit_type.ability_factors = def.ability_factors;
        Ok(unit_type)
    }
}

/// On-disk layout of a unit type file
#[derive(Debug, Deserialize)]
struct UnitTypeFile {
    #[serde(default)]
    unit: Vec<UnitTypeDef>,
}

#[derive(Debug, Deserialize)]
struct GarrisonDef {
    #[serde(default)]
    tech_level: u32,
    unit: String,
    #[serde(default = "default_count")]
    count: u32,
}

fn default_count() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct UnitTypeDef {
    name: String,
    power: f32,
    #[serde(default)]
    categories: CategoryMask,
    #[serde(default)]
    movement_class: MovementClass,
    #[serde(default)]
    role: UnitRole,
    #[serde(default = "default_true")]
    space: bool,
    #[serde(default)]
    land: bool,
    #[serde(default)]
    base_level: u8,
    hit_points: Option<f32>,
    damage: Option<f32>,
    #[serde(default)]
    escort: bool,
    #[serde(default)]
    formation_priority: i32,
    #[serde(default)]
    space_retreat_immunity: bool,
    #[serde(default)]
    land_retreat_immunity: bool,
    #[serde(default)]
    space_defense_bonus: f32,
    #[serde(default)]
    land_defense_bonus: f32,
    #[serde(default)]
    capital: bool,
    #[serde(default)]
    super_weapon: bool,
    #[serde(default)]
    super_weapon_killer: bool,
    #[serde(default)]
    squadron_units: Vec<String>,
    #[serde(default)]
    company_units: Vec<String>,
    unique_space_container: Option<String>,
    unique_ground_container: Option<String>,
    land_bomber: Option<String>,
    #[serde(default)]
    garrison: Vec<GarrisonDef>,
    #[serde(default)]
    ability_factors: Vec<AbilityFactor>,
}
