//! Unit and structure types and their combat properties
//!
//! Types are static data: the engine only ever reads them. Instances of a
//! type are `GameObject`s handed to the engine at intake.

use serde::{Deserialize, Serialize};

use crate::core::types::{CategoryMask, MovementClass, UnitTypeId};

/// Broad behavior of a type, as far as auto-resolve cares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitRole {
    #[default]
    Unit,
    Transport,
    StarBase,
    GroundBase,
    Structure,
}

/// Units a type brings along at a given owner tech level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GarrisonSpawn {
    pub tech_level: u32,
    pub unit_type: UnitTypeId,
    pub count: u32,
}

/// Strength multiplier a hero grants to friendly units of a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityFactor {
    pub category: CategoryMask,
    pub factor: f32,
}

/// Static description of a unit or structure type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitType {
    pub id: UnitTypeId,
    pub name: String,
    /// Combat power metric; the currency of all force arithmetic
    pub power: f32,
    pub categories: CategoryMask,
    pub movement_class: MovementClass,
    pub role: UnitRole,
    pub can_space: bool,
    pub can_land: bool,
    pub base_level: u8,
    pub hit_points: f32,
    /// Damage dealt per volley in the display exchange
    pub damage: f32,
    pub escort: bool,
    pub formation_priority: i32,
    pub space_retreat_immunity: bool,
    pub land_retreat_immunity: bool,
    pub space_defense_bonus: f32,
    pub land_defense_bonus: f32,
    pub capital: bool,
    pub super_weapon: bool,
    pub super_weapon_killer: bool,
    pub squadron_units: Vec<UnitTypeId>,
    pub company_units: Vec<UnitTypeId>,
    pub unique_space_container: Option<UnitTypeId>,
    pub unique_ground_container: Option<UnitTypeId>,
    pub land_bomber: Option<UnitTypeId>,
    pub garrison: Vec<GarrisonSpawn>,
    pub ability_factors: Vec<AbilityFactor>,
}

impl UnitType {
    /// New plain combat unit; the registry assigns the real id
    pub fn new(name: impl Into<String>, power: f32, categories: CategoryMask) -> Self {
        Self {
            id: UnitTypeId(0),
            name: name.into(),
            power,
            categories,
            movement_class: MovementClass::default(),
            role: UnitRole::Unit,
            can_space: true,
            can_land: false,
            base_level: 0,
            hit_points: power.max(1.0),
            damage: (power * 0.1).max(1.0),
            escort: false,
            formation_priority: 0,
            space_retreat_immunity: false,
            land_retreat_immunity: false,
            space_defense_bonus: 0.0,
            land_defense_bonus: 0.0,
            capital: false,
            super_weapon: false,
            super_weapon_killer: false,
            squadron_units: Vec::new(),
            company_units: Vec::new(),
            unique_space_container: None,
            unique_ground_container: None,
            land_bomber: None,
            garrison: Vec::new(),
            ability_factors: Vec::new(),
        }
    }

    /// Fights on land only
    pub fn land(mut self) -> Self {
        self.can_space = false;
        self.can_land = true;
        self
    }

    pub fn with_role(mut self, role: UnitRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_movement(mut self, movement_class: MovementClass) -> Self {
        self.movement_class = movement_class;
        self
    }

    pub fn with_garrison(mut self, tech_level: u32, unit_type: UnitTypeId, count: u32) -> Self {
        self.garrison.push(GarrisonSpawn {
            tech_level,
            unit_type,
            count,
        });
        self
    }

    pub fn with_ability(mut self, category: CategoryMask, factor: f32) -> Self {
        self.ability_factors.push(AbilityFactor { category, factor });
        self
    }

    pub fn escort(mut self, formation_priority: i32) -> Self {
        self.escort = true;
        self.formation_priority = formation_priority;
        self
    }

    pub fn super_weapon(mut self) -> Self {
        self.super_weapon = true;
        self
    }

    pub fn super_weapon_killer(mut self) -> Self {
        self.super_weapon_killer = true;
        self
    }

    pub fn is_transport(&self) -> bool {
        self.role == UnitRole::Transport
    }

    pub fn is_star_base(&self) -> bool {
        self.role == UnitRole::StarBase
    }

    pub fn is_ground_base(&self) -> bool {
        self.role == UnitRole::GroundBase
    }

    pub fn is_structure(&self) -> bool {
        self.role == UnitRole::Structure
    }

    /// Whether untargeted damage from this type lands in the ground catch-all
    pub fn is_ground(&self) -> bool {
        !self.company_units.is_empty()
            || self.is_ground_base()
            || (self.can_land && !self.can_space)
    }

    pub fn has_special_ability(&self) -> bool {
        !self.ability_factors.is_empty()
    }

    /// Garrison spawned at the given owner tech level
    ///
    /// Uses the highest defined tech tier that does not exceed `tech_level`.
    pub fn garrison_at(&self, tech_level: u32) -> impl Iterator<Item = &GarrisonSpawn> {
        let tier = self
            .garrison
            .iter()
            .map(|spawn| spawn.tech_level)
            .filter(|level| *level <= tech_level)
            .max();
        self.garrison
            .iter()
            .filter(move |spawn| Some(spawn.tech_level) == tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garrison_uses_highest_reached_tier() {
        let ty = UnitType::new("Outpost", 100.0, CategoryMask::STRUCTURE)
            .with_garrison(0, UnitTypeId(7), 2)
            .with_garrison(2, UnitTypeId(8), 1)
            .with_garrison(4, UnitTypeId(9), 3);

        let at_three: Vec<_> = ty.garrison_at(3).map(|s| s.unit_type).collect();
        assert_eq!(at_three, vec![UnitTypeId(8)]);

        let at_zero: Vec<_> = ty.garrison_at(0).map(|s| s.unit_type).collect();
        assert_eq!(at_zero, vec![UnitTypeId(7)]);
    }

    #[test]
    fn test_no_garrison_below_first_tier() {
        let ty = UnitType::new("Citadel", 100.0, CategoryMask::STRUCTURE)
            .with_garrison(2, UnitTypeId(8), 1);
        assert_eq!(ty.garrison_at(1).count(), 0);
    }

    #[test]
    fn test_ground_detection() {
        let infantry = UnitType::new("Trooper", 10.0, CategoryMask::INFANTRY).land();
        assert!(infantry.is_ground());

        let frigate = UnitType::new("Frigate", 300.0, CategoryMask::FRIGATE);
        assert!(!frigate.is_ground());

        let base = UnitType::new("Ground Base", 200.0, CategoryMask::STRUCTURE)
            .with_role(UnitRole::GroundBase);
        assert!(base.is_ground());
    }
}
