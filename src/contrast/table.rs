//! Category contrast weights and terrain effectiveness
//!
//! The contrast table answers "how well does this unit type fight that
//! category": each target category lists weighted entries that match
//! attackers either by exact type or by category. Weight 1.0 is neutral.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::types::{CategoryMask, MovementClass, Terrain, UnitTypeId};
use crate::units::unit_type::UnitType;

/// What a weight entry matches against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ContrastTarget {
    Unit(UnitTypeId),
    Category(CategoryMask),
}

/// One weighted entry in a category's list
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContrastWeight {
    pub target: ContrastTarget,
    pub weight: f32,
}

impl ContrastWeight {
    pub fn unit(unit_type: UnitTypeId, weight: f32) -> Self {
        Self {
            target: ContrastTarget::Unit(unit_type),
            weight,
        }
    }

    pub fn category(category: CategoryMask, weight: f32) -> Self {
        Self {
            target: ContrastTarget::Category(category),
            weight,
        }
    }

    fn is_exact(&self, unit_type: &UnitType) -> bool {
        matches!(self.target, ContrastTarget::Unit(id) if id == unit_type.id)
    }

    fn matches_category(&self, unit_type: &UnitType) -> bool {
        matches!(self.target, ContrastTarget::Category(mask) if mask.intersects(unit_type.categories))
    }
}

/// Read-only contrast and terrain data, built once and shared
#[derive(Debug, Clone, Default)]
pub struct ContrastTable {
    /// Keyed by target category; iteration order defines profile layout
    entries: BTreeMap<CategoryMask, Vec<ContrastWeight>>,
    terrain: AHashMap<Terrain, AHashMap<MovementClass, f32>>,
}

impl ContrastTable {
    /// Empty table; every query falls back to its neutral answer
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of target categories
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Add (or extend) the weight list of a target category
    pub fn insert(&mut self, category: CategoryMask, weights: Vec<ContrastWeight>) {
        self.entries.entry(category).or_default().extend(weights);
    }

    /// Set how effective a movement class is on a terrain
    ///
    /// Negative values are clamped to 0.
    pub fn set_terrain_effectiveness(&mut self, terrain: Terrain, movement: MovementClass, value: f32) {
        let value = if value < 0.0 {
            tracing::warn!(
                "Effectiveness for {:?} on {:?} is negative ({}), clamping to 0",
                movement,
                terrain,
                value
            );
            0.0
        } else {
            value
        };
        self.terrain.entry(terrain).or_default().insert(movement, value);
    }

    pub fn lookup(&self, category: CategoryMask) -> Option<&[ContrastWeight]> {
        self.entries.get(&category).map(Vec::as_slice)
    }

    /// Target categories in table order
    pub fn categories(&self) -> impl Iterator<Item = CategoryMask> + '_ {
        self.entries.keys().copied()
    }

    /// Highest weight matching the unit type, an explicit type entry winning
    /// outright
    pub fn best_contrast_factor(&self, unit_type: &UnitType, category: CategoryMask) -> f32 {
        let Some(weights) = self.entries.get(&category) else {
            return 0.0;
        };

        let mut best = 0.0f32;
        for entry in weights {
            if entry.is_exact(unit_type) {
                return entry.weight;
            }
            if entry.matches_category(unit_type) {
                best = best.max(entry.weight);
            }
        }
        best
    }

    /// Average of the non-neutral weights matching the unit type
    ///
    /// Neutral entries still count as a match, so a type matched only by
    /// 1.0 weights gets 1.0 while a type matched by nothing gets 0.0.
    pub fn average_contrast_factor(&self, unit_type: &UnitType, category: CategoryMask) -> f32 {
        let Some(weights) = self.entries.get(&category) else {
            return 0.0;
        };

        let mut total = 0.0f32;
        let mut count = 0u32;
        let mut matched = false;
        for entry in weights {
            if entry.is_exact(unit_type) {
                return entry.weight;
            }
            if entry.matches_category(unit_type) {
                matched = true;
                if entry.weight != 1.0 {
                    total += entry.weight;
                    count += 1;
                }
            }
        }

        match (count, matched) {
            (0, true) => 1.0,
            (0, false) => 0.0,
            _ => total / count as f32,
        }
    }

    /// Power multiplier for a movement class on a terrain (1.0 if unlisted)
    pub fn effectiveness_on_terrain(&self, movement: MovementClass, terrain: Terrain) -> f32 {
        self.terrain
            .get(&terrain)
            .and_then(|per_class| per_class.get(&movement))
            .copied()
            .unwrap_or(1.0)
    }
}
