//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

/// Owning player of a combatant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player {}", self.0)
    }
}

/// Identifier of a game object handed to the engine by the object system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

/// Stable index into the engine's combatant arena
///
/// Ids are never reused within a battle, so comparing two ids answers
/// "was this the same unit" even after the unit has been destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CombatantId(pub usize);

/// Identifier of a unit/structure type in the type registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitTypeId(pub u32);

/// Simulation frame counter (synchronized across clients)
pub type Frame = u64;

/// Which theatre a battle is fought in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Domain {
    #[default]
    Space,
    Land,
}

impl Domain {
    pub fn is_space(self) -> bool {
        matches!(self, Domain::Space)
    }

    /// Index of this domain's aggregate bucket in a force profile
    pub fn aggregate_index(self) -> usize {
        match self {
            Domain::Land => 0,
            Domain::Space => 1,
        }
    }
}

/// Bit-flag set of broad unit classes
///
/// A unit type may belong to several categories at once. The empty mask is
/// the "no category" value used by the catch-all buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CategoryMask(pub u32);

impl CategoryMask {
    pub const NONE: CategoryMask = CategoryMask(0);
    pub const FIGHTER: CategoryMask = CategoryMask(1 << 0);
    pub const BOMBER: CategoryMask = CategoryMask(1 << 1);
    pub const TRANSPORT: CategoryMask = CategoryMask(1 << 2);
    pub const CORVETTE: CategoryMask = CategoryMask(1 << 3);
    pub const FRIGATE: CategoryMask = CategoryMask(1 << 4);
    pub const CAPITAL: CategoryMask = CategoryMask(1 << 5);
    pub const SUPER: CategoryMask = CategoryMask(1 << 6);
    pub const INFANTRY: CategoryMask = CategoryMask(1 << 7);
    pub const VEHICLE: CategoryMask = CategoryMask(1 << 8);
    pub const AIR: CategoryMask = CategoryMask(1 << 9);
    pub const STRUCTURE: CategoryMask = CategoryMask(1 << 10);
    pub const LAND_HERO: CategoryMask = CategoryMask(1 << 11);
    pub const SPACE_HERO: CategoryMask = CategoryMask(1 << 12);

    const NAMES: [(&'static str, CategoryMask); 13] = [
        ("Fighter", Self::FIGHTER),
        ("Bomber", Self::BOMBER),
        ("Transport", Self::TRANSPORT),
        ("Corvette", Self::CORVETTE),
        ("Frigate", Self::FRIGATE),
        ("Capital", Self::CAPITAL),
        ("Super", Self::SUPER),
        ("Infantry", Self::INFANTRY),
        ("Vehicle", Self::VEHICLE),
        ("Air", Self::AIR),
        ("Structure", Self::STRUCTURE),
        ("LandHero", Self::LAND_HERO),
        ("SpaceHero", Self::SPACE_HERO),
    ];

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn intersects(self, other: CategoryMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn union(self, other: CategoryMask) -> CategoryMask {
        CategoryMask(self.0 | other.0)
    }

    /// Index of the lowest set bit, if any
    pub fn first_bit(self) -> Option<u32> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros())
        }
    }

    /// Indices of every set bit, lowest first
    pub fn bits(self) -> impl Iterator<Item = u32> {
        let mask = self.0;
        (0..32).filter(move |bit| mask & (1 << bit) != 0)
    }

    /// Look up a single category by its data-file name
    pub fn from_name(name: &str) -> Option<CategoryMask> {
        Self::NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, mask)| *mask)
    }

    /// Names of every category in this mask
    pub fn names(self) -> Vec<String> {
        Self::NAMES
            .iter()
            .filter(|(_, mask)| self.intersects(*mask))
            .map(|(name, _)| name.to_string())
            .collect()
    }
}

impl TryFrom<Vec<String>> for CategoryMask {
    type Error = String;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        names.iter().try_fold(CategoryMask::NONE, |acc, name| {
            CategoryMask::from_name(name)
                .map(|mask| acc.union(mask))
                .ok_or_else(|| format!("unknown category '{}'", name))
        })
    }
}

impl From<CategoryMask> for Vec<String> {
    fn from(mask: CategoryMask) -> Self {
        mask.names()
    }
}

/// Planet surface environment used for terrain effectiveness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    Temperate,
    Arctic,
    Desert,
    Forest,
    Jungle,
    Swamp,
    Volcanic,
    Urban,
    Asteroid,
}

/// How a unit moves; selects its row in the terrain effectiveness table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MovementClass {
    #[default]
    Infantry,
    LightVehicle,
    HeavyVehicle,
    Walker,
    Hover,
    Speeder,
    Building,
    Space,
    Fighter,
}
