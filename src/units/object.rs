//! Game objects handed to the engine at intake
//!
//! A `GameObject` is a snapshot of something on the galactic map. Container
//! objects (fleets, transports, planets) carry their contents so intake can
//! expand them into individual combatants.

use serde::{Deserialize, Serialize};

use crate::core::types::{Domain, ObjectId, PlayerId, Terrain, UnitTypeId};
use crate::units::registry::UnitTypeRegistry;

/// What kind of participant an object is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectKind {
    Ship,
    Squadron,
    GroundUnit,
    Structure,
    Fleet(Vec<GameObject>),
    Transport(Vec<GameObject>),
    Planet(Box<PlanetData>),
    /// Anything the engine has no combat behavior for
    Unknown(String),
}

/// A participant snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameObject {
    pub id: ObjectId,
    pub owner: PlayerId,
    /// Type of the object itself; planets fight as their current base type
    pub unit_type: UnitTypeId,
    pub has_named_hero: bool,
    /// Spawned by a running tactical battle rather than built on the map
    pub spawned_in_tactical: bool,
    pub kind: ObjectKind,
}

impl GameObject {
    pub fn new(id: ObjectId, owner: PlayerId, unit_type: UnitTypeId, kind: ObjectKind) -> Self {
        Self {
            id,
            owner,
            unit_type,
            has_named_hero: false,
            spawned_in_tactical: false,
            kind,
        }
    }

    pub fn ship(id: u32, owner: PlayerId, unit_type: UnitTypeId) -> Self {
        Self::new(ObjectId(id), owner, unit_type, ObjectKind::Ship)
    }

    pub fn ground_unit(id: u32, owner: PlayerId, unit_type: UnitTypeId) -> Self {
        Self::new(ObjectId(id), owner, unit_type, ObjectKind::GroundUnit)
    }

    pub fn with_hero(mut self) -> Self {
        self.has_named_hero = true;
        self
    }

    pub fn is_transport(&self) -> bool {
        matches!(self.kind, ObjectKind::Transport(_))
    }

    pub fn is_planet(&self) -> bool {
        matches!(self.kind, ObjectKind::Planet(_))
    }

    pub fn is_structure(&self) -> bool {
        matches!(self.kind, ObjectKind::Structure)
    }

    pub fn planet(&self) -> Option<&PlanetData> {
        match &self.kind {
            ObjectKind::Planet(data) => Some(data),
            _ => None,
        }
    }

    pub fn planet_mut(&mut self) -> Option<&mut PlanetData> {
        match &mut self.kind {
            ObjectKind::Planet(data) => Some(data),
            _ => None,
        }
    }

    /// Contents of a fleet or transport
    pub fn contents(&self) -> &[GameObject] {
        match &self.kind {
            ObjectKind::Fleet(members) | ObjectKind::Transport(members) => members,
            _ => &[],
        }
    }

    /// Whether this object or anything it carries is a named hero
    pub fn contains_named_hero(&self) -> bool {
        self.has_named_hero || self.contents().iter().any(GameObject::contains_named_hero)
    }

    /// Type this object is compared as in force arithmetic
    ///
    /// Planets use their current base for the domain; transports use the
    /// unique unit type they carry for that domain, if any.
    pub fn combat_type(&self, domain: Domain, units: &UnitTypeRegistry) -> Option<UnitTypeId> {
        match &self.kind {
            ObjectKind::Planet(data) => data.base_type(domain),
            ObjectKind::Transport(_) => {
                let own = units.get(self.unit_type)?;
                let container = match domain {
                    Domain::Space => own.unique_space_container,
                    Domain::Land => own.unique_ground_container,
                };
                Some(container.unwrap_or(self.unit_type))
            }
            _ => Some(self.unit_type),
        }
    }
}

/// Planetary state relevant to a battle over the planet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanetData {
    pub planet_type: String,
    pub terrain: Option<Terrain>,
    /// Star base types, one per level; level 1 is the first entry
    pub base_ladder: Vec<UnitTypeId>,
    /// Current star base level (0 = no star base)
    pub base_level: usize,
    pub ground_base: Option<UnitTypeId>,
    pub ground_structures: Vec<GameObject>,
    pub space_structures: Vec<GameObject>,
    pub landed_transports: Vec<GameObject>,
    pub orbiting_fleets: Vec<GameObject>,
    /// Tactical defenses built on the surface (turret types)
    pub turrets: Vec<UnitTypeId>,
    /// Ion cannon stun rate, in display rounds between stuns (0 = none)
    pub stun_rate: u32,
    /// Hypervelocity gun rate, in display rounds between shots (0 = none)
    pub hit_rate: u32,
    pub hit_damage: f32,
}

impl PlanetData {
    /// Current base type for the domain, if one stands
    pub fn base_type(&self, domain: Domain) -> Option<UnitTypeId> {
        match domain {
            Domain::Space => self.star_base(),
            Domain::Land => self.ground_base,
        }
    }

    pub fn star_base(&self) -> Option<UnitTypeId> {
        self.base_level
            .checked_sub(1)
            .and_then(|index| self.base_ladder.get(index))
            .copied()
    }

    /// Strongest star base level, no higher than the current one, whose
    /// power the remaining force can still afford
    pub fn base_level_for_rating(
        &self,
        remaining_force: f32,
        allowance: f32,
        units: &UnitTypeRegistry,
    ) -> usize {
        (1..=self.base_level.min(self.base_ladder.len()))
            .rev()
            .find(|level| {
                units
                    .get(self.base_ladder[level - 1])
                    .is_some_and(|base| base.power * allowance < remaining_force)
            })
            .unwrap_or(0)
    }
}
