//! Combatant arena
//!
//! Every participant of a battle lives in one arena slot for the whole
//! battle. Sides and display slots refer to combatants by `CombatantId`;
//! death marks the slot instead of freeing it, so ids stay comparable.

use serde::{Deserialize, Serialize};

use crate::core::error::FatalError;
use crate::core::types::{CombatantId, Domain, ObjectId, PlayerId};
use crate::units::object::GameObject;
use crate::units::registry::UnitTypeRegistry;
use crate::units::unit_type::UnitType;

/// Lifecycle of a combatant within one battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatantStatus {
    Active,
    Destroyed,
    Evacuated,
    /// Dropped at cleanup
    Released,
}

/// One participant: a ship, squadron, company, structure or planetary base
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combatant {
    pub id: CombatantId,
    pub object: GameObject,
    pub side: usize,
    pub status: CombatantStatus,
    /// Display hit points, used only by the on-screen exchange
    pub health: f32,
    pub max_health: f32,
}

impl Combatant {
    pub fn owner(&self) -> PlayerId {
        self.object.owner
    }

    pub fn object_id(&self) -> ObjectId {
        self.object.id
    }

    pub fn is_alive(&self) -> bool {
        self.status == CombatantStatus::Active
    }

    /// Alive and not yet shot down in the display exchange
    pub fn is_display_alive(&self) -> bool {
        self.is_alive() && self.health > 0.0
    }

    pub fn health_ratio(&self) -> f32 {
        if self.max_health <= 0.0 {
            0.0
        } else {
            (self.health / self.max_health).clamp(0.0, 1.0)
        }
    }

    /// Type the combatant fights as in this domain
    pub fn combat_type<'a>(&self, domain: Domain, units: &'a UnitTypeRegistry) -> Option<&'a UnitType> {
        self.object
            .combat_type(domain, units)
            .and_then(|id| units.get(id))
    }

    pub fn take_damage(&mut self, amount: f32) {
        self.health = (self.health - amount.max(0.0)).max(0.0);
    }
}

/// Storage for every combatant of the current battle
#[derive(Debug, Clone, Default)]
pub struct CombatantArena {
    slots: Vec<Combatant>,
}

impl CombatantArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, object: GameObject, side: usize, max_health: f32) -> CombatantId {
        let id = CombatantId(self.slots.len());
        self.slots.push(Combatant {
            id,
            object,
            side,
            status: CombatantStatus::Active,
            health: max_health,
            max_health,
        });
        id
    }

    pub fn get(&self, id: CombatantId) -> Option<&Combatant> {
        self.slots.get(id.0)
    }

    pub fn get_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.slots.get_mut(id.0)
    }

    /// Like `get`, but a missing id is an integration bug
    pub fn require(&self, id: CombatantId) -> Result<&Combatant, FatalError> {
        self.get(id).ok_or(FatalError::MissingCombatant(id))
    }

    pub fn require_mut(&mut self, id: CombatantId) -> Result<&mut Combatant, FatalError> {
        self.get_mut(id).ok_or(FatalError::MissingCombatant(id))
    }

    /// Active combatant wrapping the given object, if any
    pub fn find_active(&self, object: ObjectId) -> Option<CombatantId> {
        self.slots
            .iter()
            .find(|c| c.is_alive() && c.object.id == object)
            .map(|c| c.id)
    }

    pub fn set_status(&mut self, id: CombatantId, status: CombatantStatus) {
        if let Some(combatant) = self.slots.get_mut(id.0) {
            combatant.status = status;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Release every active combatant; ids handed out so far stay valid
    pub fn release_all(&mut self) {
        for combatant in &mut self.slots {
            if combatant.is_alive() {
                combatant.status = CombatantStatus::Released;
            }
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::UnitTypeId;

    #[test]
    fn test_ids_survive_death() {
        let mut arena = CombatantArena::new();
        let a = arena.insert(GameObject::ship(1, PlayerId(1), UnitTypeId(1)), 0, 100.0);
        let b = arena.insert(GameObject::ship(2, PlayerId(2), UnitTypeId(1)), 1, 100.0);
        assert_ne!(a, b);

        arena.set_status(a, CombatantStatus::Destroyed);
        assert!(!arena.get(a).unwrap().is_alive());
        assert_eq!(arena.find_active(ObjectId(1)), None);
        assert_eq!(arena.find_active(ObjectId(2)), Some(b));

        let c = arena.insert(GameObject::ship(3, PlayerId(1), UnitTypeId(1)), 0, 100.0);
        assert_ne!(a, c);
    }

    #[test]
    fn test_display_damage() {
        let mut arena = CombatantArena::new();
        let id = arena.insert(GameObject::ship(1, PlayerId(1), UnitTypeId(1)), 0, 80.0);
        let combatant = arena.get_mut(id).unwrap();
        combatant.take_damage(20.0);
        assert_eq!(combatant.health_ratio(), 0.75);
        combatant.take_damage(500.0);
        assert!(!combatant.is_display_alive());
        assert!(combatant.is_alive());
    }

    #[test]
    fn test_missing_combatant_is_fatal() {
        let arena = CombatantArena::new();
        assert_eq!(
            arena.require(CombatantId(4)).unwrap_err(),
            FatalError::MissingCombatant(CombatantId(4))
        );
    }
}
