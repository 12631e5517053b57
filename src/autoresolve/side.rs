//! One belligerent in an auto-resolved battle
//!
//! A side owns the queue of its live combatants, its baseline force profile,
//! its weakest unit and super weapon bookkeeping, and the two display slots
//! (front unit and escort) used by the on-screen exchange.

use serde::{Deserialize, Serialize};

use super::combatant::CombatantArena;
use crate::contrast::profile::ForceProfile;
use crate::core::types::{CombatantId, Domain, PlayerId};
use crate::units::registry::UnitTypeRegistry;

/// Display bookkeeping holds at most this many recent damaged/destroyed units
const RECENT_SLOTS: usize = 2;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Side {
    pub owner: Option<PlayerId>,
    /// Live roster; removal happens on death, evacuation or cleanup
    pub queue: Vec<CombatantId>,
    pub baseline: ForceProfile,
    pub weakest: Option<CombatantId>,
    pub super_weapon: Option<CombatantId>,
    pub super_weapon_killer: Option<CombatantId>,

    // Display exchange
    pub unit: Option<CombatantId>,
    pub escort: Option<CombatantId>,
    pub unit_target: Option<CombatantId>,
    pub escort_target: Option<CombatantId>,
    pub damaged: [Option<CombatantId>; RECENT_SLOTS],
    pub destroyed: [Option<CombatantId>; RECENT_SLOTS],
    pub evacuated: [Option<CombatantId>; RECENT_SLOTS],
    pub reposition_delay: u32,
    pub new_unit: bool,
    pub new_escort: bool,
}

impl Side {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything; the side is free for a new owner
    pub fn reset(&mut self) {
        *self = Side::default();
    }

    pub fn contains(&self, id: CombatantId) -> bool {
        self.queue.contains(&id)
    }

    pub fn push(&mut self, id: CombatantId) {
        self.queue.push(id);
    }

    /// Drop a combatant from the roster and from every slot
    pub fn remove(&mut self, id: CombatantId) {
        self.queue.retain(|queued| *queued != id);
        if self.unit == Some(id) {
            self.unit = None;
        }
        if self.escort == Some(id) {
            self.escort = None;
        }
        if self.weakest == Some(id) {
            self.weakest = None;
        }
    }

    pub fn unit_count(&self) -> usize {
        self.queue.len()
    }

    /// Refill the front and escort display slots from the queue
    ///
    /// The front slot prefers non-escorts, then the lowest formation
    /// priority. The escort slot takes escorts only, lowest priority first.
    /// Returns false when nothing was placed.
    pub fn update_positions(&mut self, arena: &CombatantArena, units: &UnitTypeRegistry, domain: Domain) -> bool {
        self.new_unit = false;
        self.new_escort = false;

        // Slots whose occupant went down are freed first
        for slot in [&mut self.unit, &mut self.escort] {
            if let Some(id) = *slot {
                if !arena.get(id).is_some_and(|c| c.is_display_alive()) {
                    *slot = None;
                }
            }
        }

        let candidates: Vec<(CombatantId, bool, i32)> = self
            .queue
            .iter()
            .filter(|id| Some(**id) != self.unit && Some(**id) != self.escort)
            .filter_map(|id| {
                let combatant = arena.get(*id)?;
                if !combatant.is_display_alive() {
                    return None;
                }
                let ty = combatant.combat_type(domain, units)?;
                Some((*id, ty.escort, ty.formation_priority))
            })
            .collect();

        if candidates.is_empty() {
            return false;
        }

        if self.unit.is_none() && self.escort.is_none() {
            self.reposition_delay = 0;
        }

        if self.reposition_delay > 0 {
            self.reposition_delay -= 1;
            return false;
        }

        let mut remaining = candidates;

        if self.unit.is_none() {
            let mut best: Option<usize> = None;
            for (index, (_, escort, priority)) in remaining.iter().enumerate() {
                let Some(current) = best else {
                    best = Some(index);
                    continue;
                };
                let (_, best_escort, best_priority) = remaining[current];
                if best_escort && !escort {
                    best = Some(index);
                } else if (!escort || best_escort) && best_priority > *priority {
                    best = Some(index);
                }
            }
            if let Some(index) = best {
                let (id, _, _) = remaining.remove(index);
                self.unit = Some(id);
                self.new_unit = true;
            }
        }

        if self.escort.is_none() {
            let best = remaining
                .iter()
                .enumerate()
                .filter(|(_, (_, escort, _))| *escort)
                .fold(None::<(usize, i32)>, |best, (index, (_, _, priority))| match best {
                    Some((_, best_priority)) if best_priority <= *priority => best,
                    _ => Some((index, *priority)),
                });
            if let Some((index, _)) = best {
                self.escort = Some(remaining[index].0);
                self.new_escort = true;
            }
        }

        true
    }

    /// Whether any live combatant is immune to retreat in this domain
    pub fn has_retreat_protection(&self, arena: &CombatantArena, units: &UnitTypeRegistry, domain: Domain) -> bool {
        self.queue.iter().any(|id| {
            arena
                .get(*id)
                .filter(|c| c.is_alive())
                .and_then(|c| c.combat_type(domain, units))
                .is_some_and(|ty| match domain {
                    Domain::Space => ty.space_retreat_immunity,
                    Domain::Land => ty.land_retreat_immunity,
                })
        })
    }

    /// Best defensive bonus among live combatants
    pub fn defense_bonus(&self, arena: &CombatantArena, units: &UnitTypeRegistry, domain: Domain) -> f32 {
        self.queue
            .iter()
            .filter_map(|id| arena.get(*id))
            .filter(|c| c.is_alive())
            .filter_map(|c| c.combat_type(domain, units))
            .map(|ty| match domain {
                Domain::Space => ty.space_defense_bonus,
                Domain::Land => ty.land_defense_bonus,
            })
            .fold(0.0, f32::max)
    }

    pub fn mark_damaged(&mut self, id: CombatantId) {
        Self::remember(&mut self.damaged, id);
    }

    pub fn mark_destroyed(&mut self, id: CombatantId) {
        Self::remember(&mut self.destroyed, id);
    }

    pub fn mark_evacuated(&mut self, id: CombatantId) {
        Self::remember(&mut self.evacuated, id);
    }

    fn remember(slots: &mut [Option<CombatantId>; RECENT_SLOTS], id: CombatantId) {
        if slots.contains(&Some(id)) {
            return;
        }
        match slots.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => *slot = Some(id),
            None => {
                slots.rotate_left(1);
                slots[RECENT_SLOTS - 1] = Some(id);
            }
        }
    }
}
