//! On-screen exchange between the front and escort slots
//!
//! Display only: damage dealt here moves display health and the
//! damaged/destroyed bookkeeping the presentation layer reads. The battle
//! outcome is decided by the force arithmetic alone.

use std::sync::Arc;

use super::engine::AutoResolveEngine;
use super::events::BattleEventType;
use crate::core::error::{FatalError, Rejection, Result};
use crate::core::types::{CombatantId, PlayerId};

/// Health ratio thresholds that are worth showing as damage
const DAMAGE_THRESHOLDS: [f32; 3] = [0.75, 0.5, 0.25];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Unit,
    Escort,
}

/// Whether going from `old` to `new` health crosses a display threshold
pub fn show_damage_for(old: f32, new: f32) -> bool {
    DAMAGE_THRESHOLDS
        .iter()
        .any(|threshold| old > *threshold && new <= *threshold)
}

impl AutoResolveEngine {
    /// One display exchange: refill slots, then both sides' escorts and
    /// front units fire. The side that fires first alternates every step.
    pub fn skirmish_step(&mut self) -> Result<()> {
        if !self.state.initiated {
            return Err(Rejection::NotReady.into());
        }

        let units = Arc::clone(&self.units);
        let domain = self.state.domain;
        let delay = self.config.reposition_delay;
        for side in &mut self.sides {
            // A slot whose occupant went down waits before the next unit moves up
            let vacated = [side.unit, side.escort]
                .into_iter()
                .flatten()
                .any(|id| !self.arena.get(id).is_some_and(|c| c.is_display_alive()));
            if vacated && side.reposition_delay == 0 {
                side.reposition_delay = delay;
            }
            side.update_positions(&self.arena, &units, domain);
        }

        let escort_first = self.state.escort_fire.unwrap_or(0);
        self.slot_fire(Slot::Escort, escort_first)?;
        self.slot_fire(Slot::Escort, 1 - escort_first)?;
        self.state.escort_fire = Some(1 - escort_first);

        let unit_first = self.state.unit_fire.unwrap_or(0);
        self.slot_fire(Slot::Unit, unit_first)?;
        self.slot_fire(Slot::Unit, 1 - unit_first)?;
        self.state.unit_fire = Some(1 - unit_first);

        Ok(())
    }

    fn slot_fire(&mut self, slot: Slot, side: usize) -> Result<()> {
        let other = 1 - side;
        let owner = self.sides[side].owner;
        if owner.is_some() && self.state.retreating == owner {
            return Ok(());
        }

        let attacker = match slot {
            Slot::Unit => self.sides[side].unit,
            Slot::Escort => self.sides[side].escort,
        };
        let Some(attacker) = attacker.filter(|id| self.display_alive(*id)) else {
            return Ok(());
        };

        let target = self.sides[other]
            .escort
            .filter(|id| self.display_alive(*id))
            .or(self.sides[other].unit);
        let Some(target) = target else {
            return Ok(());
        };
        match slot {
            Slot::Unit => self.sides[side].unit_target = Some(target),
            Slot::Escort => self.sides[side].escort_target = Some(target),
        }
        if !self.display_alive(target) {
            return Ok(());
        }

        let units = Arc::clone(&self.units);
        let domain = self.state.domain;
        let attacker_type = {
            let combatant = self.arena.require(attacker)?;
            combatant
                .combat_type(domain, &units)
                .ok_or(FatalError::UnknownUnitType(combatant.object_id()))?
        };

        let mut stunned = false;
        if slot == Slot::Unit && attacker_type.capital && domain.is_space() {
            let planet_owner = owner.is_some() && self.state.planet_owner == owner;

            if planet_owner && self.state.stun_counter == 1 {
                stunned = true;
                self.state.stun_counter = i64::from(self.state.stun_rate);
            } else {
                self.state.stun_counter -= 1;
            }

            if planet_owner && self.state.hit_counter == 1 {
                let hit_damage = self.state.hit_damage;
                self.arena.require_mut(attacker)?.take_damage(hit_damage);
                if !self.display_alive(attacker) {
                    self.sides[side].mark_destroyed(attacker);
                }
                self.state.hit_counter = i64::from(self.state.hit_rate);
            } else {
                self.state.hit_counter -= 1;
            }
        }

        if stunned || !self.display_alive(attacker) {
            return Ok(());
        }

        let mut adjust = 1.0;
        if !domain.is_space() && self.sides[other].owner.is_some() && self.sides[other].owner == self.state.planet_owner {
            adjust = self.config.default_defense_adjust;
        }
        adjust *= 1.0 - self.sides[other].defense_bonus(&self.arena, &units, domain);
        let damage = attacker_type.damage * adjust;

        let target_combatant = self.arena.require_mut(target)?;
        let old_ratio = target_combatant.health_ratio();
        target_combatant.take_damage(damage);
        let new_ratio = target_combatant.health_ratio();
        let still_up = target_combatant.is_display_alive();

        if still_up {
            if show_damage_for(old_ratio, new_ratio) {
                self.sides[other].mark_damaged(target);
                self.log_event(
                    BattleEventType::UnitDamaged {
                        combatant: target,
                        health_ratio: new_ratio,
                    },
                    format!("{} hit {:?} down to {:.0}%", attacker_type.name, target, new_ratio * 100.0),
                );
            }
        } else {
            self.sides[other].mark_destroyed(target);
        }
        Ok(())
    }

    fn display_alive(&self, id: CombatantId) -> bool {
        self.arena.get(id).is_some_and(|combatant| combatant.is_display_alive())
    }

    pub fn was_participant_damaged(&self, id: CombatantId) -> bool {
        self.sides.iter().any(|side| side.damaged.contains(&Some(id)))
    }

    pub fn was_participant_destroyed(&self, id: CombatantId) -> bool {
        self.sides.iter().any(|side| side.destroyed.contains(&Some(id)))
    }

    pub fn was_participant_evacuated(&self, id: CombatantId) -> bool {
        self.sides.iter().any(|side| side.evacuated.contains(&Some(id)))
    }

    /// Front unit of an owner's side
    pub fn unit(&self, owner: PlayerId) -> Option<CombatantId> {
        self.side_by_owner(owner)?.unit
    }

    pub fn escort(&self, owner: PlayerId) -> Option<CombatantId> {
        self.side_by_owner(owner)?.escort
    }

    pub fn unit_target(&self, owner: PlayerId) -> Option<CombatantId> {
        self.side_by_owner(owner)?.unit_target
    }

    pub fn escort_target(&self, owner: PlayerId) -> Option<CombatantId> {
        self.side_by_owner(owner)?.escort_target
    }

    pub fn which_unit_fires_first(&self) -> Option<CombatantId> {
        self.state.unit_fire.and_then(|side| self.sides[side].unit)
    }

    pub fn which_escort_fires_first(&self) -> Option<CombatantId> {
        self.state.escort_fire.and_then(|side| self.sides[side].escort)
    }
}
