//! Post-attack attrition
//!
//! After the attack exchange each side's remaining aggregate force is a
//! budget. Units are drawn one at a time (named heroes first, then ground
//! structures, then at random) and survive only while the budget can still
//! pay for them.

use std::sync::Arc;

use tracing::{debug, trace};

use super::combatant::CombatantStatus;
use super::engine::AutoResolveEngine;
use super::events::BattleEventType;
use crate::contrast::profile::ForceProfile;
use crate::core::error::{FatalError, Result};
use crate::core::types::{CombatantId, Domain, PlayerId, UnitTypeId};
use crate::units::object::{GameObject, ObjectKind};

/// Transports a losing side may keep out of `count` at the given loss rate
pub fn transports_allowed(count: usize, loss_rate: f32, pirate: bool) -> usize {
    if pirate || count <= 1 {
        0
    } else {
        (count as f32 * (1.0 - loss_rate) + 0.5) as usize
    }
}

impl AutoResolveEngine {
    /// Cull a losing side's transports in space
    ///
    /// Transports carrying named heroes are evacuated first, up to the
    /// allowance. Transports beyond the allowance are destroyed; the rest
    /// stay queued. Returns whether any transport got away.
    pub(crate) fn apply_transport_losses(
        &mut self,
        side: usize,
        pirate: bool,
        killer: Option<PlayerId>,
    ) -> Result<bool> {
        if !self.state.domain.is_space() {
            return Ok(false);
        }

        let mut transports = Vec::new();
        for id in &self.sides[side].queue {
            if self.arena.require(*id)?.object.is_transport() {
                transports.push(*id);
            }
        }
        if transports.is_empty() {
            return Ok(false);
        }

        let allowed = transports_allowed(transports.len(), self.config.transport_losses, pirate);
        let mut any_left = false;

        let mut evacuated = Vec::new();
        for id in &transports {
            if evacuated.len() >= allowed {
                break;
            }
            if self.arena.require(*id)?.object.contains_named_hero() {
                evacuated.push(*id);
            }
        }
        for id in &evacuated {
            self.evacuate(side, *id)?;
            any_left = true;
        }

        let mut kept = evacuated.len();
        for id in transports.into_iter().filter(|id| !evacuated.contains(id)) {
            if kept >= allowed || pirate {
                self.destroy(side, id, killer)?;
            } else {
                any_left = true;
            }
            kept += 1;
        }

        debug!(side, allowed, any_left, "Transport losses applied");
        Ok(any_left)
    }

    /// Decide which units of a side survive the battle
    ///
    /// `remaining` is the side's post-attack profile; its domain aggregate is
    /// spent as units are kept. Returns whether the side has survivors.
    pub(crate) fn apply_attrition(
        &mut self,
        side: usize,
        remaining: &mut ForceProfile,
        is_loser: bool,
        killer: Option<PlayerId>,
    ) -> Result<bool> {
        let domain = self.state.domain;
        let allowance = self.config.attrition_allowance_factor;
        let units = Arc::clone(&self.units);

        let mut budget = remaining.aggregate(domain);
        if self.state.mid_tactical {
            budget *= self.config.tactical_force_multiplier;
        }

        let weakest = self.sides[side].weakest;
        let opponent_has_killer = self.sides[1 - side].super_weapon_killer.is_some();
        let mut weakest_exempt = weakest;
        let mut pending = self.sides[side].queue.clone();
        let mut survivors = Vec::with_capacity(pending.len());
        let mut weak_killed = false;

        while !pending.is_empty() {
            // Named heroes first, then ground structures, then at random
            let mut picked = None;
            for (index, id) in pending.iter().enumerate() {
                let object = &self.arena.require(*id)?.object;
                if object.contains_named_hero() {
                    picked = Some((index, false));
                    break;
                }
                if object.is_structure() {
                    picked = Some((index, true));
                    break;
                }
            }
            let (index, is_structure) = match picked {
                Some(pick) => pick,
                None => (self.rng.get(0, pending.len() - 1), false),
            };
            let id = pending.remove(index);

            let combatant = self.arena.require(id)?;
            let owner = combatant.owner();
            let is_planet = combatant.object.is_planet();
            let is_transport = combatant.object.is_transport();
            let spawned_in_tactical = combatant.object.spawned_in_tactical;
            let unit_type = combatant
                .combat_type(domain, &units)
                .ok_or(FatalError::UnknownUnitType(combatant.object_id()))?;

            let mut kill_unit = false;
            let mut kill_base = false;

            if !(domain.is_space() && is_transport) {
                if is_loser && !self.players.is_playable(owner) && !is_planet {
                    kill_unit = true;
                } else if unit_type.super_weapon {
                    if is_loser && opponent_has_killer {
                        kill_unit = true;
                        if weakest_exempt == Some(id) {
                            weakest_exempt = None;
                        }
                    }
                } else if is_loser && is_planet {
                    self.raze_planet(id, killer)?;
                    kill_base = true;
                } else if is_loser && is_structure {
                    kill_unit = true;
                } else {
                    kill_unit = true;

                    let garrisoned = !spawned_in_tactical && !(unit_type.is_star_base() && self.state.mid_tactical);
                    if garrisoned {
                        let tech_level = self.players.tech_level(owner);
                        for spawn in unit_type.garrison_at(tech_level) {
                            if let Some(garrison) = units.get(spawn.unit_type) {
                                budget = (budget - spawn.count as f32 * garrison.power).max(0.0);
                            }
                        }
                    }

                    if is_planet {
                        if domain.is_space() {
                            match self.downgrade_star_base(id, budget, killer)? {
                                Some(power) => budget -= power,
                                None => kill_base = true,
                            }
                        }
                        kill_unit = false;
                    } else if budget - unit_type.power * allowance > 0.0 {
                        budget = (budget - unit_type.power).max(0.0);
                        kill_unit = false;
                    }
                }

                let ai_owner = self.players.get(owner).is_some_and(|player| player.ai_controlled);
                if !self.state.mid_tactical && ai_owner {
                    let survival_type = unit_type.company_units.first().copied().unwrap_or(unit_type.id);
                    let survived = !kill_unit && !kill_base;
                    self.log_event(
                        BattleEventType::UnitSurvival {
                            owner,
                            unit_type: survival_type,
                            survived,
                        },
                        format!("{} {}", unit_type.name, if survived { "survived" } else { "lost" }),
                    );
                }
            }

            trace!(side, combatant = ?id, kill_unit, kill_base, budget, "Attrition drew a unit");

            if kill_unit {
                if weakest_exempt == Some(id) {
                    weak_killed = true;
                } else {
                    self.destroy(side, id, killer)?;
                }
            } else if !kill_base {
                survivors.push(id);
            }
        }

        remaining.set_aggregate(domain, budget.max(0.0));

        let any_survivors = !survivors.is_empty();
        self.sides[side].queue = survivors;

        if let Some(weakest) = weakest_exempt {
            if any_survivors && weak_killed {
                self.destroy(side, weakest, killer)?;
            } else if !any_survivors && !is_loser && self.arena.get(weakest).is_some_and(|c| c.is_alive()) {
                // A winner is never wiped out entirely
                self.sides[side].queue.push(weakest);
                return Ok(true);
            }
        }

        debug!(side, is_loser, survivors = self.sides[side].unit_count(), "Attrition applied");
        Ok(any_survivors)
    }

    /// Star base level the remaining budget still supports
    ///
    /// Returns the power of the new base, or `None` when no base is left.
    fn downgrade_star_base(&mut self, id: CombatantId, budget: f32, killer: Option<PlayerId>) -> Result<Option<f32>> {
        let units = Arc::clone(&self.units);
        let allowance = self.config.attrition_allowance_factor;
        let combatant = self.arena.require_mut(id)?;
        let planet_id = combatant.object_id();
        let Some(planet) = combatant.object.planet_mut() else {
            return Ok(None);
        };

        let from = planet.base_level;
        let to = planet.base_level_for_rating(budget, allowance, &units);
        planet.base_level = to;
        let power = planet.star_base().and_then(|base| units.get(base)).map(|base| base.power);

        if from != to {
            self.log_event(
                BattleEventType::BaseLevelChanged {
                    planet: planet_id,
                    from,
                    to,
                    final_blow: killer,
                },
                format!("Star base reduced from level {} to {}", from, to),
            );
        }
        Ok(power)
    }

    /// A losing planet loses its star base and special structures
    fn raze_planet(&mut self, id: CombatantId, killer: Option<PlayerId>) -> Result<()> {
        let domain = self.state.domain;
        let snapshot = self.arena.require(id)?.object.clone();
        self.record_history(&snapshot);

        let combatant = self.arena.require_mut(id)?;
        let planet_id = combatant.object_id();
        let Some(planet) = combatant.object.planet_mut() else {
            return Ok(());
        };
        let from = planet.base_level;
        planet.base_level = 0;
        planet.space_structures.clear();
        if domain == Domain::Land {
            planet.ground_structures.clear();
        }

        self.log_event(
            BattleEventType::BaseLevelChanged {
                planet: planet_id,
                from,
                to: 0,
                final_blow: killer,
            },
            "Planetary base razed".to_string(),
        );
        self.log_event(
            BattleEventType::SpecialStructuresCleared {
                planet: planet_id,
                ground: false,
            },
            "Space special structures cleared".to_string(),
        );
        if domain == Domain::Land {
            self.log_event(
                BattleEventType::SpecialStructuresCleared {
                    planet: planet_id,
                    ground: true,
                },
                "Ground special structures cleared".to_string(),
            );
        }
        Ok(())
    }

    /// Kill a combatant for good
    pub(crate) fn destroy(&mut self, side: usize, id: CombatantId, killer: Option<PlayerId>) -> Result<()> {
        let combatant = self.arena.require(id)?;
        if !combatant.is_alive() {
            return Ok(());
        }
        let object = combatant.object.clone();
        let unit_type = combatant
            .combat_type(self.state.domain, &self.units)
            .map(|ty| ty.id)
            .unwrap_or(object.unit_type);

        self.arena.set_status(id, CombatantStatus::Destroyed);
        self.sides[side].remove(id);
        self.sides[side].mark_destroyed(id);
        self.record_history(&object);

        self.log_event(
            BattleEventType::UnitDestroyed {
                object: object.id,
                owner: object.owner,
                unit_type,
                killer,
            },
            format!("{:?} of {} destroyed", object.id, object.owner),
        );
        Ok(())
    }

    /// Pull a combatant out of the battle alive
    pub(crate) fn evacuate(&mut self, side: usize, id: CombatantId) -> Result<()> {
        let combatant = self.arena.require(id)?;
        if !combatant.is_alive() {
            return Ok(());
        }
        let object = combatant.object_id();
        let owner = combatant.owner();

        self.arena.set_status(id, CombatantStatus::Evacuated);
        self.sides[side].remove(id);
        self.sides[side].mark_evacuated(id);
        self.log_event(
            BattleEventType::UnitEvacuated { object, owner },
            format!("{:?} of {} evacuated", object, owner),
        );
        Ok(())
    }

    /// Add a lost object to the current battle record
    fn record_history(&mut self, object: &GameObject) {
        for (unit_type, owner) in casualties(object) {
            self.history.record_kill(unit_type, owner);
        }
    }
}

/// Unit types lost with an object: a planet's star base, a container's
/// contents, or the object itself
fn casualties(object: &GameObject) -> Vec<(UnitTypeId, PlayerId)> {
    match &object.kind {
        ObjectKind::Planet(planet) => planet
            .star_base()
            .map(|base| vec![(base, object.owner)])
            .unwrap_or_default(),
        ObjectKind::Fleet(members) | ObjectKind::Transport(members) if !members.is_empty() => {
            members.iter().map(|member| (member.unit_type, member.owner)).collect()
        }
        _ => vec![(object.unit_type, object.owner)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autoresolve::engine::BattleContext;
    use crate::contrast::table::ContrastTable;
    use crate::core::config::AutoResolveConfig;
    use crate::core::random::SyncRandom;
    use crate::core::types::{CategoryMask, ObjectId};
    use crate::units::object::PlanetData;
    use crate::units::player::{Player, PlayerRegistry};
    use crate::units::registry::UnitTypeRegistry;
    use crate::units::unit_type::{UnitRole, UnitType};

    #[test]
    fn test_transport_allowance() {
        assert_eq!(transports_allowed(1, 0.5, false), 0);
        assert_eq!(transports_allowed(4, 0.5, false), 2);
        assert_eq!(transports_allowed(3, 0.5, false), 2);
        assert_eq!(transports_allowed(4, 0.5, true), 0);
        assert_eq!(transports_allowed(0, 0.5, false), 0);
    }

    fn engine(units: UnitTypeRegistry, players: PlayerRegistry) -> AutoResolveEngine {
        let mut engine = AutoResolveEngine::new(
            Arc::new(ContrastTable::new()),
            Arc::new(units),
            AutoResolveConfig::default(),
            SyncRandom::seed_from_u64(3),
        );
        engine.prepare(BattleContext::space(players), 0).unwrap();
        engine
    }

    fn two_players() -> PlayerRegistry {
        [Player::human(PlayerId(1)), Player::human(PlayerId(2))].into_iter().collect()
    }

    fn budget_profile(engine: &AutoResolveEngine, force: f32) -> ForceProfile {
        let mut profile = ForceProfile::for_domain(&engine.contrast, Domain::Space);
        profile.set_aggregate(Domain::Space, force);
        profile
    }

    #[test]
    fn test_empty_side_has_no_survivors() {
        let mut engine = engine(UnitTypeRegistry::new(), two_players());
        let mut profile = budget_profile(&engine, 500.0);
        assert_eq!(engine.apply_attrition(0, &mut profile, true, None), Ok(false));
        assert_eq!(engine.apply_attrition(1, &mut profile, false, None), Ok(false));
    }

    #[test]
    fn test_budget_decides_survivors() {
        let mut units = UnitTypeRegistry::new();
        let frigate = units.register(UnitType::new("Frigate", 100.0, CategoryMask::FRIGATE));
        let mut engine = engine(units, two_players());
        for i in 1..=4 {
            engine.add_combatant(GameObject::ship(i, PlayerId(1), frigate)).unwrap();
        }

        // 250 pays for two frigates at full cost; the third needs 75 but only 50 is left
        let mut profile = budget_profile(&engine, 250.0);
        let survived = engine.apply_attrition(0, &mut profile, false, Some(PlayerId(2))).unwrap();
        assert!(survived);
        assert_eq!(engine.sides[0].unit_count(), 2);
        assert_eq!(engine.history.current().killed.len(), 2);
        assert_eq!(profile.aggregate(Domain::Space), 50.0);
    }

    #[test]
    fn test_pirate_loser_wiped_out() {
        let mut units = UnitTypeRegistry::new();
        let frigate = units.register(UnitType::new("Frigate", 100.0, CategoryMask::FRIGATE));
        let players = [Player::human(PlayerId(1)), Player::pirate(PlayerId(2))].into_iter().collect();
        let mut engine = engine(units, players);
        engine.add_combatant(GameObject::ship(1, PlayerId(2), frigate)).unwrap();
        engine.add_combatant(GameObject::ship(2, PlayerId(2), frigate)).unwrap();

        let mut profile = budget_profile(&engine, 10_000.0);
        assert_eq!(engine.apply_attrition(0, &mut profile, true, Some(PlayerId(1))), Ok(false));
        assert!(engine.sides[0].queue.is_empty());
    }

    #[test]
    fn test_winner_keeps_weakest() {
        let mut units = UnitTypeRegistry::new();
        let frigate = units.register(UnitType::new("Frigate", 100.0, CategoryMask::FRIGATE));
        let mut engine = engine(units, two_players());
        engine.add_combatant(GameObject::ship(1, PlayerId(1), frigate)).unwrap();
        engine.sides[0].weakest = engine.sides[0].queue.first().copied();

        let mut profile = budget_profile(&engine, 0.0);
        assert_eq!(engine.apply_attrition(0, &mut profile, false, None), Ok(true));
        assert_eq!(engine.sides[0].unit_count(), 1);
        assert!(engine.history.current().killed.is_empty());
    }

    #[test]
    fn test_super_weapon_falls_only_to_killer() {
        let mut units = UnitTypeRegistry::new();
        let station = units.register(UnitType::new("Battle Station", 5000.0, CategoryMask::SUPER).super_weapon());
        let mut engine = engine(units, two_players());
        engine.add_combatant(GameObject::ship(1, PlayerId(1), station)).unwrap();

        let mut profile = budget_profile(&engine, 0.0);
        assert_eq!(engine.apply_attrition(0, &mut profile, true, None), Ok(true));

        engine.sides[1].super_weapon_killer = Some(CombatantId(99));
        assert_eq!(engine.apply_attrition(0, &mut profile, true, Some(PlayerId(2))), Ok(false));
    }

    #[test]
    fn test_losing_planet_is_razed() {
        let mut units = UnitTypeRegistry::new();
        let base = units.register(
            UnitType::new("Star Base", 400.0, CategoryMask::STRUCTURE).with_role(UnitRole::StarBase),
        );
        let mut engine = engine(units, two_players());
        let planet = GameObject::new(
            ObjectId(7),
            PlayerId(1),
            base,
            ObjectKind::Planet(Box::new(PlanetData {
                planet_type: "Gas Giant".into(),
                base_ladder: vec![base],
                base_level: 1,
                space_structures: vec![GameObject::new(ObjectId(8), PlayerId(1), base, ObjectKind::Structure)],
                ..Default::default()
            })),
        );
        engine.add_combatant(planet).unwrap();

        let mut profile = budget_profile(&engine, 1000.0);
        assert_eq!(engine.apply_attrition(0, &mut profile, true, Some(PlayerId(2))), Ok(false));

        let planet = engine.planet().and_then(|p| p.planet()).unwrap();
        assert_eq!(planet.base_level, 0);
        assert!(planet.space_structures.is_empty());
        assert_eq!(engine.history.current().killed, vec![(base, PlayerId(1))]);
    }
}
