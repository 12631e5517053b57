//! Combatant intake
//!
//! Containers are expanded here: fleets into their members, planets into
//! their base, landed transports and ground structures. Everything that
//! reaches a side's queue goes through `add_individual`.

use tracing::{debug, error, info, warn};

use super::engine::{AutoResolveEngine, Intake};
use super::events::BattleEventType;
use crate::core::error::{FatalError, Rejection, ResolveError, Result};
use crate::core::types::{Domain, PlayerId, UnitTypeId};
use crate::units::object::{GameObject, ObjectKind, PlanetData};

impl AutoResolveEngine {
    /// Hand an object to the battle
    pub fn add_combatant(&mut self, object: GameObject) -> Result<Intake> {
        if !self.state.prepared {
            return Err(Rejection::NotReady.into());
        }
        if self.state.initiated {
            return Err(Rejection::CombatStarted.into());
        }
        if !self.players.contains(object.owner) {
            warn!(owner = %object.owner, object = ?object.id, "Intake from unknown owner");
            return Err(Rejection::InvalidOwner(object.owner).into());
        }

        if let ObjectKind::Unknown(behavior) = &object.kind {
            error!(object = ?object.id, %behavior, "Object has no combat behavior");
            return Err(FatalError::UnrecognizedCombatant {
                object: object.id,
                behavior: behavior.clone(),
            }
            .into());
        }

        if let ObjectKind::Fleet(members) = &object.kind {
            let members = members.clone();
            if !self.state.fleets.contains(&object.id) {
                self.state.fleets.push(object.id);
            }
            let mut intake = Intake::Skipped;
            for member in members {
                if self.add_contained(member)? == Intake::Added {
                    intake = Intake::Added;
                }
            }
            return Ok(intake);
        }

        if let Some(data) = object.planet().cloned() {
            return self.add_planet(object, data);
        }

        let in_space = self.state.domain.is_space();
        let (admitted, bypass_filter) = match object.kind {
            ObjectKind::Ship | ObjectKind::Squadron => (in_space, false),
            // Transports fight as their ground company once landed
            ObjectKind::Transport(_) => (true, !in_space),
            _ => (true, false),
        };
        if !admitted {
            return Ok(Intake::Skipped);
        }
        self.add_individual(object, bypass_filter)
    }

    /// Add a contained object; a refused member does not abort its container
    fn add_contained(&mut self, object: GameObject) -> Result<Intake> {
        let id = object.id;
        match self.add_combatant(object) {
            Err(ResolveError::Rejected(reason)) => {
                warn!(object = ?id, %reason, "Contained object not added");
                Ok(Intake::Skipped)
            }
            other => other,
        }
    }

    /// Queue a single combatant
    ///
    /// Objects that cannot fight in the current domain are skipped unless
    /// the battle is mid-tactical or `bypass_filter` is set.
    pub fn add_individual(&mut self, object: GameObject, bypass_filter: bool) -> Result<Intake> {
        let domain = self.state.domain;
        let (participates, max_health) = {
            let unit_type = object
                .combat_type(domain, &self.units)
                .and_then(|id| self.units.get(id))
                .ok_or(FatalError::UnknownUnitType(object.id))?;
            let participates = match domain {
                Domain::Space => unit_type.can_space,
                Domain::Land => unit_type.can_land,
            };
            (participates, unit_type.hit_points)
        };

        if !participates && !bypass_filter && !self.state.mid_tactical {
            debug!(object = ?object.id, ?domain, "Cannot fight in this domain");
            return Ok(Intake::Skipped);
        }

        let queued = self
            .arena
            .find_active(object.id)
            .is_some_and(|id| self.sides.iter().any(|side| side.contains(id)));
        if queued {
            return Err(Rejection::AddingTwice(object.id).into());
        }

        let side = self.owner_enters_fray(object.owner)?;
        let id = self.arena.insert(object, side, max_health);
        self.sides[side].push(id);
        Ok(Intake::Added)
    }

    /// Side index for `owner`, claiming a free side if needed
    pub fn owner_enters_fray(&mut self, owner: PlayerId) -> Result<usize> {
        if let Some(index) = self.side_index(owner) {
            return Ok(index);
        }
        match self.sides.iter().position(|side| side.owner.is_none()) {
            Some(index) => {
                self.sides[index].owner = Some(owner);
                debug!(%owner, side = index, "Owner entered the fray");
                Ok(index)
            }
            None => {
                warn!(%owner, "Third side tried to join the battle");
                Err(Rejection::TooManySides(owner).into())
            }
        }
    }

    fn add_planet(&mut self, object: GameObject, data: PlanetData) -> Result<Intake> {
        let domain = self.state.domain;

        let mut intake = Intake::Skipped;
        if data.base_type(domain).is_some() {
            intake = self.add_individual(object.clone(), true)?;
            self.state.planet_combatant = self.arena.find_active(object.id);
        }

        self.state.terrain = data.terrain;
        self.state.planet_owner = Some(object.owner);
        self.history.set_planet(&data.planet_type);
        let planet_id = object.id;
        self.state.planet = Some(object);

        match domain {
            Domain::Land => {
                if !self.state.mid_tactical {
                    self.log_event(
                        BattleEventType::ConflictBegin {
                            object: planet_id,
                            domain,
                        },
                        format!("Ground conflict on {}", data.planet_type),
                    );
                }

                for transport in &data.landed_transports {
                    if self.add_contained(transport.clone())? == Intake::Added {
                        intake = Intake::Added;
                    }
                }

                self.arm_bombing_run(&data);

                for structure in &data.ground_structures {
                    match self.add_individual(structure.clone(), true) {
                        Ok(Intake::Added) => intake = Intake::Added,
                        Ok(Intake::Skipped) => {}
                        Err(ResolveError::Rejected(reason)) => {
                            warn!(object = ?structure.id, %reason, "Ground structure not added");
                        }
                        Err(fatal) => return Err(fatal),
                    }
                }
            }
            Domain::Space => {
                if data.stun_rate > 0 && (self.state.stun_rate == 0 || data.stun_rate < self.state.stun_rate) {
                    self.state.stun_rate = data.stun_rate;
                    self.state.stun_counter = i64::from(data.stun_rate);
                }
                if data.hit_rate > 0 && (self.state.hit_rate == 0 || data.hit_rate < self.state.hit_rate) {
                    self.state.hit_rate = data.hit_rate;
                    self.state.hit_counter = i64::from(data.hit_rate);
                    self.state.hit_damage = data.hit_damage;
                }
            }
        }

        Ok(intake)
    }

    /// Search the invader's orbiting fleets for something that can bomb
    fn arm_bombing_run(&mut self, data: &PlanetData) {
        let Some(invader) = self.state.invader else {
            return;
        };
        let tech_level = self.players.tech_level(invader);

        let bomber = data
            .orbiting_fleets
            .iter()
            .filter(|fleet| fleet.owner == invader)
            .flat_map(|fleet| {
                if fleet.contents().is_empty() {
                    std::slice::from_ref(fleet)
                } else {
                    fleet.contents()
                }
            })
            .find_map(|ship| self.land_bomber_of(ship, tech_level));

        if let Some(bomber) = bomber {
            self.state.bombing_run = Some(invader);
            self.state.bomber_type = Some(bomber);
            info!(%invader, bomber = ?bomber, "Bombing run available");
        }
    }

    /// Bomber type a ship can call down, directly or through its squadrons
    fn land_bomber_of(&self, ship: &GameObject, tech_level: u32) -> Option<UnitTypeId> {
        let ship_type = self.units.get(ship.unit_type)?;
        if let Some(bomber) = ship_type.land_bomber {
            return Some(bomber);
        }
        ship_type
            .garrison
            .iter()
            .filter(|spawn| spawn.tech_level <= tech_level)
            .filter_map(|spawn| self.units.get(spawn.unit_type))
            .flat_map(|squadron| squadron.squadron_units.iter())
            .filter_map(|member| self.units.get(*member))
            .find_map(|member| member.land_bomber)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::autoresolve::engine::BattleContext;
    use crate::contrast::table::ContrastTable;
    use crate::core::config::AutoResolveConfig;
    use crate::core::random::SyncRandom;
    use crate::core::types::{CategoryMask, ObjectId, Terrain};
    use crate::units::player::{Player, PlayerRegistry};
    use crate::units::registry::UnitTypeRegistry;
    use crate::units::unit_type::{UnitRole, UnitType};

    struct Types {
        corvette: UnitTypeId,
        tank: UnitTypeId,
        carrier: UnitTypeId,
        star_base: UnitTypeId,
        ground_base: UnitTypeId,
        transport: UnitTypeId,
    }

    fn engine() -> (AutoResolveEngine, Types) {
        let mut units = UnitTypeRegistry::new();
        let bomber = units.register(UnitType::new("Bomber", 20.0, CategoryMask::BOMBER));
        let bomber_squadron = {
            let mut squadron = UnitType::new("Bomber Squadron", 60.0, CategoryMask::BOMBER);
            let mut member = UnitType::new("Bomber Craft", 20.0, CategoryMask::BOMBER);
            member.land_bomber = Some(bomber);
            squadron.squadron_units = vec![units.register(member)];
            units.register(squadron)
        };
        let types = Types {
            corvette: units.register(UnitType::new("Corvette", 50.0, CategoryMask::CORVETTE)),
            tank: units.register(UnitType::new("Tank", 40.0, CategoryMask::VEHICLE).land()),
            carrier: units.register(
                UnitType::new("Carrier", 400.0, CategoryMask::CAPITAL).with_garrison(2, bomber_squadron, 2),
            ),
            star_base: units.register(
                UnitType::new("Star Base", 300.0, CategoryMask::STRUCTURE).with_role(UnitRole::StarBase),
            ),
            ground_base: units.register(
                UnitType::new("Garrison", 100.0, CategoryMask::STRUCTURE)
                    .with_role(UnitRole::GroundBase)
                    .land(),
            ),
            transport: units.register(
                UnitType::new("Dropship", 10.0, CategoryMask::TRANSPORT).with_role(UnitRole::Transport),
            ),
        };

        let engine = AutoResolveEngine::new(
            Arc::new(ContrastTable::new()),
            Arc::new(units),
            AutoResolveConfig::default(),
            SyncRandom::seed_from_u64(1),
        );
        (engine, types)
    }

    fn players() -> PlayerRegistry {
        [
            Player::new(PlayerId(1)).with_tech_level(3),
            Player::new(PlayerId(2)),
            Player::new(PlayerId(3)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_intake_before_prepare_rejected() {
        let (mut engine, types) = engine();
        let result = engine.add_combatant(GameObject::ship(1, PlayerId(1), types.corvette));
        assert_eq!(result, Err(ResolveError::Rejected(Rejection::NotReady)));
    }

    #[test]
    fn test_third_side_rejected() {
        let (mut engine, types) = engine();
        engine.prepare_for_space(players(), 0).unwrap();
        engine.add_combatant(GameObject::ship(1, PlayerId(1), types.corvette)).unwrap();
        engine.add_combatant(GameObject::ship(2, PlayerId(2), types.corvette)).unwrap();

        let result = engine.add_combatant(GameObject::ship(3, PlayerId(3), types.corvette));
        assert_eq!(result, Err(ResolveError::Rejected(Rejection::TooManySides(PlayerId(3)))));
        assert_eq!(engine.side_a(), Some(PlayerId(1)));
        assert_eq!(engine.side_b(), Some(PlayerId(2)));
    }

    #[test]
    fn test_adding_twice_rejected() {
        let (mut engine, types) = engine();
        engine.prepare_for_space(players(), 0).unwrap();
        let ship = GameObject::ship(1, PlayerId(1), types.corvette);
        assert_eq!(engine.add_combatant(ship.clone()), Ok(Intake::Added));
        assert_eq!(
            engine.add_combatant(ship),
            Err(ResolveError::Rejected(Rejection::AddingTwice(ObjectId(1))))
        );
    }

    #[test]
    fn test_domain_filter_skips() {
        let (mut engine, types) = engine();
        engine.prepare_for_space(players(), 0).unwrap();
        let tank = GameObject::ground_unit(1, PlayerId(1), types.tank);
        assert_eq!(engine.add_combatant(tank), Ok(Intake::Skipped));
        assert!(engine.queue(PlayerId(1)).is_empty());
    }

    #[test]
    fn test_unknown_behavior_is_fatal() {
        let (mut engine, types) = engine();
        engine.prepare_for_space(players(), 0).unwrap();
        let object = GameObject::new(ObjectId(9), PlayerId(1), types.corvette, ObjectKind::Unknown("Asteroid".into()));
        let error = engine.add_combatant(object).unwrap_err();
        assert!(error.is_fatal());
    }

    #[test]
    fn test_fleet_expands_members() {
        let (mut engine, types) = engine();
        engine.prepare_for_space(players(), 0).unwrap();
        let fleet = GameObject::new(
            ObjectId(10),
            PlayerId(1),
            types.corvette,
            ObjectKind::Fleet(vec![
                GameObject::ship(11, PlayerId(1), types.corvette),
                GameObject::ship(12, PlayerId(1), types.carrier),
                GameObject::ground_unit(13, PlayerId(1), types.tank),
            ]),
        );
        assert_eq!(engine.add_combatant(fleet), Ok(Intake::Added));
        assert_eq!(engine.queue(PlayerId(1)).len(), 2);
    }

    #[test]
    fn test_space_planet_adds_star_base_and_guns() {
        let (mut engine, types) = engine();
        engine.prepare_for_space(players(), 0).unwrap();
        let planet = GameObject::new(
            ObjectId(20),
            PlayerId(2),
            types.star_base,
            ObjectKind::Planet(Box::new(PlanetData {
                planet_type: "Ice World".into(),
                terrain: Some(Terrain::Arctic),
                base_ladder: vec![types.star_base],
                base_level: 1,
                stun_rate: 3,
                hit_rate: 4,
                hit_damage: 25.0,
                ..Default::default()
            })),
        );
        assert_eq!(engine.add_combatant(planet), Ok(Intake::Added));
        assert_eq!(engine.queue(PlayerId(2)).len(), 1);
        assert_eq!(engine.state.stun_rate, 3);
        assert_eq!(engine.state.hit_damage, 25.0);
        assert_eq!(engine.battle(engine.battle_id()).unwrap().planet_type.as_deref(), Some("Ice World"));
    }

    #[test]
    fn test_land_planet_intake_and_bombing_run() {
        let (mut engine, types) = engine();
        engine.prepare(BattleContext::land(players(), PlayerId(1)), 0).unwrap();

        let dropship = GameObject::new(
            ObjectId(31),
            PlayerId(1),
            types.transport,
            ObjectKind::Transport(vec![GameObject::ground_unit(32, PlayerId(1), types.tank)]),
        );
        let fleet = GameObject::new(
            ObjectId(40),
            PlayerId(1),
            types.carrier,
            ObjectKind::Fleet(vec![GameObject::ship(41, PlayerId(1), types.carrier)]),
        );
        let bunker = GameObject::new(ObjectId(50), PlayerId(2), types.ground_base, ObjectKind::Structure);
        let planet = GameObject::new(
            ObjectId(30),
            PlayerId(2),
            types.ground_base,
            ObjectKind::Planet(Box::new(PlanetData {
                planet_type: "Desert World".into(),
                terrain: Some(Terrain::Desert),
                ground_base: Some(types.ground_base),
                landed_transports: vec![dropship],
                orbiting_fleets: vec![fleet],
                ground_structures: vec![bunker],
                ..Default::default()
            })),
        );

        assert_eq!(engine.add_combatant(planet), Ok(Intake::Added));
        assert_eq!(engine.queue(PlayerId(2)).len(), 2);
        assert_eq!(engine.queue(PlayerId(1)).len(), 1);
        assert!(engine.bombing_run().is_some());

        let events = engine.drain_events();
        assert!(matches!(
            events[0].event_type,
            BattleEventType::ConflictBegin { domain: Domain::Land, .. }
        ));
    }

    #[test]
    fn test_mid_tactical_preassigns_sides() {
        let (mut engine, types) = engine();
        let context = BattleContext::space(players()).in_tactical(PlayerId(2), PlayerId(1));
        engine.prepare(context, 0).unwrap();
        assert_eq!(engine.side_a(), Some(PlayerId(2)));
        assert_eq!(engine.side_b(), Some(PlayerId(1)));

        // Domain filter is off mid-tactical
        let tank = GameObject::ground_unit(1, PlayerId(1), types.tank);
        assert_eq!(engine.add_combatant(tank), Ok(Intake::Added));
    }
}
