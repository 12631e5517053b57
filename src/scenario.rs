//! Battle scenarios described in TOML
//!
//! A scenario names the players, the theatre and every object on the field.
//! Unit types are referenced by name and resolved against a
//! `UnitTypeRegistry`; object ids are assigned in file order.
//!
//! ```toml
//! name = "Relief of Kessel"
//! domain = "Space"
//! aggressor = 1
//!
//! [[player]]
//! id = 1
//! human = true
//!
//! [[object]]
//! owner = 1
//! unit = "Frigate"
//! count = 3
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::autoresolve::engine::{AutoResolveEngine, BattleContext, RoundStatus};
use crate::autoresolve::events::{BattleEvent, BattleEventType};
use crate::core::error::{LoadError, ResolveError};
use crate::core::types::{Domain, Frame, ObjectId, PlayerId, Terrain, UnitTypeId};
use crate::units::object::{GameObject, ObjectKind, PlanetData};
use crate::units::player::{Player, PlayerRegistry};
use crate::units::registry::UnitTypeRegistry;

/// Errors from loading or running a scenario
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("battle did not finish within {0} rounds")]
    Stalled(usize),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ObjectKindDef {
    #[default]
    Ship,
    Squadron,
    GroundUnit,
    Structure,
    Fleet,
    Transport,
}

#[derive(Debug, Clone, Deserialize)]
struct ObjectDef {
    /// Containers hand their owner down to members that omit one
    owner: Option<u32>,
    unit: String,
    #[serde(default)]
    kind: ObjectKindDef,
    #[serde(default)]
    hero: bool,
    #[serde(default = "default_count")]
    count: u32,
    #[serde(default)]
    spawned_in_tactical: bool,
    #[serde(default)]
    members: Vec<ObjectDef>,
}

fn default_count() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
struct PlanetDef {
    owner: u32,
    planet_type: String,
    /// Type the planet object itself carries when it has no base
    unit: Option<String>,
    terrain: Option<Terrain>,
    #[serde(default)]
    base_ladder: Vec<String>,
    #[serde(default)]
    base_level: usize,
    ground_base: Option<String>,
    #[serde(default)]
    ground_structures: Vec<ObjectDef>,
    #[serde(default)]
    space_structures: Vec<ObjectDef>,
    #[serde(default)]
    landed_transports: Vec<ObjectDef>,
    #[serde(default)]
    orbiting_fleets: Vec<ObjectDef>,
    #[serde(default)]
    turrets: Vec<String>,
    #[serde(default)]
    stun_rate: u32,
    #[serde(default)]
    hit_rate: u32,
    #[serde(default)]
    hit_damage: f32,
}

/// Mid-tactical battle with fixed sides
#[derive(Debug, Clone, Copy, Deserialize)]
struct TacticalDef {
    defender: u32,
    invader: u32,
}

/// A battle setup loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain: Domain,
    pub aggressor: u32,
    /// Invading player, required for land battles
    pub invader: Option<u32>,
    pub seed: Option<u64>,
    /// Player that asks to retreat as soon as combat starts
    pub retreat: Option<u32>,
    #[serde(default, rename = "player")]
    pub players: Vec<Player>,
    #[serde(default, rename = "object")]
    objects: Vec<ObjectDef>,
    planet: Option<PlanetDef>,
    tactical: Option<TacticalDef>,
}

/// What happened in a scenario run
#[derive(Debug, Clone, Serialize)]
pub struct BattleSummary {
    pub scenario: String,
    pub domain: Domain,
    pub winner: Option<PlayerId>,
    pub retreated: Option<PlayerId>,
    pub rounds: usize,
    /// Kills recorded in the battle history, by unit type name
    pub killed: BTreeMap<String, usize>,
    pub destroyed: usize,
    pub evacuated: usize,
    pub events: Vec<BattleEvent>,
}

/// Hands out object ids in file order
#[derive(Debug)]
struct IdAllocator(u32);

impl IdAllocator {
    fn next(&mut self) -> ObjectId {
        self.0 += 1;
        ObjectId(self.0)
    }
}

impl Scenario {
    pub fn from_toml_str(content: &str) -> Result<Self, LoadError> {
        let scenario: Scenario = toml::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), LoadError> {
        let known = |id: u32| self.players.iter().any(|player| player.id == PlayerId(id));

        let mut referenced = vec![self.aggressor];
        referenced.extend(self.invader);
        referenced.extend(self.retreat);
        referenced.extend(self.planet.as_ref().map(|planet| planet.owner));
        referenced.extend(self.tactical.iter().flat_map(|t| [t.defender, t.invader]));
        referenced.extend(self.objects.iter().filter_map(|object| object.owner));
        if let Some(unknown) = referenced.into_iter().find(|id| !known(*id)) {
            return Err(LoadError::UnknownPlayer(unknown));
        }

        if self.domain == Domain::Land && self.invader.is_none() && self.tactical.is_none() {
            return Err(LoadError::Invalid("land scenarios need an invader".into()));
        }
        Ok(())
    }

    pub fn player_registry(&self) -> PlayerRegistry {
        self.players.iter().cloned().collect()
    }

    /// Battle context for `AutoResolveEngine::prepare`
    pub fn context(&self) -> BattleContext {
        let players = self.player_registry();
        let context = match (self.domain, self.invader) {
            (Domain::Land, Some(invader)) => BattleContext::land(players, PlayerId(invader)),
            (Domain::Land, None) => {
                let invader = self.tactical.map(|t| t.invader).unwrap_or(self.aggressor);
                BattleContext::land(players, PlayerId(invader))
            }
            (Domain::Space, _) => BattleContext::space(players),
        };
        match self.tactical {
            Some(tactical) => context.in_tactical(PlayerId(tactical.defender), PlayerId(tactical.invader)),
            None => context,
        }
    }

    /// Every object on the field, planet first
    pub fn objects(&self, units: &UnitTypeRegistry) -> Result<Vec<GameObject>, LoadError> {
        let mut ids = IdAllocator(0);
        let mut objects = Vec::new();

        if let Some(planet) = &self.planet {
            objects.push(self.build_planet(planet, units, &mut ids)?);
        }
        for def in &self.objects {
            objects.extend(build_objects(def, None, units, &mut ids)?);
        }
        Ok(objects)
    }

    fn build_planet(
        &self,
        def: &PlanetDef,
        units: &UnitTypeRegistry,
        ids: &mut IdAllocator,
    ) -> Result<GameObject, LoadError> {
        let owner = Some(def.owner);
        let id = ids.next();
        let data = PlanetData {
            planet_type: def.planet_type.clone(),
            terrain: def.terrain,
            base_ladder: lookup_all(units, &def.base_ladder)?,
            base_level: def.base_level,
            ground_base: def.ground_base.as_deref().map(|name| lookup(units, name)).transpose()?,
            ground_structures: build_all(&def.ground_structures, owner, units, ids)?,
            space_structures: build_all(&def.space_structures, owner, units, ids)?,
            landed_transports: build_all(&def.landed_transports, owner, units, ids)?,
            // Orbiting fleets belong to whoever holds the orbit
            orbiting_fleets: build_all(&def.orbiting_fleets, self.invader, units, ids)?,
            turrets: lookup_all(units, &def.turrets)?,
            stun_rate: def.stun_rate,
            hit_rate: def.hit_rate,
            hit_damage: def.hit_damage,
        };

        let unit_type = match &def.unit {
            Some(name) => lookup(units, name)?,
            None => data
                .base_type(self.domain)
                .or(data.ground_base)
                .or(data.base_ladder.first().copied())
                .ok_or_else(|| {
                    LoadError::Invalid(format!("planet {} needs a base or a unit type", def.planet_type))
                })?,
        };

        Ok(GameObject::new(
            id,
            PlayerId(def.owner),
            unit_type,
            ObjectKind::Planet(Box::new(data)),
        ))
    }

    /// Run the scenario to completion on a freshly constructed engine
    ///
    /// Each round advances one frame and plays one display exchange. The
    /// engine is cleaned up afterwards so it can run the next battle.
    pub fn run(
        &self,
        engine: &mut AutoResolveEngine,
        instant: bool,
    ) -> Result<BattleSummary, ScenarioError> {
        let objects = self.objects(engine.units())?;
        let round_limit = engine.config().display_frames().ceil() as usize * 4 + 16;

        engine.prepare(self.context(), 0)?;
        for object in objects {
            match engine.add_combatant(object) {
                Ok(_) => {}
                Err(ResolveError::Rejected(reason)) => warn!(%reason, "Scenario object rejected"),
                Err(fatal) => return Err(fatal.into()),
            }
        }

        engine.initiate_combat(PlayerId(self.aggressor))?;
        if let Some(owner) = self.retreat {
            match engine.player_retreats(PlayerId(owner)) {
                Ok(()) => {}
                Err(ResolveError::Rejected(reason)) => warn!(%reason, "Scenario retreat refused"),
                Err(fatal) => return Err(fatal.into()),
            }
        }

        let mut rounds = 0;
        let mut retreated = None;
        loop {
            if rounds >= round_limit {
                return Err(ScenarioError::Stalled(rounds));
            }
            engine.skirmish_step()?;
            let status = engine.combat_round(rounds as Frame, instant)?;
            rounds += 1;
            debug!(round = rounds, ?status, "Scenario round");
            match status {
                RoundStatus::InProgress => {}
                RoundStatus::Retreating => retreated = engine.side_is_retreating(),
                RoundStatus::Over => break,
            }
        }

        let winner = engine.who_won();
        let record = engine.battle(engine.battle_id()).cloned().unwrap_or_default();
        let mut events = engine.drain_events();
        engine.cleanup_combat();
        events.extend(engine.drain_events());

        let mut killed = BTreeMap::new();
        for (unit_type, _) in &record.killed {
            *killed.entry(unit_name(engine.units(), *unit_type)).or_insert(0) += 1;
        }
        let destroyed = events
            .iter()
            .filter(|event| matches!(event.event_type, BattleEventType::UnitDestroyed { .. }))
            .count();
        let evacuated = events
            .iter()
            .filter(|event| matches!(event.event_type, BattleEventType::UnitEvacuated { .. }))
            .count();

        info!(
            scenario = %self.name,
            ?winner,
            rounds,
            destroyed,
            evacuated,
            "Scenario complete"
        );

        Ok(BattleSummary {
            scenario: self.name.clone(),
            domain: self.domain,
            winner,
            retreated,
            rounds,
            killed,
            destroyed,
            evacuated,
            events,
        })
    }
}

fn unit_name(units: &UnitTypeRegistry, id: UnitTypeId) -> String {
    units
        .get(id)
        .map(|unit_type| unit_type.name.clone())
        .unwrap_or_else(|| format!("#{}", id.0))
}

fn lookup(units: &UnitTypeRegistry, name: &str) -> Result<UnitTypeId, LoadError> {
    units
        .id_of(name)
        .ok_or_else(|| LoadError::UnknownUnitType(name.to_string()))
}

fn lookup_all(units: &UnitTypeRegistry, names: &[String]) -> Result<Vec<UnitTypeId>, LoadError> {
    names.iter().map(|name| lookup(units, name)).collect()
}

fn build_all(
    defs: &[ObjectDef],
    owner: Option<u32>,
    units: &UnitTypeRegistry,
    ids: &mut IdAllocator,
) -> Result<Vec<GameObject>, LoadError> {
    let mut objects = Vec::new();
    for def in defs {
        objects.extend(build_objects(def, owner, units, ids)?);
    }
    Ok(objects)
}

/// Expand one definition into `count` objects, members included
fn build_objects(
    def: &ObjectDef,
    inherited_owner: Option<u32>,
    units: &UnitTypeRegistry,
    ids: &mut IdAllocator,
) -> Result<Vec<GameObject>, LoadError> {
    let owner = def
        .owner
        .or(inherited_owner)
        .ok_or_else(|| LoadError::Invalid(format!("object {} has no owner", def.unit)))?;
    let unit_type = lookup(units, &def.unit)?;

    let mut objects = Vec::with_capacity(def.count as usize);
    for _ in 0..def.count {
        let id = ids.next();
        let kind = match def.kind {
            ObjectKindDef::Ship => ObjectKind::Ship,
            ObjectKindDef::Squadron => ObjectKind::Squadron,
            ObjectKindDef::GroundUnit => ObjectKind::GroundUnit,
            ObjectKindDef::Structure => ObjectKind::Structure,
            ObjectKindDef::Fleet => ObjectKind::Fleet(build_all(&def.members, Some(owner), units, ids)?),
            ObjectKindDef::Transport => {
                ObjectKind::Transport(build_all(&def.members, Some(owner), units, ids)?)
            }
        };
        let mut object = GameObject::new(id, PlayerId(owner), unit_type, kind);
        object.has_named_hero = def.hero;
        object.spawned_in_tactical = def.spawned_in_tactical;
        objects.push(object);
    }
    Ok(objects)
}
