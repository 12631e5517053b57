//! Auto-resolve engine
//!
//! One engine runs one battle at a time:
//! prepare -> add combatants -> initiate -> rounds -> cleanup.
//! Each round call either returns immediately while display pacing runs,
//! or performs the single resolution pass of the battle:
//! attack exchange -> winner -> transport losses -> blend -> attrition.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::combatant::{Combatant, CombatantArena, CombatantStatus};
use super::events::{BattleEvent, BattleEventLog, BattleEventType};
use super::force::{self, ForceContext};
use super::history::{BattleHistory, BattleRecord};
use super::side::Side;
use crate::contrast::table::ContrastTable;
use crate::core::config::AutoResolveConfig;
use crate::core::error::{FatalError, Rejection, Result};
use crate::core::random::SyncRandom;
use crate::core::types::{CombatantId, Domain, Frame, ObjectId, PlayerId, Terrain, UnitTypeId};
use crate::units::object::GameObject;
use crate::units::player::PlayerRegistry;
use crate::units::registry::UnitTypeRegistry;

/// Result of handing an object to intake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intake {
    /// At least one combatant joined a side
    Added,
    /// Nothing in the object can fight in this battle
    Skipped,
}

/// What the caller should do after a round call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundStatus {
    /// Call again on a later frame
    InProgress,
    /// The loser is retreating; the next call completes the retreat
    Retreating,
    Over,
}

/// Where the engine is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BattlePhase {
    #[default]
    NotReady,
    Prepared,
    Initiated,
    RoundInProgress,
    Retreating,
    Over,
}

/// Everything a battle needs to know before intake
#[derive(Debug, Clone, Default)]
pub struct BattleContext {
    pub domain: Domain,
    pub players: PlayerRegistry,
    /// Player invading the planet, if this is an invasion
    pub invader: Option<PlayerId>,
    pub defender: Option<PlayerId>,
    /// Resolving a battle that is already running tactically
    pub mid_tactical: bool,
}

impl BattleContext {
    pub fn space(players: PlayerRegistry) -> Self {
        Self {
            domain: Domain::Space,
            players,
            ..Default::default()
        }
    }

    pub fn land(players: PlayerRegistry, invader: PlayerId) -> Self {
        Self {
            domain: Domain::Land,
            players,
            invader: Some(invader),
            ..Default::default()
        }
    }

    /// Resolve from inside a tactical battle; the defender takes side 0
    pub fn in_tactical(mut self, defender: PlayerId, invader: PlayerId) -> Self {
        self.mid_tactical = true;
        self.defender = Some(defender);
        self.invader = Some(invader);
        self
    }
}

/// Per-battle state, reset by every prepare and cleanup
#[derive(Debug, Clone, Default)]
pub(crate) struct BattleState {
    pub prepared: bool,
    pub initiated: bool,
    pub domain: Domain,
    pub mid_tactical: bool,
    pub invader: Option<PlayerId>,
    pub aggressor: Option<PlayerId>,

    // Planet
    pub planet: Option<GameObject>,
    pub planet_combatant: Option<CombatantId>,
    pub planet_owner: Option<PlayerId>,
    pub terrain: Option<Terrain>,
    pub fleets: Vec<ObjectId>,

    // Specials
    pub bombing_run: Option<PlayerId>,
    pub bomber_type: Option<UnitTypeId>,
    pub stun_rate: u32,
    pub stun_counter: i64,
    pub hit_rate: u32,
    pub hit_counter: i64,
    pub hit_damage: f32,

    // Timing
    pub start_frame: Frame,
    pub now: Frame,
    pub rounds: u32,

    // Outcome
    pub battle_fought: bool,
    pub retreating: Option<PlayerId>,
    pub retreat_reported: bool,
    pub over: bool,
    pub winner: Option<PlayerId>,
    pub pending_victory: Option<PlayerId>,

    // Display exchange: which side fires first
    pub unit_fire: Option<usize>,
    pub escort_fire: Option<usize>,
}

/// The auto-resolve combat engine
pub struct AutoResolveEngine {
    pub(crate) contrast: Arc<ContrastTable>,
    pub(crate) units: Arc<UnitTypeRegistry>,
    pub(crate) config: AutoResolveConfig,
    pub(crate) rng: SyncRandom,
    pub(crate) players: PlayerRegistry,
    pub(crate) arena: CombatantArena,
    pub(crate) sides: [Side; 2],
    pub(crate) history: BattleHistory,
    pub(crate) events: BattleEventLog,
    pub(crate) state: BattleState,
}

impl AutoResolveEngine {
    pub fn new(
        contrast: Arc<ContrastTable>,
        units: Arc<UnitTypeRegistry>,
        config: AutoResolveConfig,
        rng: SyncRandom,
    ) -> Self {
        let history = BattleHistory::new(config.history_capacity);
        Self {
            contrast,
            units,
            config,
            rng,
            players: PlayerRegistry::new(),
            arena: CombatantArena::new(),
            sides: [Side::new(), Side::new()],
            history,
            events: BattleEventLog::new(),
            state: BattleState::default(),
        }
    }

    pub fn config(&self) -> &AutoResolveConfig {
        &self.config
    }

    pub fn units(&self) -> &UnitTypeRegistry {
        &self.units
    }

    pub(crate) fn force_context(&self) -> ForceContext<'_> {
        ForceContext {
            table: &self.contrast,
            units: &self.units,
            players: &self.players,
            domain: self.state.domain,
            terrain: self.state.terrain,
            mid_tactical: self.state.mid_tactical,
        }
    }

    pub(crate) fn log_event(&mut self, event_type: BattleEventType, description: String) {
        self.events.push(event_type, description, self.state.now);
    }

    // ===== LIFECYCLE =====

    /// Claim the engine for a new battle
    pub fn prepare(&mut self, context: BattleContext, now: Frame) -> Result<()> {
        if self.state.prepared {
            return Err(Rejection::NotReady.into());
        }
        if context.mid_tactical && (context.defender.is_none() || context.invader.is_none()) {
            return Err(Rejection::NoConflict.into());
        }

        self.arena.clear();
        for side in &mut self.sides {
            side.reset();
        }
        self.state = BattleState {
            prepared: true,
            domain: context.domain,
            mid_tactical: context.mid_tactical,
            invader: context.invader,
            start_frame: now,
            now,
            ..Default::default()
        };
        self.players = context.players;
        let battle_id = self.history.advance();

        if context.mid_tactical {
            self.sides[0].owner = context.defender;
            self.sides[1].owner = context.invader;
        }

        info!(
            domain = ?context.domain,
            battle_id,
            mid_tactical = context.mid_tactical,
            "Auto-resolve prepared"
        );
        Ok(())
    }

    pub fn prepare_for_space(&mut self, players: PlayerRegistry, now: Frame) -> Result<()> {
        self.prepare(BattleContext::space(players), now)
    }

    pub fn prepare_for_land(&mut self, players: PlayerRegistry, invader: PlayerId, now: Frame) -> Result<()> {
        self.prepare(BattleContext::land(players, invader), now)
    }

    /// Freeze the rosters and compute both baseline force profiles
    pub fn initiate_combat(&mut self, aggressor: PlayerId) -> Result<()> {
        if !self.state.prepared || self.state.initiated {
            return Err(Rejection::NotReady.into());
        }
        if !self.sides.iter().any(|side| side.owner == Some(aggressor)) {
            return Err(Rejection::AggressorNotParticipant(aggressor).into());
        }
        if self.sides.iter().any(|side| side.owner.is_none() || side.queue.is_empty()) {
            return Err(Rejection::NoConflict.into());
        }

        let computed = {
            let ctx = self.force_context();
            let mut computed = Vec::with_capacity(self.sides.len());
            for (index, side) in self.sides.iter().enumerate() {
                let owner = side.owner.ok_or(FatalError::SideWithoutOwner(index))?;
                let force = force::calculate_side_force(&ctx, &self.arena, &side.queue, owner)?;
                let heroes = force::find_special_heroes(&ctx, &self.arena, &side.queue)?;
                computed.push((force, heroes));
            }
            computed
        };

        for (side, (force, (super_weapon, killer))) in self.sides.iter_mut().zip(computed) {
            side.baseline = force.profile;
            side.weakest = force.weakest;
            side.super_weapon = super_weapon;
            side.super_weapon_killer = killer;
        }

        self.state.initiated = true;
        self.state.aggressor = Some(aggressor);

        info!(
            domain = ?self.state.domain,
            side_a = ?self.sides[0].owner,
            side_b = ?self.sides[1].owner,
            units_a = self.sides[0].unit_count(),
            units_b = self.sides[1].unit_count(),
            %aggressor,
            "Auto-resolve combat initiated"
        );

        self.resolve_transport_standoff(aggressor);
        Ok(())
    }

    /// Space battle with nothing but transports: the bigger convoy wins
    fn resolve_transport_standoff(&mut self, aggressor: PlayerId) {
        let domain = self.state.domain;
        let armed = self.sides.iter().any(|side| side.super_weapon.is_some());
        let unarmed = self.sides.iter().all(|side| side.baseline.aggregate(Domain::Space) <= 0.0);
        if armed || !domain.is_space() || !unarmed {
            return;
        }

        let counts = [self.sides[0].unit_count(), self.sides[1].unit_count()];
        let loser = match counts[0].cmp(&counts[1]) {
            std::cmp::Ordering::Greater => 1,
            std::cmp::Ordering::Less => 0,
            std::cmp::Ordering::Equal if self.sides[0].owner == Some(aggressor) => 0,
            std::cmp::Ordering::Equal => 1,
        };
        let winner = 1 - loser;

        self.state.winner = self.sides[winner].owner;
        self.state.retreating = self.sides[loser].owner;
        self.state.battle_fought = true;
        debug!(?counts, loser, "Transport-only standoff decided without a fight");
    }

    /// Advance the battle
    ///
    /// Pacing holds the fight back until the fight fraction of the display
    /// time has passed, unless `instant` is set or a retreat is underway.
    pub fn combat_round(&mut self, now: Frame, instant: bool) -> Result<RoundStatus> {
        if !self.state.initiated {
            return Err(Rejection::NotReady.into());
        }
        self.state.now = now;

        if self.state.over {
            return Ok(RoundStatus::Over);
        }

        if self.state.retreat_reported {
            self.complete_retreat()?;
            return Ok(RoundStatus::Over);
        }

        let elapsed = now.saturating_sub(self.state.start_frame) as f32;
        let fight_frames = self.config.fight_frames();

        if self.state.retreating.is_none() && !instant && elapsed < fight_frames {
            self.state.rounds += 1;
            return Ok(RoundStatus::InProgress);
        }

        let extra = fight_frames - elapsed;
        if extra > 0.0 {
            self.state.start_frame = self.state.start_frame.saturating_sub(extra as Frame);
        }

        if !self.state.battle_fought {
            self.resolve_battle()?;
        }

        if !instant && elapsed < self.config.display_frames() {
            self.state.rounds += 1;
            return Ok(RoundStatus::InProgress);
        }

        if self.state.retreating.is_some() {
            self.state.retreat_reported = true;
            Ok(RoundStatus::Retreating)
        } else {
            self.finish();
            Ok(RoundStatus::Over)
        }
    }

    /// The one resolution pass of a battle
    fn resolve_battle(&mut self) -> Result<()> {
        let owners = [
            self.sides[0].owner.ok_or(FatalError::SideWithoutOwner(0))?,
            self.sides[1].owner.ok_or(FatalError::SideWithoutOwner(1))?,
        ];
        for (index, side) in self.sides.iter().enumerate() {
            if side.queue.is_empty() {
                error!(side = index, "Side reached resolution with an empty queue");
                return Err(FatalError::EmptySide(index).into());
            }
        }

        let retreat = self.state.retreating.is_some();
        let (loser_attrition, winner_attrition) = if retreat {
            (self.config.retreat_loser_attrition, self.config.retreat_winner_attrition)
        } else {
            (self.config.loser_attrition, self.config.winner_attrition)
        };

        // ===== PHASE 1: ATTACK EXCHANGE =====
        let mut remaining = {
            let ctx = self.force_context();
            let bomber = self.state.bomber_type.and_then(|id| self.units.get(id));
            let bomber_for = |owner: PlayerId| bomber.filter(|_| self.state.bombing_run == Some(owner));

            let against_b = force::side_attack(
                &ctx,
                &self.arena,
                &self.sides[0].queue,
                &self.sides[1].baseline,
                owners[0],
                bomber_for(owners[0]),
            )?;
            let against_a = force::side_attack(
                &ctx,
                &self.arena,
                &self.sides[1].queue,
                &self.sides[0].baseline,
                owners[1],
                bomber_for(owners[1]),
            )?;
            [against_a, against_b]
        };

        // ===== PHASE 2: WINNER =====
        let winner = {
            let [a, b] = &remaining;
            self.determine_winner_index([a, b])
        };
        let loser = 1 - winner;
        let pirate = !self.players.is_playable(owners[loser]);
        self.state.winner = Some(owners[winner]);

        let winner_front = self.sides[winner].queue.first().copied();
        let loser_front = self.sides[loser].queue.first().copied();
        let killer_of = |combatant: Option<CombatantId>| combatant.and_then(|id| self.arena.get(id)).map(|c| c.owner());
        let killers = {
            let mut killers = [None; 2];
            killers[loser] = killer_of(winner_front);
            killers[winner] = killer_of(loser_front);
            killers
        };

        debug!(
            winner,
            remaining_a = remaining[0].total_positive().0,
            remaining_b = remaining[1].total_positive().0,
            pirate,
            "Attack exchange resolved"
        );

        // ===== PHASE 3: TRANSPORT LOSSES =====
        if self.apply_transport_losses(loser, pirate, killers[loser])? {
            self.request_retreat(owners[loser]);
        }

        // ===== PHASE 4: BLEND TOWARD BASELINE =====
        let domain = self.state.domain;
        for (index, rate) in [(loser, loser_attrition), (winner, winner_attrition)] {
            let baseline = self.sides[index].baseline.aggregate(domain);
            let current = remaining[index].aggregate(domain);
            remaining[index].set_aggregate(domain, current + (baseline - current) * (1.0 - rate));
        }

        self.sides[loser].weakest = None;
        if pirate {
            remaining[loser].set_aggregate(domain, 0.0);
        }
        for profile in &mut remaining {
            profile.clamp_and_rebalance();
        }

        // ===== PHASE 5: ATTRITION =====
        for (index, profile) in remaining.iter_mut().enumerate() {
            let is_loser = index == loser;
            let any_left = self.apply_attrition(index, profile, is_loser, killers[index])?;
            if any_left && is_loser {
                self.request_retreat(owners[loser]);
            }
        }

        if self.sides[loser].queue.is_empty() && self.state.retreating.is_some() {
            self.state.retreating = None;
        }

        if self.sides[loser].super_weapon.is_some() && self.sides[winner].super_weapon_killer.is_some() {
            self.state.pending_victory = Some(owners[winner]);
            self.log_event(
                BattleEventType::PendingVictory { winner: owners[winner] },
                format!("{} destroyed the enemy super weapon", owners[winner]),
            );
        }

        self.state.battle_fought = true;

        info!(
            winner = %owners[winner],
            survivors_winner = self.sides[winner].unit_count(),
            survivors_loser = self.sides[loser].unit_count(),
            casualties = self.history.current().killed.len(),
            retreating = ?self.state.retreating,
            "Auto-resolve battle fought"
        );
        Ok(())
    }

    fn request_retreat(&mut self, owner: PlayerId) {
        if let Err(reason) = self.player_retreats(owner) {
            debug!(%owner, %reason, "Retreat request ignored");
        }
    }

    /// Evacuate whatever the retreating side still has and end the battle
    fn complete_retreat(&mut self) -> Result<()> {
        if let Some(retreating) = self.state.retreating {
            if let Some(index) = self.side_index(retreating) {
                let queue = std::mem::take(&mut self.sides[index].queue);
                for id in queue {
                    self.evacuate(index, id)?;
                }
            }
        }
        self.state.retreating = None;
        self.finish();
        Ok(())
    }

    fn finish(&mut self) {
        if !self.state.over {
            self.state.over = true;
            info!(winner = ?self.state.winner, "Auto-resolve combat over");
        }
    }

    // ===== RETREAT =====

    /// Start a retreat for `owner`
    pub fn player_retreats(&mut self, owner: PlayerId) -> Result<()> {
        if !self.state.initiated {
            return Err(Rejection::NotReady.into());
        }
        if self.state.retreating.is_some() {
            return Err(Rejection::AlreadyRetreating.into());
        }
        if self.side_index(owner).is_none() {
            return Err(Rejection::InvalidOwner(owner).into());
        }
        self.state.retreating = Some(owner);
        debug!(%owner, "Retreat started");
        Ok(())
    }

    /// Destroy every unit of the retreating side and settle the battle
    pub fn kill_retreating_units(&mut self) -> Result<()> {
        if !self.state.initiated {
            return Err(Rejection::NotReady.into());
        }
        let Some(retreating) = self.state.retreating else {
            return Ok(());
        };
        let Some(loser) = self.side_index(retreating) else {
            return Ok(());
        };
        let winner = 1 - loser;
        let Some(winner_front) = self.sides[winner].queue.first().copied() else {
            return Ok(());
        };
        let killer = self.arena.require(winner_front)?.owner();

        let queue = self.sides[loser].queue.clone();
        for id in queue {
            self.destroy(loser, id, Some(killer))?;
        }

        self.state.retreating = None;
        self.state.winner = self.sides[winner].owner;
        self.state.battle_fought = true;
        info!(%retreating, "Retreating units destroyed");
        Ok(())
    }

    /// Release every combatant and free the engine for the next battle
    pub fn cleanup_combat(&mut self) {
        if !self.state.mid_tactical {
            let domain = self.state.domain;
            let planet = self.state.planet.as_ref().map(|planet| planet.id);
            let fleets = std::mem::take(&mut self.state.fleets);
            for object in planet.into_iter().chain(fleets) {
                self.log_event(
                    BattleEventType::ConflictEnd { object, domain },
                    format!("{:?} conflict ended", domain),
                );
            }
        }

        self.arena.release_all();
        for side in &mut self.sides {
            side.reset();
        }
        self.state = BattleState {
            now: self.state.now,
            ..Default::default()
        };
        debug!("Auto-resolve cleaned up");
    }

    /// Hand all pending events to the caller
    pub fn drain_events(&mut self) -> Vec<BattleEvent> {
        self.events.drain()
    }

    // ===== QUERIES =====

    pub(crate) fn side_index(&self, owner: PlayerId) -> Option<usize> {
        self.sides.iter().position(|side| side.owner == Some(owner))
    }

    pub(crate) fn side_by_owner(&self, owner: PlayerId) -> Option<&Side> {
        self.side_index(owner).map(|index| &self.sides[index])
    }

    pub fn who_won(&self) -> Option<PlayerId> {
        self.state.winner
    }

    /// Player currently retreating, if any
    pub fn side_is_retreating(&self) -> Option<PlayerId> {
        self.state.retreating
    }

    pub fn side_a(&self) -> Option<PlayerId> {
        self.sides[0].owner
    }

    pub fn side_b(&self) -> Option<PlayerId> {
        self.sides[1].owner
    }

    pub fn side_aggressor(&self) -> Option<PlayerId> {
        self.state.aggressor
    }

    pub fn side_defender(&self) -> Option<PlayerId> {
        if self.sides[0].owner.is_some() && self.sides[0].owner == self.state.aggressor {
            self.sides[1].owner
        } else {
            self.sides[0].owner
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.prepared
    }

    pub fn domain(&self) -> Domain {
        self.state.domain
    }

    pub fn battle_id(&self) -> usize {
        self.history.current_id()
    }

    pub fn battle(&self, id: usize) -> Option<&BattleRecord> {
        self.history.get(id)
    }

    pub fn pending_victory(&self) -> Option<PlayerId> {
        self.state.pending_victory
    }

    pub fn phase(&self) -> BattlePhase {
        let state = &self.state;
        if !state.prepared {
            BattlePhase::NotReady
        } else if state.over {
            BattlePhase::Over
        } else if state.retreat_reported {
            BattlePhase::Retreating
        } else if !state.initiated {
            BattlePhase::Prepared
        } else if state.rounds > 0 || state.battle_fought {
            BattlePhase::RoundInProgress
        } else {
            BattlePhase::Initiated
        }
    }

    pub fn side_has_retreat_protection(&self, owner: PlayerId) -> bool {
        self.side_by_owner(owner)
            .is_some_and(|side| side.has_retreat_protection(&self.arena, &self.units, self.state.domain))
    }

    /// Share of the fight still to play out on screen (1.0 down to 0.0)
    pub fn health_ratio(&self) -> f32 {
        let elapsed = self.state.now.saturating_sub(self.state.start_frame) as f32;
        let fight_frames = self.config.fight_frames();
        if fight_frames <= 0.0 {
            return 0.0;
        }
        1.0 - (elapsed / fight_frames).min(1.0)
    }

    /// Combatant at `position` in an owner's queue
    pub fn queue_at(&self, owner: PlayerId, position: usize) -> Option<CombatantId> {
        self.side_by_owner(owner)?.queue.get(position).copied()
    }

    pub fn queue(&self, owner: PlayerId) -> &[CombatantId] {
        self.side_by_owner(owner).map(|side| side.queue.as_slice()).unwrap_or(&[])
    }

    pub fn visible_queue_size(&self) -> usize {
        self.config.visible_queue_size
    }

    pub fn combatant(&self, id: CombatantId) -> Option<&Combatant> {
        self.arena.get(id)
    }

    pub fn combatant_status(&self, id: CombatantId) -> Option<CombatantStatus> {
        self.arena.get(id).map(|combatant| combatant.status)
    }

    /// Current state of the planet being fought over
    pub fn planet(&self) -> Option<&GameObject> {
        self.state
            .planet_combatant
            .and_then(|id| self.arena.get(id))
            .map(|combatant| &combatant.object)
            .or(self.state.planet.as_ref())
    }

    pub fn bombing_run(&self) -> Option<(PlayerId, UnitTypeId)> {
        self.state.bombing_run.zip(self.state.bomber_type)
    }
}
