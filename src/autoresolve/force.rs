//! Force arithmetic: baseline profiles and attack strikes
//!
//! A side's baseline profile is built once at initiation. Each resolution
//! pass, every attacker of one side strikes a copy of the other side's
//! baseline: it picks the category bucket its power is best matched
//! against, hits it with contrast-weighted power and lets any unspent
//! power fall into the domain's catch-all bucket.

use super::combatant::{Combatant, CombatantArena};
use crate::contrast::profile::ForceProfile;
use crate::contrast::table::ContrastTable;
use crate::core::error::FatalError;
use crate::core::types::{CategoryMask, CombatantId, Domain, PlayerId, Terrain};
use crate::units::player::PlayerRegistry;
use crate::units::registry::UnitTypeRegistry;
use crate::units::unit_type::UnitType;

/// Number of distinct category bits
const CATEGORY_BITS: usize = 32;

/// Read-only inputs shared by all force computations of a battle
#[derive(Debug, Clone, Copy)]
pub struct ForceContext<'a> {
    pub table: &'a ContrastTable,
    pub units: &'a UnitTypeRegistry,
    pub players: &'a PlayerRegistry,
    pub domain: Domain,
    pub terrain: Option<Terrain>,
    pub mid_tactical: bool,
}

impl<'a> ForceContext<'a> {
    fn combat_type(&self, combatant: &Combatant) -> Result<&'a UnitType, FatalError> {
        combatant
            .combat_type(self.domain, self.units)
            .ok_or(FatalError::UnknownUnitType(combatant.object_id()))
    }

    /// Garrisons come along unless the unit was spawned inside a tactical
    /// battle, or is a star base in a mid-tactical resolution
    pub fn garrison_applies(&self, combatant: &Combatant, unit_type: &UnitType) -> bool {
        !combatant.object.spawned_in_tactical && !(unit_type.is_star_base() && self.mid_tactical)
    }

    fn terrain_multiplier(&self, unit_type: &UnitType) -> Option<f32> {
        self.terrain.map(|terrain| {
            self.table
                .effectiveness_on_terrain(self.units.terrain_movement_class(unit_type), terrain)
        })
    }

    /// Turret types of a planet fighting on land, if this combatant is one
    fn land_turrets(&self, combatant: &'a Combatant) -> Option<impl Iterator<Item = &'a UnitType> + 'a> {
        if self.domain.is_space() {
            return None;
        }
        let units = self.units;
        combatant
            .object
            .planet()
            .map(move |planet| planet.turrets.iter().filter_map(move |id| units.get(*id)))
    }
}

/// Per-category strength bonus granted by heroes, indexed by category bit
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryBoosts([f32; CATEGORY_BITS]);

impl Default for CategoryBoosts {
    fn default() -> Self {
        Self([0.0; CATEGORY_BITS])
    }
}

impl CategoryBoosts {
    /// Collect the best bonus per category over every unit's special
    /// abilities; a factor of 1.25 is stored as 0.25
    pub fn collect<'u>(unit_types: impl IntoIterator<Item = &'u UnitType>) -> Self {
        let mut boosts = Self::default();
        for unit_type in unit_types {
            for ability in &unit_type.ability_factors {
                let bonus = ability.factor - 1.0;
                if let Some(bit) = ability.category.first_bit() {
                    let slot = &mut boosts.0[bit as usize];
                    if bonus > *slot {
                        *slot = bonus;
                    }
                }
            }
        }
        boosts
    }

    /// Power multiplier for an attacker with these categories (0 = none)
    pub fn factor_for(&self, categories: CategoryMask) -> f32 {
        let best = categories
            .bits()
            .map(|bit| self.0[bit as usize])
            .fold(0.0, f32::max);
        if best > 0.0 {
            best + 1.0
        } else {
            0.0
        }
    }
}

/// Baseline profile and weakest unit of one side
#[derive(Debug, Clone)]
pub struct SideForce {
    pub profile: ForceProfile,
    pub weakest: Option<CombatantId>,
}

/// Build a side's baseline force profile from its roster
pub fn calculate_side_force(
    ctx: &ForceContext<'_>,
    arena: &CombatantArena,
    queue: &[CombatantId],
    owner: PlayerId,
) -> Result<SideForce, FatalError> {
    let mut profile = ForceProfile::for_domain(ctx.table, ctx.domain);
    let tech_level = ctx.players.tech_level(owner);
    let mut weakest: Option<(CombatantId, f32)> = None;

    for id in queue {
        let combatant = arena.require(*id)?;

        // Planetary defenses on land are counted through their turrets
        if let Some(turrets) = ctx.land_turrets(combatant) {
            for turret in turrets {
                profile.add_force(Domain::Land, turret.categories, turret.power);
            }
            continue;
        }

        let unit_type = ctx.combat_type(combatant)?;

        if ctx.garrison_applies(combatant, unit_type) {
            for spawn in unit_type.garrison_at(tech_level) {
                if let Some(garrison) = ctx.units.get(spawn.unit_type) {
                    profile.add_force(
                        ctx.domain,
                        garrison.categories,
                        spawn.count as f32 * garrison.power,
                    );
                }
            }
        }

        if unit_type.is_transport() && ctx.domain.is_space() {
            continue;
        }

        if weakest.map_or(true, |(_, power)| unit_type.power < power) {
            weakest = Some((*id, unit_type.power));
        }

        profile.add_force(ctx.domain, unit_type.categories, unit_type.power);
    }

    Ok(SideForce {
        profile,
        weakest: weakest.map(|(id, _)| id),
    })
}

/// Super weapon and super weapon killer of a roster, if any
pub fn find_special_heroes(
    ctx: &ForceContext<'_>,
    arena: &CombatantArena,
    queue: &[CombatantId],
) -> Result<(Option<CombatantId>, Option<CombatantId>), FatalError> {
    let mut super_weapon = None;
    let mut killer = None;
    for id in queue {
        let combatant = arena.require(*id)?;
        let Some(unit_type) = combatant.combat_type(ctx.domain, ctx.units) else {
            continue;
        };
        if unit_type.super_weapon && super_weapon.is_none() {
            super_weapon = Some(*id);
        }
        if ctx.units.contains_super_weapon_killer(unit_type) && killer.is_none() {
            killer = Some(*id);
        }
    }
    Ok((super_weapon, killer))
}

/// Balance term of the targeting score
///
/// 1.0 when the scaled attack exactly matches the remaining force, falling
/// toward 0 as they diverge.
pub fn balance_score(remaining: f32, scaled_power: f32) -> f32 {
    let denominator = remaining.max(scaled_power);
    if denominator <= 0.0 {
        return 0.0;
    }
    let balance = (remaining - scaled_power) / denominator;
    (1.0 - balance * balance).max(0.0)
}

/// Pick the category bucket an attacker is best matched against
///
/// Returns `None` when no bucket scores positively; ties keep the first.
pub fn find_contrast_index(
    ctx: &ForceContext<'_>,
    power: f32,
    attacker: &UnitType,
    profile: &ForceProfile,
) -> Option<usize> {
    let terrain = ctx.terrain_multiplier(attacker);
    let mut best_score = 0.0f32;
    let mut best = None;

    for (index, bucket) in profile.buckets().iter().enumerate() {
        if bucket.category.is_none() || bucket.force <= 0.0 {
            continue;
        }

        let mut weight = ctx.table.average_contrast_factor(attacker, bucket.category);
        if let Some(multiplier) = terrain {
            weight *= multiplier;
        }
        if weight <= 0.0 {
            continue;
        }

        let score = balance_score(bucket.force, power * weight) * weight;
        if score > best_score {
            best_score = score;
            best = Some(index);
        }
    }
    best
}

/// Spend an attacker's power against the chosen bucket
///
/// Power not absorbed by the bucket is charged to the same-domain catch-all
/// bucket; with no chosen bucket everything goes to the catch-all of the
/// attacker's own domain. Returns the unspent power.
pub fn apply_unit_contrast(
    ctx: &ForceContext<'_>,
    power: f32,
    attacker: &UnitType,
    profile: &mut ForceProfile,
    chosen: Option<usize>,
    boosts: &CategoryBoosts,
) -> f32 {
    let original_power = power;
    let mut power = power;

    let factor = boosts.factor_for(attacker.categories);
    if factor != 0.0 {
        power *= factor;
    }

    let leftover = match chosen.and_then(|index| profile.bucket(index).copied().map(|b| (index, b))) {
        Some((index, bucket)) => {
            let mut weight = ctx.table.average_contrast_factor(attacker, bucket.category);
            if bucket.is_ground {
                if let Some(multiplier) = ctx.terrain_multiplier(attacker) {
                    weight *= multiplier;
                }
            }
            let scaled = power * weight;
            if scaled <= 0.0 {
                return 0.0;
            }

            let applied = bucket.force.min(scaled);
            let leftover = (1.0 - applied / scaled) * original_power;
            profile.subtract(index, applied);
            profile.subtract(ForceProfile::catch_all_index(bucket.is_ground), applied + leftover);
            leftover
        }
        None => {
            profile.subtract(ForceProfile::catch_all_index(attacker.is_ground()), power);
            0.0
        }
    };

    profile.clamp_and_rebalance();
    leftover
}

/// One targeted strike by a single attacker
pub fn strike(
    ctx: &ForceContext<'_>,
    attacker: &UnitType,
    profile: &mut ForceProfile,
    boosts: &CategoryBoosts,
) {
    let power = attacker.power;
    if power <= 0.0 {
        return;
    }
    let chosen = find_contrast_index(ctx, power, attacker, profile);
    apply_unit_contrast(ctx, power, attacker, profile, chosen, boosts);
}

/// Every unit of `queue` attacks a copy of the enemy baseline
///
/// An active bombing run strikes first, then each unit fires once along
/// with its turrets or garrison.
pub fn side_attack(
    ctx: &ForceContext<'_>,
    arena: &CombatantArena,
    queue: &[CombatantId],
    target_baseline: &ForceProfile,
    owner: PlayerId,
    bomber: Option<&UnitType>,
) -> Result<ForceProfile, FatalError> {
    let mut result = target_baseline.clone();
    let tech_level = ctx.players.tech_level(owner);

    let mut roster = Vec::with_capacity(queue.len());
    for id in queue {
        roster.push(arena.require(*id)?);
    }

    let boosts = CategoryBoosts::collect(
        roster
            .iter()
            .filter_map(|combatant| combatant.combat_type(ctx.domain, ctx.units)),
    );

    if let Some(bomber) = bomber {
        strike(ctx, bomber, &mut result, &boosts);
    }

    for combatant in roster {
        if let Some(turrets) = ctx.land_turrets(combatant) {
            for turret in turrets {
                strike(ctx, turret, &mut result, &boosts);
            }
            continue;
        }

        let unit_type = ctx.combat_type(combatant)?;

        if ctx.garrison_applies(combatant, unit_type) {
            for spawn in unit_type.garrison_at(tech_level) {
                if let Some(garrison) = ctx.units.get(spawn.unit_type) {
                    for _ in 0..spawn.count {
                        strike(ctx, garrison, &mut result, &boosts);
                    }
                }
            }
        }

        if unit_type.is_transport() && ctx.domain.is_space() {
            continue;
        }

        strike(ctx, unit_type, &mut result, &boosts);
    }

    Ok(result)
}
