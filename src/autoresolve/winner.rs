//! Winner determination

use tracing::debug;

use super::engine::AutoResolveEngine;
use crate::contrast::profile::ForceProfile;
use crate::units::player::Player;

/// Compare two post-attack profiles and return the winning side index
///
/// `remaining[i]` is what is left of side `i` after the enemy's attack.
/// When both sides still stand and no human is involved, the AI playing a
/// playable faction wins outright. A complete stalemate goes to the
/// aggressor.
pub fn compare_forces(
    remaining: [&ForceProfile; 2],
    players: [Option<&Player>; 2],
    aggressor_side: usize,
) -> usize {
    let (total_a, any_a) = remaining[0].total_positive();
    let (total_b, any_b) = remaining[1].total_positive();
    let by_force = if total_a > total_b { 0 } else { 1 };

    if any_a && any_b {
        let [Some(player_a), Some(player_b)] = players else {
            return by_force;
        };
        if player_a.human || player_b.human {
            by_force
        } else if !player_a.playable {
            1
        } else if !player_b.playable {
            0
        } else {
            by_force
        }
    } else if (any_a || any_b) && total_a != total_b {
        by_force
    } else {
        aggressor_side
    }
}

impl AutoResolveEngine {
    /// Winning side index for this resolution pass
    ///
    /// A super weapon facing no killer sends the other side into retreat.
    /// An ongoing retreat hands the win to the side that stayed.
    pub(crate) fn determine_winner_index(&mut self, remaining: [&ForceProfile; 2]) -> usize {
        for (armed, other) in [(0, 1), (1, 0)] {
            if self.sides[armed].super_weapon.is_some() && self.sides[other].super_weapon_killer.is_none() {
                if let Some(owner) = self.sides[other].owner {
                    if let Err(reason) = self.player_retreats(owner) {
                        debug!(%owner, %reason, "super weapon retreat not applied");
                    }
                }
                break;
            }
        }

        if let Some(retreating) = self.state.retreating {
            return if Some(retreating) == self.sides[0].owner { 1 } else { 0 };
        }

        let players = [
            self.sides[0].owner.and_then(|owner| self.players.get(owner)),
            self.sides[1].owner.and_then(|owner| self.players.get(owner)),
        ];
        let aggressor_side = if self.state.aggressor.is_some() && self.state.aggressor == self.sides[0].owner {
            0
        } else {
            1
        };
        compare_forces(remaining, players, aggressor_side)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::contrast::table::ContrastTable;
    use crate::core::config::AutoResolveConfig;
    use crate::core::random::SyncRandom;
    use crate::core::types::{CategoryMask, Domain, PlayerId};
    use crate::units::object::GameObject;
    use crate::units::registry::UnitTypeRegistry;
    use crate::units::unit_type::UnitType;

    fn profile(total: f32) -> ForceProfile {
        let mut profile = ForceProfile::for_domain(&ContrastTable::new(), Domain::Space);
        profile.add_force(Domain::Space, CategoryMask::CAPITAL, total);
        profile
    }

    #[test]
    fn test_higher_total_wins() {
        let a = Player::human(PlayerId(1));
        let b = Player::new(PlayerId(2));
        assert_eq!(compare_forces([&profile(100.0), &profile(40.0)], [Some(&a), Some(&b)], 1), 0);
        assert_eq!(compare_forces([&profile(40.0), &profile(100.0)], [Some(&a), Some(&b)], 0), 1);
    }

    #[test]
    fn test_stalemate_goes_to_aggressor() {
        let a = Player::new(PlayerId(1));
        let b = Player::new(PlayerId(2));
        assert_eq!(compare_forces([&profile(0.0), &profile(0.0)], [Some(&a), Some(&b)], 1), 1);
        assert_eq!(compare_forces([&profile(0.0), &profile(0.0)], [Some(&a), Some(&b)], 0), 0);
    }

    #[test]
    fn test_one_sided_force_wins() {
        let a = Player::new(PlayerId(1));
        let b = Player::new(PlayerId(2));
        assert_eq!(compare_forces([&profile(0.0), &profile(5.0)], [Some(&a), Some(&b)], 0), 1);
    }

    #[test]
    fn test_ai_playable_faction_beats_pirates() {
        let empire = Player::new(PlayerId(1));
        let pirates = Player::pirate(PlayerId(2));
        // Pirates hold far more force, but an all-AI fight favours the playable faction
        assert_eq!(
            compare_forces([&profile(10.0), &profile(900.0)], [Some(&empire), Some(&pirates)], 1),
            0
        );

        let human = Player::human(PlayerId(3));
        assert_eq!(
            compare_forces([&profile(10.0), &profile(900.0)], [Some(&human), Some(&pirates)], 0),
            1
        );
    }

    /// Weak super weapon for player 1 against a cruiser line for player 2,
    /// optionally backed by a super weapon killer
    fn armed_engine(with_killer: bool) -> AutoResolveEngine {
        let mut units = UnitTypeRegistry::new();
        let doom = units.register(UnitType::new("Doom", 10.0, CategoryMask::SUPER).super_weapon());
        let cruiser = units.register(UnitType::new("Cruiser", 900.0, CategoryMask::CAPITAL));
        let killer = units.register(UnitType::new("Lancer", 200.0, CategoryMask::BOMBER).super_weapon_killer());

        let mut engine = AutoResolveEngine::new(
            Arc::new(ContrastTable::new()),
            Arc::new(units),
            AutoResolveConfig::default(),
            SyncRandom::seed_from_u64(3),
        );
        let players = [Player::human(PlayerId(1)), Player::new(PlayerId(2))].into_iter().collect();
        engine.prepare_for_space(players, 0).unwrap();
        engine.add_combatant(GameObject::ship(1, PlayerId(1), doom)).unwrap();
        for id in 2..=4 {
            engine.add_combatant(GameObject::ship(id, PlayerId(2), cruiser)).unwrap();
        }
        if with_killer {
            engine.add_combatant(GameObject::ship(5, PlayerId(2), killer)).unwrap();
        }
        engine.initiate_combat(PlayerId(2)).unwrap();
        engine
    }

    #[test]
    fn test_super_weapon_without_killer_forces_retreat() {
        let mut engine = armed_engine(false);
        let winner = engine.determine_winner_index([&profile(0.0), &profile(2700.0)]);
        assert_eq!(winner, 0);
        assert_eq!(engine.side_is_retreating(), Some(PlayerId(2)));
    }

    #[test]
    fn test_super_weapon_killer_leaves_force_to_decide() {
        let mut engine = armed_engine(true);
        let winner = engine.determine_winner_index([&profile(0.0), &profile(2700.0)]);
        assert_eq!(winner, 1);
        assert_eq!(engine.side_is_retreating(), None);
    }
}
