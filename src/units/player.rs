//! Players and the factions they control

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::PlayerId;

/// A belligerent as seen by auto-resolve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tech_level: u32,
    #[serde(default)]
    pub human: bool,
    #[serde(default)]
    pub ai_controlled: bool,
    /// Non-playable factions (pirates, neutrals) lose everything when beaten
    #[serde(default = "default_playable")]
    pub playable: bool,
}

fn default_playable() -> bool {
    true
}

impl Player {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            name: String::new(),
            tech_level: 0,
            human: false,
            ai_controlled: true,
            playable: true,
        }
    }

    pub fn human(id: PlayerId) -> Self {
        Self {
            human: true,
            ai_controlled: false,
            ..Self::new(id)
        }
    }

    pub fn pirate(id: PlayerId) -> Self {
        Self {
            playable: false,
            ..Self::new(id)
        }
    }

    pub fn with_tech_level(mut self, tech_level: u32) -> Self {
        self.tech_level = tech_level;
        self
    }
}

/// Lookup table of every player in the session
#[derive(Debug, Clone, Default)]
pub struct PlayerRegistry {
    players: AHashMap<PlayerId, Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, player: Player) {
        self.players.insert(player.id, player);
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    /// Tech level of a player; unknown players count as level 0
    pub fn tech_level(&self, id: PlayerId) -> u32 {
        self.get(id).map(|p| p.tech_level).unwrap_or(0)
    }

    pub fn is_playable(&self, id: PlayerId) -> bool {
        self.get(id).map(|p| p.playable).unwrap_or(true)
    }
}

impl FromIterator<Player> for PlayerRegistry {
    fn from_iter<I: IntoIterator<Item = Player>>(iter: I) -> Self {
        let mut registry = PlayerRegistry::new();
        for player in iter {
            registry.insert(player);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let human = Player::human(PlayerId(1));
        assert!(human.human && !human.ai_controlled && human.playable);

        let pirate = Player::pirate(PlayerId(9));
        assert!(!pirate.playable);
    }

    #[test]
    fn test_registry_defaults_for_unknown_player() {
        let registry: PlayerRegistry = vec![Player::new(PlayerId(1)).with_tech_level(3)]
            .into_iter()
            .collect();
        assert_eq!(registry.tech_level(PlayerId(1)), 3);
        assert_eq!(registry.tech_level(PlayerId(2)), 0);
        assert!(registry.is_playable(PlayerId(2)));
    }
}
