//! Auto-resolve configuration with documented constants
//!
//! All tuning numbers used by the engine are collected here. Several of them
//! (the mid-tactical force multiplier, the attrition allowance) are ad hoc
//! balance knobs rather than derived quantities, so they are data, not code.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::LoadError;

/// Tuning constants for the auto-resolve engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoResolveConfig {
    // === PACING ===
    /// Total on-screen time of an auto-resolved battle (seconds)
    pub display_time_secs: f32,

    /// Fraction of the display time that must elapse before the fight
    /// itself is resolved. The rest is spent showing the result.
    pub fight_fraction: f32,

    /// Logical simulation frames per second, used to convert frames to time
    pub logical_fps: u32,

    // === LOSSES ===
    /// Fraction of a losing side's transports that are lost in space
    ///
    /// At 0.5, four transports leave two survivors. A lone transport never
    /// survives.
    pub transport_losses: f32,

    /// Scale applied to a unit's cost when checking whether the remaining
    /// force can still afford it during attrition
    ///
    /// Below 1.0 makes survival easier: a unit survives while
    /// `remaining - cost * allowance > 0`, but always consumes its full cost.
    pub attrition_allowance_factor: f32,

    /// Multiplier on a side's remaining force when auto-resolving from
    /// inside a running tactical battle
    ///
    /// Makes mid-tactical resolution deliberately less efficient than
    /// fighting it out.
    pub tactical_force_multiplier: f32,

    /// Attrition rate of the winner (1.0 = keeps all attack damage,
    /// 0.0 = fully restored to its baseline)
    pub winner_attrition: f32,

    /// Attrition rate of the loser
    pub loser_attrition: f32,

    /// Winner attrition while a retreat is in progress
    pub retreat_winner_attrition: f32,

    /// Loser attrition while a retreat is in progress
    pub retreat_loser_attrition: f32,

    // === DISPLAY EXCHANGE ===
    /// Damage multiplier for fire aimed at the planet owner in land battles
    pub default_defense_adjust: f32,

    /// Rounds to wait before refilling an emptied front/escort slot
    pub reposition_delay: u32,

    /// Number of queued units shown per side
    pub visible_queue_size: usize,

    // === HISTORY ===
    /// How many recent battle summaries are kept
    pub history_capacity: usize,
}

impl Default for AutoResolveConfig {
    fn default() -> Self {
        Self {
            // Pacing
            display_time_secs: 4.0,
            fight_fraction: 0.6666,
            logical_fps: 30,

            // Losses
            transport_losses: 0.5,
            attrition_allowance_factor: 0.75,
            tactical_force_multiplier: 0.5,
            winner_attrition: 0.35,
            loser_attrition: 1.0,
            retreat_winner_attrition: 0.2,
            retreat_loser_attrition: 0.5,

            // Display
            default_defense_adjust: 0.75,
            reposition_delay: 1,
            visible_queue_size: 3,

            // History
            history_capacity: 8,
        }
    }
}

impl AutoResolveConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames that must elapse before the fight is resolved
    pub fn fight_frames(&self) -> f32 {
        self.display_time_secs * self.fight_fraction * self.logical_fps as f32
    }

    /// Frames the whole battle stays on screen
    pub fn display_frames(&self) -> f32 {
        self.display_time_secs * self.logical_fps as f32
    }

    /// Parse a config from TOML; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, LoadError> {
        let config: AutoResolveConfig = toml::from_str(content)?;
        config.validate().map_err(LoadError::Invalid)?;
        Ok(config)
    }

    /// Load a config file from disk
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.logical_fps == 0 {
            return Err("logical_fps must be positive".into());
        }

        if !(0.0..=1.0).contains(&self.fight_fraction) {
            return Err(format!(
                "fight_fraction ({}) must be within [0, 1]",
                self.fight_fraction
            ));
        }

        let rates = [
            ("transport_losses", self.transport_losses),
            ("winner_attrition", self.winner_attrition),
            ("loser_attrition", self.loser_attrition),
            ("retreat_winner_attrition", self.retreat_winner_attrition),
            ("retreat_loser_attrition", self.retreat_loser_attrition),
        ];
        for (name, rate) in rates {
            if !(0.0..=1.0).contains(&rate) {
                return Err(format!("{} ({}) must be within [0, 1]", name, rate));
            }
        }

        if self.attrition_allowance_factor < 0.0 || self.tactical_force_multiplier < 0.0 {
            return Err("Force multipliers must not be negative".into());
        }

        if self.history_capacity == 0 {
            return Err("history_capacity must be at least 1".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AutoResolveConfig::default().validate().is_ok());
    }

    #[test]
    fn test_fight_resolves_before_display_ends() {
        let config = AutoResolveConfig::default();
        assert!(config.fight_frames() < config.display_frames());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AutoResolveConfig::from_toml_str("transport_losses = 0.25\n").unwrap();
        assert_eq!(config.transport_losses, 0.25);
        assert_eq!(config.history_capacity, 8);
    }

    #[test]
    fn test_out_of_range_rate_rejected() {
        let result = AutoResolveConfig::from_toml_str("loser_attrition = 1.5\n");
        assert!(matches!(result, Err(LoadError::Invalid(_))));
    }
}
