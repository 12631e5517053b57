//! Auto-resolve battle engine
//!
//! Decides the outcome of a space or land battle without playing it out.
//! Each side's force is summed per unit category, weighted against the
//! enemy's composition, and the leftovers decide the winner and how much
//! of each side survives. A short display exchange between the front units
//! runs alongside for presentation only.
//!
//! Lifecycle: `prepare` -> `add_combatant`* -> `initiate_combat` ->
//! `combat_round`* -> `cleanup_combat`.

pub mod attrition;
pub mod combatant;
pub mod engine;
pub mod events;
pub mod force;
pub mod history;
pub mod intake;
pub mod side;
pub mod skirmish;
pub mod winner;

// Re-exports for convenient access
pub use attrition::transports_allowed;
pub use combatant::{Combatant, CombatantArena, CombatantStatus};
pub use engine::{AutoResolveEngine, BattleContext, BattlePhase, Intake, RoundStatus};
pub use events::{BattleEvent, BattleEventLog, BattleEventType};
pub use force::{balance_score, calculate_side_force, side_attack, ForceContext, SideForce};
pub use history::{BattleHistory, BattleRecord};
pub use side::Side;
pub use skirmish::show_damage_for;
pub use winner::compare_forces;
