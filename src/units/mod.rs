//! Unit types, players and the game objects that fight

pub mod object;
pub mod player;
pub mod registry;
pub mod unit_type;

pub use object::{GameObject, ObjectKind, PlanetData};
pub use player::{Player, PlayerRegistry};
pub use registry::UnitTypeRegistry;
pub use unit_type::{AbilityFactor, GarrisonSpawn, UnitRole, UnitType};
