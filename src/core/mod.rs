//! Shared primitives: ids, categories, configuration, errors and the
//! synchronized random source

pub mod config;
pub mod error;
pub mod random;
pub mod types;

pub use config::AutoResolveConfig;
pub use error::{FatalError, LoadError, Rejection, ResolveError};
pub use random::SyncRandom;
pub use types::{CategoryMask, CombatantId, Domain, Frame, MovementClass, ObjectId, PlayerId, Terrain, UnitTypeId};
