use thiserror::Error;

use crate::core::types::{CombatantId, ObjectId, PlayerId};

/// Why a request was refused without changing engine state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("auto-resolve is not ready for this operation")]
    NotReady,

    #[error("combat has already started")]
    CombatStarted,

    #[error("both sides need an owner and at least one combatant")]
    NoConflict,

    #[error("aggressor {0} is not a participant")]
    AggressorNotParticipant(PlayerId),

    #[error("more than two sides tried to join (owner {0})")]
    TooManySides(PlayerId),

    #[error("object {0:?} is already queued")]
    AddingTwice(ObjectId),

    #[error("owner {0} is not a known player")]
    InvalidOwner(PlayerId),

    #[error("a retreat is already in progress")]
    AlreadyRetreating,
}

/// Integration bugs and broken invariants; the battle cannot continue
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
    #[error("object {object:?} has no combat behavior ({behavior})")]
    UnrecognizedCombatant { object: ObjectId, behavior: String },

    #[error("unit type of object {0:?} is not registered")]
    UnknownUnitType(ObjectId),

    #[error("side {0} reached the round loop without an owner")]
    SideWithoutOwner(usize),

    #[error("side {0} reached the round loop with an empty queue")]
    EmptySide(usize),

    #[error("combatant {0:?} is not in the arena")]
    MissingCombatant(CombatantId),
}

/// Error returned by every fallible engine operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("fatal: {0}")]
    Fatal(#[from] FatalError),
}

impl ResolveError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ResolveError::Fatal(_))
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;

/// Errors that can occur when loading data files
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Unknown unit type: {0}")]
    UnknownUnitType(String),

    #[error("Unknown player: {0}")]
    UnknownPlayer(u32),

    #[error("Invalid data: {0}")]
    Invalid(String),
}
