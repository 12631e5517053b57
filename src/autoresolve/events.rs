//! Effects the engine reports to the rest of the game
//!
//! The engine never mutates the game world directly. Kills, base changes,
//! conflict signals and AI feedback are queued here and drained by the
//! caller after each operation.

use serde::{Deserialize, Serialize};

use crate::core::types::{CombatantId, Domain, Frame, ObjectId, PlayerId, UnitTypeId};

/// Types of auto-resolve events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BattleEventType {
    ConflictBegin {
        object: ObjectId,
        domain: Domain,
    },
    ConflictEnd {
        object: ObjectId,
        domain: Domain,
    },
    /// Display-only damage crossing a health threshold
    UnitDamaged {
        combatant: CombatantId,
        health_ratio: f32,
    },
    UnitDestroyed {
        object: ObjectId,
        owner: PlayerId,
        unit_type: UnitTypeId,
        killer: Option<PlayerId>,
    },
    UnitEvacuated {
        object: ObjectId,
        owner: PlayerId,
    },
    BaseLevelChanged {
        planet: ObjectId,
        from: usize,
        to: usize,
        final_blow: Option<PlayerId>,
    },
    SpecialStructuresCleared {
        planet: ObjectId,
        ground: bool,
    },
    /// A super weapon fell to a killer; the winner has a victory pending
    PendingVictory {
        winner: PlayerId,
    },
    /// Survival feedback for an AI-controlled owner's learning system
    UnitSurvival {
        owner: PlayerId,
        unit_type: UnitTypeId,
        survived: bool,
    },
}

/// A logged event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleEvent {
    pub frame: Frame,
    pub event_type: BattleEventType,
    pub description: String,
}

/// Queue of events not yet collected by the caller
#[derive(Debug, Clone, Default)]
pub struct BattleEventLog {
    pub events: Vec<BattleEvent>,
}

impl BattleEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event_type: BattleEventType, description: String, frame: Frame) {
        self.events.push(BattleEvent {
            frame,
            event_type,
            description,
        });
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BattleEvent> {
        self.events.iter()
    }

    /// Hand every queued event to the caller
    pub fn drain(&mut self) -> Vec<BattleEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_empties_log() {
        let mut log = BattleEventLog::new();
        log.push(
            BattleEventType::PendingVictory { winner: PlayerId(2) },
            "victory pending".into(),
            12,
        );
        assert_eq!(log.len(), 1);

        let drained = log.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].frame, 12);
        assert!(log.is_empty());
    }
}
