//! Ring buffer of recent battle summaries

use serde::{Deserialize, Serialize};

use crate::core::types::{PlayerId, UnitTypeId};

/// Planet and casualties of one resolved battle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleRecord {
    pub planet_type: Option<String>,
    pub killed: Vec<(UnitTypeId, PlayerId)>,
}

impl BattleRecord {
    fn clear(&mut self) {
        self.planet_type = None;
        self.killed.clear();
    }
}

/// Fixed-capacity history; preparing a battle claims the next slot
#[derive(Debug, Clone)]
pub struct BattleHistory {
    records: Vec<BattleRecord>,
    current: usize,
}

impl BattleHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: vec![BattleRecord::default(); capacity.max(1)],
            current: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    /// Move to the next slot, clear it and return its id
    pub fn advance(&mut self) -> usize {
        self.current = (self.current + 1) % self.records.len();
        self.records[self.current].clear();
        self.current
    }

    pub fn current_id(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &BattleRecord {
        &self.records[self.current]
    }

    pub fn set_planet(&mut self, planet_type: &str) {
        self.records[self.current].planet_type = Some(planet_type.to_string());
    }

    pub fn record_kill(&mut self, unit_type: UnitTypeId, owner: PlayerId) {
        self.records[self.current].killed.push((unit_type, owner));
    }

    pub fn get(&self, id: usize) -> Option<&BattleRecord> {
        self.records.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_wraps_and_clears() {
        let mut history = BattleHistory::new(3);
        assert_eq!(history.advance(), 1);
        history.record_kill(UnitTypeId(4), PlayerId(1));
        history.set_planet("Desert World");
        assert_eq!(history.get(1).unwrap().killed.len(), 1);

        assert_eq!(history.advance(), 2);
        assert_eq!(history.advance(), 0);
        assert_eq!(history.advance(), 1);
        assert!(history.current().killed.is_empty());
        assert_eq!(history.current().planet_type, None);
    }

    #[test]
    fn test_out_of_range_lookup() {
        let history = BattleHistory::new(2);
        assert!(history.get(5).is_none());
    }
}
