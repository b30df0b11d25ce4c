use std::collections::HashMap;

use crate::game::GameStatus;

/// Status of every tracked title at one polling tick, keyed by launch id.
///
/// Snapshots are immutable once published; the tracker builds a fresh one per
/// tick and swaps it in whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSnapshot {
    statuses: HashMap<String, GameStatus>,
    tick: u64,
}

impl StatusSnapshot {
    pub fn new(tick: u64) -> Self {
        Self {
            statuses: HashMap::new(),
            tick,
        }
    }

    pub fn insert(&mut self, launch_id: impl Into<String>, status: GameStatus) {
        self.statuses.insert(launch_id.into(), status);
    }

    pub fn get(&self, launch_id: &str) -> Option<GameStatus> {
        self.statuses.get(launch_id).copied()
    }

    /// Polling tick that produced this snapshot (0 before the first tick).
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, GameStatus)> {
        self.statuses.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
