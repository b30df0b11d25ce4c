//! Ordered, deduplicating store of game descriptors.

use std::collections::HashSet;

use tracing::debug;
use ubitrack_model::{GameDescriptor, GameStatus};

/// Every title known to a session, in discovery order.
///
/// An entry is identified by its space id and its launch id; either one alone
/// is enough to match. Merging never creates a second entry for a key that
/// already matches.
///
/// Mutation is single-writer: callers that share a registry across threads
/// wrap it in a mutex.
#[derive(Debug, Clone, Default)]
pub struct GameRegistry {
    entries: Vec<GameDescriptor>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a batch of descriptors into the registry.
    ///
    /// A descriptor matching no existing key is appended. Otherwise it is
    /// merged into the first matching entry in insertion order: missing ids
    /// are adopted, an Unknown status takes the incoming one, and `owned` is
    /// or-ed. Returns the number of entries appended.
    pub fn merge(&mut self, incoming: impl IntoIterator<Item = GameDescriptor>) -> usize {
        let mut spaces: HashSet<String> = self
            .entries
            .iter()
            .filter_map(|g| g.space_id().map(str::to_string))
            .collect();
        let mut launches: HashSet<String> = self
            .entries
            .iter()
            .filter_map(|g| g.launch_id().map(str::to_string))
            .collect();

        let mut appended = 0;
        for game in incoming {
            let known = game.space_id().is_some_and(|id| spaces.contains(id))
                || game.launch_id().is_some_and(|id| launches.contains(id));

            if !known {
                spaces.extend(game.space_id().map(str::to_string));
                launches.extend(game.launch_id().map(str::to_string));
                self.entries.push(game);
                appended += 1;
                continue;
            }

            let Some(existing) = self.entries.iter_mut().find(|e| same_title(e, &game)) else {
                continue;
            };

            if existing.launch_id().is_none()
                && let Some(launch_id) = game.launch_id()
            {
                debug!(game = %existing, launch_id, "extending entry with launch id");
                existing.launch_id = Some(launch_id.to_string());
                launches.insert(launch_id.to_string());
            }
            if existing.space_id().is_none()
                && let Some(space_id) = game.space_id()
            {
                debug!(game = %existing, space_id, "extending entry with space id");
                existing.space_id = Some(space_id.to_string());
                spaces.insert(space_id.to_string());
            }
            if existing.status == GameStatus::Unknown && game.status != GameStatus::Unknown {
                existing.status = game.status;
            }
            existing.owned |= game.owned;
        }

        appended
    }

    /// Entries that are Installed or Running.
    pub fn local_games(&self) -> Vec<&GameDescriptor> {
        self.entries.iter().filter(|g| g.status.is_local()).collect()
    }

    /// First entry whose space id or launch id equals `game_id`.
    pub fn find(&self, game_id: &str) -> Option<&GameDescriptor> {
        self.entries.iter().find(|g| g.matches_id(game_id))
    }

    pub fn find_mut(&mut self, game_id: &str) -> Option<&mut GameDescriptor> {
        self.entries.iter_mut().find(|g| g.matches_id(game_id))
    }

    /// Marks entries whose launch id appears in `owned_ids` as owned.
    ///
    /// Returns the number of entries newly marked.
    pub fn apply_ownership(&mut self, owned_ids: &[u64]) -> usize {
        let owned: HashSet<u64> = owned_ids.iter().copied().collect();
        let mut marked = 0;
        for game in &mut self.entries {
            let Some(id) = game.launch_id().and_then(|id| id.parse::<u64>().ok()) else {
                continue;
            };
            if owned.contains(&id) && !game.owned {
                game.owned = true;
                marked += 1;
            }
        }
        marked
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameDescriptor> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut GameDescriptor> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn same_title(existing: &GameDescriptor, incoming: &GameDescriptor) -> bool {
    let space = incoming
        .space_id()
        .is_some_and(|id| existing.space_id() == Some(id));
    let launch = incoming
        .launch_id()
        .is_some_and(|id| existing.launch_id() == Some(id));
    space || launch
}
