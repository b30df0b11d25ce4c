//! Session state and host-facing operations.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info, warn};
use ubitrack_games::{CatalogService, GameRegistry, club_descriptors};
use ubitrack_launcher::{ConfigurationDecoder, LauncherClient, LocalEnvironment, OwnershipDecoder};
use ubitrack_model::{GameDescriptor, GameStatus};
use ubitrack_status::{Probes, StatusTracker};

use crate::config::Config;
use crate::error::SessionError;

/// A title whose reported status changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    /// Space id if known, otherwise launch id.
    pub game_id: String,
    pub name: String,
    pub status: GameStatus,
}

impl StatusChange {
    fn of(game: &GameDescriptor) -> Self {
        Self {
            game_id: game.primary_id().unwrap_or_default().to_string(),
            name: game.name.clone(),
            status: game.status,
        }
    }
}

/// Result of folding the latest status snapshot into the registry.
#[derive(Debug, Default)]
pub struct StatusRefresh {
    pub changes: Vec<StatusChange>,
    /// Entries discovered after the owned-games listing was sent.
    pub new_games: Vec<GameDescriptor>,
}

/// One user's view of the local launcher.
pub struct Session {
    client: LauncherClient,
    registry: GameRegistry,
    tracker: StatusTracker,
    probes: Probes,
    /// Last status reported to the host, keyed by launch id.
    cached_statuses: HashMap<String, GameStatus>,
    owned_games_sent: bool,
}

impl Session {
    pub fn new(config: &Config, probes: Probes) -> Self {
        let mut client = LauncherClient::new(config.launcher_dir.clone());
        if let Some(user_id) = &config.user_id {
            client.initialize(user_id.clone());
        }
        let tracker = StatusTracker::new(probes.clone(), config.log_tail_lines);
        tracker.set_log_path(client.log_path());

        Self {
            client,
            registry: GameRegistry::new(),
            tracker,
            probes,
            cached_statuses: HashMap::new(),
            owned_games_sent: false,
        }
    }

    pub fn client(&self) -> &LauncherClient {
        &self.client
    }

    pub fn registry(&self) -> &GameRegistry {
        &self.registry
    }

    pub fn tracker(&self) -> &StatusTracker {
        &self.tracker
    }

    /// Binds the session to a user after authentication.
    pub fn initialize(&mut self, user_id: &str) {
        self.client.initialize(user_id);
        self.tracker.set_log_path(self.client.log_path());
    }

    /// Starts the background status poller.
    pub fn start_tracking(&self, interval: Duration) {
        self.tracker.start(interval);
    }

    pub fn stop_tracking(&self) {
        self.tracker.stop();
    }

    /// Re-detects the launcher install and points the tracker at its log.
    pub fn refresh_launcher(&mut self) {
        self.client.refresh();
        self.tracker.set_log_path(self.client.log_path());
    }

    /// Decodes the configuration file into the registry.
    ///
    /// Returns the number of new entries.
    pub fn parse_local_games(&mut self) -> usize {
        if !self.client.configurations_accessible() {
            return 0;
        }
        let Some(data) = self.client.read_configuration() else {
            return 0;
        };

        let env = LocalEnvironment {
            registry: self.probes.registry.as_ref(),
            embedded: self.probes.embedded.as_ref(),
        };
        let added = self
            .registry
            .merge(ConfigurationDecoder::new(&data).games(env));
        debug!(added, total = self.registry.len(), "parsed local games");
        added
    }

    /// Marks registry entries listed in the ownership file as owned.
    pub fn parse_ownership(&mut self) {
        if !self.client.ownership_accessible() {
            return;
        }
        let Some(data) = self.client.read_ownership() else {
            return;
        };
        let owned = OwnershipDecoder::new(&data).owned_ids();
        info!(records = owned.len(), "parsed ownership records");
        self.registry.apply_ownership(&owned);
    }

    /// Fetches the catalog's owned titles into the registry.
    ///
    /// Fails when the catalog cannot be fetched; the registry is untouched.
    pub async fn parse_catalog_games(
        &mut self,
        catalog: &dyn CatalogService,
    ) -> Result<usize, SessionError> {
        let titles = catalog.fetch_owned_titles().await?;
        Ok(self.registry.merge(club_descriptors(titles)))
    }

    /// True when the catalog reports a title the local configuration lacks.
    ///
    /// Without a readable configuration this cannot be decided and is false.
    pub fn is_ownership_glitched(&self, game: &GameDescriptor) -> bool {
        self.client.configurations_accessible() && game.launch_id().is_none()
    }

    /// Lists every owned title, local and catalog.
    ///
    /// Every entry is marked as considered, so later discoveries surface
    /// through [`refresh_statuses`](Self::refresh_statuses). A catalog that
    /// cannot be fetched leaves the locally owned titles.
    pub async fn get_owned_games(&mut self, catalog: &dyn CatalogService) -> Vec<GameDescriptor> {
        self.parse_local_games();
        self.parse_ownership();
        self.merge_catalog(catalog).await;

        self.owned_games_sent = true;
        for game in self.registry.iter_mut() {
            game.considered_for_enumeration = true;
        }

        self.registry
            .iter()
            .filter(|g| g.owned && !self.is_ownership_glitched(g))
            .cloned()
            .collect()
    }

    /// Lists installed and running titles, and seeds the reported statuses.
    pub fn get_local_games(&mut self) -> Vec<GameDescriptor> {
        self.parse_local_games();

        for game in self.registry.iter() {
            if let Some(launch_id) = game.launch_id() {
                self.cached_statuses.insert(launch_id.to_string(), game.status);
            }
        }
        let local = self.registry.local_games().into_iter().cloned().collect();
        self.sync_tracked_games();
        local
    }

    /// Pushes registry entries to the tracker and reports entries whose
    /// status differs from the last reported one.
    ///
    /// A title seen for the first time is only reported when it is installed
    /// or running.
    pub fn sync_tracked_games(&mut self) -> Vec<StatusChange> {
        let mut changes = Vec::new();
        for game in self.registry.iter() {
            self.tracker.update_game(game);
            let Some(launch_id) = game.launch_id() else {
                continue;
            };

            match self.cached_statuses.insert(launch_id.to_string(), game.status) {
                Some(cached) if cached != game.status => {
                    info!(name = %game.name, from = %cached, to = %game.status, "status changed");
                    changes.push(StatusChange::of(game));
                }
                None if game.status.is_local() => changes.push(StatusChange::of(game)),
                _ => {}
            }
        }
        changes
    }

    /// Folds the tracker's latest snapshot into the registry.
    pub fn refresh_statuses(&mut self) -> StatusRefresh {
        let mut refresh = StatusRefresh::default();
        if !self.client.was_user_logged_in() {
            return refresh;
        }
        let snapshot = self.tracker.snapshot();

        for game in self.registry.iter_mut() {
            if let Some(observed) = game.launch_id().and_then(|id| snapshot.get(id)) {
                let next = match observed {
                    GameStatus::Installed | GameStatus::Running => observed,
                    GameStatus::NotInstalled | GameStatus::Unknown => GameStatus::NotInstalled,
                };
                let changed = match next {
                    GameStatus::NotInstalled => game.status.is_local(),
                    _ => game.status != next,
                };
                if changed {
                    info!(name = %game.name, status = %next, "updating status");
                    game.status = next;
                    refresh.changes.push(StatusChange::of(game));
                }
            }

            if self.owned_games_sent && !game.considered_for_enumeration {
                game.considered_for_enumeration = true;
                refresh.new_games.push(game.clone());
            }
        }
        refresh
    }

    /// Re-decodes the launcher files when the ownership file changed.
    pub fn reparse_if_ownership_changed(&mut self) -> bool {
        if !self.client.ownership_changed() {
            return false;
        }
        info!("ownership file has been changed or created, reparsing");
        self.parse_local_games();
        self.parse_ownership();
        true
    }

    /// Filters newly discovered entries down to the ones to announce.
    ///
    /// Refreshes catalog and ownership first, then keeps entries that are
    /// owned and not ownership-glitched.
    pub async fn add_new_games(
        &mut self,
        catalog: &dyn CatalogService,
        games: Vec<GameDescriptor>,
    ) -> Vec<GameDescriptor> {
        self.merge_catalog(catalog).await;
        self.parse_ownership();

        games
            .iter()
            .filter_map(|g| g.primary_id().and_then(|id| self.registry.find(id)))
            .filter(|g| g.owned && !self.is_ownership_glitched(g))
            .cloned()
            .collect()
    }

    async fn merge_catalog(&mut self, catalog: &dyn CatalogService) {
        if let Err(e) = self.parse_catalog_games(catalog).await {
            warn!(error = %e, "catalog unavailable, continuing with local titles");
        }
    }
}
