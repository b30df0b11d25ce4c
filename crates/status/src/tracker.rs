//! Polling status tracker with snapshot publication.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use ubitrack_launcher::{
    EmbeddedStatusProbe, InstallRegistry, SteamRegistryProbe, SystemRegistry, installed_status,
    resolve_local_path,
};
use ubitrack_model::{GameDescriptor, GameKind, GameStatus, StatusSnapshot};

use crate::error::StatusError;
use crate::log_scan::{LogVerdict, read_tail, scan_for_start};
use crate::process::{ProcessKind, ProcessProbe, ProcessWatcher, SystemProcesses};

/// Host services the tracker probes.
#[derive(Clone)]
pub struct Probes {
    pub registry: Arc<dyn InstallRegistry>,
    pub embedded: Arc<dyn EmbeddedStatusProbe>,
    pub processes: Arc<dyn ProcessProbe>,
}

impl Probes {
    /// The OS registry, Steam's registry values, and the OS process table.
    pub fn system() -> Self {
        Self {
            registry: Arc::new(SystemRegistry),
            embedded: Arc::new(SteamRegistryProbe),
            processes: Arc::new(SystemProcesses::new()),
        }
    }
}

/// The fields of a descriptor the tracker needs.
#[derive(Debug, Clone)]
struct TrackedGame {
    launch_id: String,
    name: String,
    kind: GameKind,
    local_path: Option<String>,
    executable: Option<String>,
    fallback_registry_path: Option<String>,
}

/// Classifies tracked titles once per tick and publishes the result.
///
/// Readers take the latest [`StatusSnapshot`] from [`snapshot`](Self::snapshot)
/// or a [`subscribe`](Self::subscribe)d receiver; a snapshot is never modified
/// after it is published.
pub struct StatusTracker {
    inner: Arc<TrackerInner>,
    cancel: Mutex<Option<CancellationToken>>,
}

struct TrackerInner {
    probes: Probes,
    log_tail_lines: usize,
    games: Mutex<HashMap<String, TrackedGame>>,
    watcher: Mutex<ProcessWatcher>,
    log_path: Mutex<Option<PathBuf>>,
    tick: AtomicU64,
    tx: watch::Sender<Arc<StatusSnapshot>>,
}

impl StatusTracker {
    /// Creates a tracker reading the last `log_tail_lines` lines of the log.
    pub fn new(probes: Probes, log_tail_lines: usize) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(StatusSnapshot::default()));
        Self {
            inner: Arc::new(TrackerInner {
                probes,
                log_tail_lines,
                games: Mutex::new(HashMap::new()),
                watcher: Mutex::new(ProcessWatcher::new()),
                log_path: Mutex::new(None),
                tick: AtomicU64::new(0),
                tx,
            }),
            cancel: Mutex::new(None),
        }
    }

    /// Sets (or clears) the launcher log to scan.
    pub fn set_log_path(&self, path: Option<PathBuf>) {
        if let Ok(mut slot) = self.inner.log_path.lock() {
            *slot = path;
        }
    }

    /// Starts tracking a title, or updates it.
    ///
    /// Titles without a launch id cannot be tracked and are ignored. An
    /// already tracked title keeps its resolved path unless the descriptor
    /// carries a different one.
    pub fn update_game(&self, game: &GameDescriptor) {
        let Some(launch_id) = game.launch_id() else {
            return;
        };
        let Ok(mut games) = self.inner.games.lock() else {
            return;
        };

        if let Some(existing) = games.get(launch_id)
            && (game.local_path.is_none() || existing.local_path == game.local_path)
        {
            return;
        }

        debug!(launch_id, name = %game.name, "tracking game");
        games.insert(
            launch_id.to_string(),
            TrackedGame {
                launch_id: launch_id.to_string(),
                name: game.name.clone(),
                kind: game.kind,
                local_path: game.local_path.clone(),
                executable: game.executable.clone(),
                fallback_registry_path: game.fallback_registry_path.clone(),
            },
        );
    }

    /// Number of tracked titles.
    pub fn tracked_count(&self) -> usize {
        self.inner.games.lock().map(|g| g.len()).unwrap_or(0)
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<StatusSnapshot> {
        self.inner.tx.borrow().clone()
    }

    /// A receiver notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<StatusSnapshot>> {
        self.inner.tx.subscribe()
    }

    /// Runs one polling tick and publishes its snapshot.
    pub fn poll_once(&self) -> Arc<StatusSnapshot> {
        self.inner.poll_once()
    }

    /// Starts the polling task at `interval` (minimum 1 ms; ticks that
    /// overrun are delayed, not burst). Restarts it if already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, interval: Duration) {
        let Ok(mut slot) = self.cancel.lock() else {
            return;
        };
        if let Some(cancel) = slot.take() {
            cancel.cancel();
        }

        let interval = interval.max(Duration::from_millis(1));
        let cancel = CancellationToken::new();
        *slot = Some(cancel.clone());

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            polling_loop(inner, interval, cancel).await;
        });

        info!(interval_ms = interval.as_millis() as u64, "status tracker started");
    }

    /// Stops the polling task.
    pub fn stop(&self) {
        if let Ok(mut slot) = self.cancel.lock()
            && let Some(cancel) = slot.take()
        {
            cancel.cancel();
            info!("status tracker stopped");
        }
    }

    /// Returns `true` if the polling task is running.
    pub fn is_running(&self) -> bool {
        self.cancel.lock().is_ok_and(|slot| slot.is_some())
    }
}

impl Drop for StatusTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Main polling loop.
async fn polling_loop(inner: Arc<TrackerInner>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let inner = Arc::clone(&inner);
                if let Err(e) = tokio::task::spawn_blocking(move || inner.poll_once()).await {
                    warn!(error = %e, "status poll panicked");
                }
            }
        }
    }
}

impl TrackerInner {
    fn poll_once(&self) -> Arc<StatusSnapshot> {
        let tick = self.tick.fetch_add(1, Ordering::Relaxed) + 1;
        let previous = self.tx.borrow().clone();
        let lines = self.log_tail();
        let games = self.resolve_games();

        let mut snapshot = StatusSnapshot::new(tick);
        for game in &games {
            let status = self.evaluate(game, &previous, &lines);
            if previous.get(&game.launch_id) != Some(status) {
                debug!(launch_id = %game.launch_id, name = %game.name, %status, "status observed");
            }
            snapshot.insert(game.launch_id.clone(), status);
        }

        let snapshot = Arc::new(snapshot);
        self.tx.send_replace(Arc::clone(&snapshot));
        snapshot
    }

    fn log_tail(&self) -> Vec<String> {
        let path = self.log_path.lock().ok().and_then(|p| p.clone());
        let Some(path) = path else {
            return Vec::new();
        };
        read_tail(&path, self.log_tail_lines).unwrap_or_else(|e| {
            warn!(error = %e, "unable to read running games from launcher log");
            Vec::new()
        })
    }

    /// Fills in missing install paths, then copies the tracked set out of the lock.
    fn resolve_games(&self) -> Vec<TrackedGame> {
        let Ok(mut games) = self.games.lock() else {
            return Vec::new();
        };
        for game in games.values_mut() {
            if game.kind == GameKind::EmbeddedSteam || game.local_path.is_some() {
                continue;
            }
            game.local_path = resolve_local_path(
                self.probes.registry.as_ref(),
                Some(game.launch_id.as_str()),
                game.fallback_registry_path.as_deref(),
            );
        }
        games.values().cloned().collect()
    }

    fn evaluate(&self, game: &TrackedGame, previous: &StatusSnapshot, lines: &[String]) -> GameStatus {
        if game.kind == GameKind::EmbeddedSteam {
            return self
                .probes
                .embedded
                .probe_status(game.local_path.as_deref().unwrap_or_default());
        }

        let status = installed_status(
            game.local_path.as_deref().unwrap_or_default(),
            game.executable.as_deref(),
            game.fallback_registry_path.as_deref(),
        );
        if status != GameStatus::Installed {
            return status;
        }

        match self.is_running(game, previous, lines) {
            Ok(true) => GameStatus::Running,
            Ok(false) => status,
            Err(e) => {
                warn!(launch_id = %game.launch_id, error = %e, "failed to check if game is running");
                status
            }
        }
    }

    /// A title already running stays so while its process lives; otherwise
    /// the log decides.
    fn is_running(
        &self,
        game: &TrackedGame,
        previous: &StatusSnapshot,
        lines: &[String],
    ) -> Result<bool, StatusError> {
        let processes = self.probes.processes.as_ref();
        let mut watcher = self.watcher.lock().unwrap_or_else(PoisonError::into_inner);

        if previous.get(&game.launch_id) == Some(GameStatus::Running) {
            return Ok(watcher.is_game_alive(&game.launch_id, processes));
        }

        match scan_for_start(lines, &game.launch_id) {
            LogVerdict::NotRunning => Ok(false),
            LogVerdict::Started { pid } => {
                watcher.watch(pid, ProcessKind::Game, Some(game.launch_id.as_str()), processes)?;
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use ubitrack_launcher::{INSTALL_STATE_FILE, MemoryRegistry};

    const STARTED: &str =
        "[Info] Game with process id 4242 has been started with product id 77";

    struct Fixture {
        _dir: tempfile::TempDir,
        game_dir: String,
        log: PathBuf,
        alive: Arc<Mutex<HashSet<u32>>>,
        tracker: StatusTracker,
    }

    fn fixture(installed: bool) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let game_dir = dir.path().join("game");
        std::fs::create_dir_all(&game_dir).unwrap();
        if installed {
            std::fs::write(game_dir.join(INSTALL_STATE_FILE), [0x0A, 0x01]).unwrap();
        }
        let game_dir = game_dir.to_str().unwrap().to_string();
        let log = dir.path().join("launcher_log.txt");

        let alive = Arc::new(Mutex::new(HashSet::new()));
        let probes = Probes {
            registry: Arc::new(MemoryRegistry::new().with_install("77", game_dir.clone())),
            embedded: Arc::new(|_: &str| GameStatus::NotInstalled),
            processes: alive.clone(),
        };
        let tracker = StatusTracker::new(probes, 50);
        tracker.set_log_path(Some(log.clone()));
        tracker.update_game(&GameDescriptor::new("Rainbow Six").with_launch_id("77"));

        Fixture {
            _dir: dir,
            game_dir,
            log,
            alive,
            tracker,
        }
    }

    #[test]
    fn installed_without_log() {
        let fx = fixture(true);
        let snap = fx.tracker.poll_once();
        assert_eq!(snap.get("77"), Some(GameStatus::Installed));
        assert_eq!(snap.tick(), 1);
    }

    #[test]
    fn missing_marker_is_not_installed() {
        let fx = fixture(false);
        std::fs::write(&fx.log, STARTED).unwrap();
        fx.alive.lock().unwrap().insert(4242);
        assert_eq!(fx.tracker.poll_once().get("77"), Some(GameStatus::NotInstalled));
    }

    #[test]
    fn started_game_runs_until_its_process_exits() {
        let fx = fixture(true);
        std::fs::write(&fx.log, format!("[Info] launcher ready\n{STARTED}\n")).unwrap();
        fx.alive.lock().unwrap().insert(4242);

        let snap = fx.tracker.poll_once();
        assert_eq!(snap.get("77"), Some(GameStatus::Running));
        {
            let watcher = fx.tracker.inner.watcher.lock().unwrap();
            let pids: Vec<u32> = watcher.iter().map(|p| p.pid).collect();
            assert_eq!(pids, vec![4242]);
        }

        // Still running: the log is not consulted again.
        std::fs::write(&fx.log, "[Warn] disconnected\n").unwrap();
        assert_eq!(fx.tracker.poll_once().get("77"), Some(GameStatus::Running));

        fx.alive.lock().unwrap().remove(&4242);
        assert_eq!(fx.tracker.poll_once().get("77"), Some(GameStatus::Installed));
    }

    #[test]
    fn start_line_for_dead_process_is_installed() {
        let fx = fixture(true);
        std::fs::write(&fx.log, STARTED).unwrap();
        assert_eq!(fx.tracker.poll_once().get("77"), Some(GameStatus::Installed));
    }

    #[test]
    fn disconnect_after_start_is_installed() {
        let fx = fixture(true);
        std::fs::write(&fx.log, format!("{STARTED}\n[Warn] disconnected\n")).unwrap();
        fx.alive.lock().unwrap().insert(4242);
        assert_eq!(fx.tracker.poll_once().get("77"), Some(GameStatus::Installed));
    }

    #[test]
    fn path_resolved_lazily_and_kept() {
        let fx = fixture(true);
        fx.tracker.poll_once();
        let games = fx.tracker.inner.games.lock().unwrap();
        assert_eq!(games["77"].local_path.as_deref(), Some(fx.game_dir.as_str()));
    }

    #[test]
    fn steam_titles_use_embedded_probe() {
        let probes = Probes {
            registry: Arc::new(MemoryRegistry::new()),
            embedded: Arc::new(|path: &str| {
                if path.ends_with("Installed") {
                    GameStatus::Running
                } else {
                    GameStatus::NotInstalled
                }
            }),
            processes: Arc::new(Mutex::new(HashSet::new())),
        };
        let tracker = StatusTracker::new(probes, 50);
        let mut game = GameDescriptor::new("Steam Game")
            .with_launch_id("635")
            .with_kind(GameKind::EmbeddedSteam);
        game.local_path = Some(r"HKEY_CURRENT_USER\Software\Valve\Steam\Apps\1\Installed".into());
        tracker.update_game(&game);

        assert_eq!(tracker.poll_once().get("635"), Some(GameStatus::Running));
    }

    #[test]
    fn untracked_ids_are_ignored() {
        let fx = fixture(true);
        fx.tracker.update_game(&GameDescriptor::new("Club only").with_space_id("s1"));
        assert_eq!(fx.tracker.tracked_count(), 1);
    }

    #[test]
    fn update_keeps_resolved_path() {
        let fx = fixture(true);
        fx.tracker.poll_once();
        fx.tracker
            .update_game(&GameDescriptor::new("Rainbow Six").with_launch_id("77"));
        let games = fx.tracker.inner.games.lock().unwrap();
        assert!(games["77"].local_path.is_some());
    }

    #[tokio::test]
    async fn polling_task_publishes_snapshots() {
        let fx = fixture(true);
        let mut rx = fx.tracker.subscribe();

        fx.tracker.start(Duration::from_millis(10));
        assert!(fx.tracker.is_running());

        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rx.borrow().get("77"), Some(GameStatus::Installed));

        fx.tracker.stop();
        assert!(!fx.tracker.is_running());
        assert!(fx.tracker.snapshot().tick() >= 1);
    }
}
