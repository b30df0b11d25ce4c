//! OS process liveness and the list of processes started by tracked titles.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};
use tracing::{debug, info};

use crate::error::StatusError;

/// Grace period a newly watched process has to show up in the process table.
const WATCH_GRACE: Duration = Duration::from_secs(30);

/// Answers whether an OS process is alive.
pub trait ProcessProbe: Send + Sync {
    fn is_alive(&self, pid: u32) -> bool;
}

/// [`ProcessProbe`] backed by the OS process table.
pub struct SystemProcesses {
    system: Mutex<System>,
}

impl SystemProcesses {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SystemProcesses {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe for SystemProcesses {
    fn is_alive(&self, pid: u32) -> bool {
        let pid = Pid::from_u32(pid);
        let Ok(mut system) = self.system.lock() else {
            return false;
        };
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        system
            .process(pid)
            .is_some_and(|p| !matches!(p.status(), ProcessStatus::Zombie | ProcessStatus::Dead))
    }
}

/// In-memory probe: a fixed set of live pids.
impl ProcessProbe for Mutex<HashSet<u32>> {
    fn is_alive(&self, pid: u32) -> bool {
        self.lock().is_ok_and(|alive| alive.contains(&pid))
    }
}

/// What started a watched process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessKind {
    Game,
    Launcher,
}

/// A process reported by the launcher log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedProcess {
    pub pid: u32,
    /// End of the grace period for the process to appear.
    pub deadline: Instant,
    pub kind: ProcessKind,
    /// Launch id of the owning title, for game processes.
    pub launch_id: Option<String>,
}

/// Processes currently believed to belong to tracked titles.
///
/// Dead entries are dropped lazily on the next [`sweep`](Self::sweep).
#[derive(Debug, Default)]
pub struct ProcessWatcher {
    watched: Vec<WatchedProcess>,
}

impl ProcessWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts watching `pid`.
    ///
    /// Fails with [`StatusError::ProcessLookup`] if the process is not alive.
    /// Watching the same pid for the same title twice keeps the first entry.
    pub fn watch(
        &mut self,
        pid: u32,
        kind: ProcessKind,
        launch_id: Option<&str>,
        probe: &dyn ProcessProbe,
    ) -> Result<&WatchedProcess, StatusError> {
        if !probe.is_alive(pid) {
            return Err(StatusError::ProcessLookup { pid });
        }

        let existing = self
            .watched
            .iter()
            .position(|p| p.pid == pid && p.launch_id.as_deref() == launch_id);
        let index = match existing {
            Some(index) => index,
            None => {
                info!(pid, ?kind, launch_id = launch_id.unwrap_or("-"), "watching process");
                self.watched.push(WatchedProcess {
                    pid,
                    deadline: Instant::now() + WATCH_GRACE,
                    kind,
                    launch_id: launch_id.map(str::to_string),
                });
                self.watched.len() - 1
            }
        };
        Ok(&self.watched[index])
    }

    /// Drops processes that are no longer running. Returns how many were dropped.
    pub fn sweep(&mut self, probe: &dyn ProcessProbe) -> usize {
        let before = self.watched.len();
        self.watched.retain(|p| {
            let alive = probe.is_alive(p.pid);
            if !alive {
                info!(pid = p.pid, launch_id = p.launch_id.as_deref().unwrap_or("-"), "removing exited process");
            }
            alive
        });
        before - self.watched.len()
    }

    /// Returns true if a live game process is watched for `launch_id`.
    pub fn is_game_alive(&mut self, launch_id: &str, probe: &dyn ProcessProbe) -> bool {
        let dropped = self.sweep(probe);
        if dropped > 0 {
            debug!(dropped, "swept watched processes");
        }
        self.watched
            .iter()
            .any(|p| p.kind == ProcessKind::Game && p.launch_id.as_deref() == Some(launch_id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &WatchedProcess> {
        self.watched.iter()
    }

    pub fn len(&self) -> usize {
        self.watched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watched.is_empty()
    }
}
