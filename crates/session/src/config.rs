//! Session configuration.
//!
//! Reads TOML at `~/.config/ubitrack/agent.toml` (`%APPDATA%\ubitrack\agent.toml`
//! on Windows). Every key is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Session and polling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Launcher install directory; discovered from the registry when unset.
    pub launcher_dir: Option<PathBuf>,
    /// Account whose ownership file is read.
    pub user_id: Option<String>,
    /// JSON export of the account's owned titles, used as the catalog.
    pub catalog_file: Option<PathBuf>,
    /// Launcher log lines scanned per tick.
    pub log_tail_lines: usize,
    pub poll_interval_secs: u64,
    /// Ticks between launcher re-detections.
    pub launcher_refresh_ticks: u64,
    /// Ticks between tracked-game syncs and ownership checks.
    pub ownership_check_ticks: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            launcher_dir: None,
            user_id: None,
            catalog_file: None,
            log_tail_lines: 50,
            poll_interval_secs: 1,
            launcher_refresh_ticks: 5,
            ownership_check_ticks: 9,
        }
    }
}

impl Config {
    /// Loads configuration from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let config = Self::from_toml_str(&text)?;
                tracing::debug!(path = %path.display(), "loaded configuration");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no configuration file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, SessionError> {
        let config: Self = toml::from_str(text).map_err(|e| SessionError::Config(e.to_string()))?;
        Ok(config.clamped())
    }

    /// Raises zero intervals and cadences to one.
    fn clamped(mut self) -> Self {
        self.poll_interval_secs = self.poll_interval_secs.max(1);
        self.launcher_refresh_ticks = self.launcher_refresh_ticks.max(1);
        self.ownership_check_ticks = self.ownership_check_ticks.max(1);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Default configuration file location.
    pub fn default_path() -> PathBuf {
        config_base_dir().join("ubitrack").join("agent.toml")
    }
}

fn config_base_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata)
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home).join(".config")
    }
}
