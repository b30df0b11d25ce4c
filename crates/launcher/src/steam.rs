//! Status probing for titles proxied through an embedded Steam install.

use ubitrack_model::GameStatus;

/// Reports the install/run state of a title owned by an embedded platform.
pub trait EmbeddedStatusProbe: Send + Sync {
    /// Probes the status published at `path` (a platform-specific reference).
    fn probe_status(&self, path: &str) -> GameStatus;
}

impl<F> EmbeddedStatusProbe for F
where
    F: Fn(&str) -> GameStatus + Send + Sync,
{
    fn probe_status(&self, path: &str) -> GameStatus {
        self(path)
    }
}

/// Registry root of a register reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hive {
    LocalMachine,
    CurrentUser,
}

/// A parsed register reference: `HIVE\sub\key\Value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterPath {
    pub hive: Hive,
    pub subkey: String,
    pub value: String,
}

impl RegisterPath {
    pub fn parse(path: &str) -> Option<Self> {
        let (hive, rest) = path.split_once('\\')?;
        let hive = match hive.to_uppercase().as_str() {
            "HKEY_LOCAL_MACHINE" | "HKLM" => Hive::LocalMachine,
            "HKEY_CURRENT_USER" | "HKCU" => Hive::CurrentUser,
            _ => return None,
        };
        let (subkey, value) = rest.rsplit_once('\\')?;
        if subkey.is_empty() || value.is_empty() {
            return None;
        }
        Some(Self {
            hive,
            subkey: subkey.to_string(),
            value: value.to_string(),
        })
    }
}

/// Probes Steam's per-app registry values.
///
/// A non-zero `Running` value under the app key means Running; a non-zero (or
/// non-empty) value named by the reference means Installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SteamRegistryProbe;

impl EmbeddedStatusProbe for SteamRegistryProbe {
    fn probe_status(&self, path: &str) -> GameStatus {
        let Some(register) = RegisterPath::parse(path) else {
            tracing::debug!(path, "unrecognized steam status register");
            return GameStatus::NotInstalled;
        };
        probe_register(&register)
    }
}

#[cfg(target_os = "windows")]
fn probe_register(register: &RegisterPath) -> GameStatus {
    use crate::paths_windows::{read_dword, read_string};

    if read_dword(register.hive, &register.subkey, "Running").unwrap_or(0) != 0 {
        return GameStatus::Running;
    }

    let installed = read_dword(register.hive, &register.subkey, &register.value)
        .map(|v| v != 0)
        .or_else(|| {
            read_string(register.hive, &register.subkey, &register.value).map(|s| !s.is_empty())
        })
        .unwrap_or(false);

    if installed {
        GameStatus::Installed
    } else {
        GameStatus::NotInstalled
    }
}

#[cfg(not(target_os = "windows"))]
fn probe_register(_register: &RegisterPath) -> GameStatus {
    GameStatus::NotInstalled
}
