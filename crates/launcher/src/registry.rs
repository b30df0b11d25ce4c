//! Installs-registry lookups used to resolve a title's install directory.

use std::collections::HashMap;

/// Launcher root key under `HKEY_LOCAL_MACHINE`.
pub const LAUNCHER_KEY: &str = r"SOFTWARE\Ubisoft\Launcher";
/// Per-title install keys under `HKEY_LOCAL_MACHINE`, one subkey per launch id.
pub const INSTALLS_KEY: &str = r"SOFTWARE\Ubisoft\Launcher\Installs";

/// Read access to the registry values that locate installed titles.
pub trait InstallRegistry: Send + Sync {
    /// `InstallDir` of the launcher's installs entry for `launch_id`.
    fn install_dir(&self, launch_id: &str) -> Option<String>;

    /// `InstallLocation` of an uninstall key (path relative to `HKEY_LOCAL_MACHINE`).
    fn install_location(&self, subkey: &str) -> Option<String>;
}

/// The operating system registry. Answers nothing off Windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRegistry;

impl InstallRegistry for SystemRegistry {
    #[cfg(target_os = "windows")]
    fn install_dir(&self, launch_id: &str) -> Option<String> {
        crate::paths_windows::read_hklm_string(&format!(r"{INSTALLS_KEY}\{launch_id}"), "InstallDir")
            .map(|dir| normalize_path(&dir))
    }

    #[cfg(not(target_os = "windows"))]
    fn install_dir(&self, _launch_id: &str) -> Option<String> {
        None
    }

    #[cfg(target_os = "windows")]
    fn install_location(&self, subkey: &str) -> Option<String> {
        crate::paths_windows::read_hklm_string(subkey, "InstallLocation")
    }

    #[cfg(not(target_os = "windows"))]
    fn install_location(&self, _subkey: &str) -> Option<String> {
        None
    }
}

/// In-memory registry for hosts without one, and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    installs: HashMap<String, String>,
    locations: HashMap<String, String>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_install(mut self, launch_id: impl Into<String>, dir: impl Into<String>) -> Self {
        self.installs.insert(launch_id.into(), dir.into());
        self
    }

    pub fn with_location(mut self, subkey: impl Into<String>, dir: impl Into<String>) -> Self {
        self.locations.insert(subkey.into(), dir.into());
        self
    }
}

impl InstallRegistry for MemoryRegistry {
    fn install_dir(&self, launch_id: &str) -> Option<String> {
        self.installs.get(launch_id).cloned()
    }

    fn install_location(&self, subkey: &str) -> Option<String> {
        self.locations.get(subkey).cloned()
    }
}

/// Resolves a title's install directory.
///
/// The launcher's installs key wins; the uninstall key's `InstallLocation` is
/// the fallback for titles the launcher installed through a vendor installer.
pub fn resolve_local_path(
    registry: &dyn InstallRegistry,
    launch_id: Option<&str>,
    fallback_registry_path: Option<&str>,
) -> Option<String> {
    let from_installs = launch_id
        .and_then(|id| registry.install_dir(id))
        .filter(|p| !p.is_empty());
    if from_installs.is_some() {
        return from_installs;
    }

    fallback_registry_path
        .filter(|p| !p.is_empty())
        .and_then(|p| registry.install_location(p))
        .filter(|p| !p.is_empty())
}

/// Normalizes a Windows path the way the launcher compares them: backslash
/// separators, no trailing separator, lowercase.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = path.replace('/', "\\").to_lowercase();
    while normalized.len() > 3 && normalized.ends_with('\\') {
        normalized.pop();
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installs_key_wins() {
        let registry = MemoryRegistry::new()
            .with_install("77", r"c:\games\r6")
            .with_location(r"SOFTWARE\Uninstall\Game", r"d:\other");
        let path = resolve_local_path(&registry, Some("77"), Some(r"SOFTWARE\Uninstall\Game"));
        assert_eq!(path.as_deref(), Some(r"c:\games\r6"));
    }

    #[test]
    fn falls_back_to_uninstall_location() {
        let registry = MemoryRegistry::new().with_location(r"SOFTWARE\Uninstall\Game", r"d:\legacy");
        let path = resolve_local_path(&registry, Some("77"), Some(r"SOFTWARE\Uninstall\Game"));
        assert_eq!(path.as_deref(), Some(r"d:\legacy"));
    }

    #[test]
    fn empty_values_are_absent() {
        let registry = MemoryRegistry::new().with_install("77", "");
        assert_eq!(resolve_local_path(&registry, Some("77"), None), None);
        assert_eq!(resolve_local_path(&registry, None, Some("")), None);
    }

    #[test]
    fn normalize_path_variants() {
        assert_eq!(normalize_path("C:/Games/Far Cry/"), r"c:\games\far cry");
        assert_eq!(normalize_path(r"D:\"), r"d:\");
    }

    #[test]
    fn system_registry_is_silent_off_windows() {
        if cfg!(target_os = "windows") {
            return;
        }
        assert_eq!(SystemRegistry.install_dir("1"), None);
        assert_eq!(SystemRegistry.install_location("x"), None);
    }
}
