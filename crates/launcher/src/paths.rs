use std::path::{Path, PathBuf};

use crate::LauncherError;

/// Provides access to the launcher's on-disk state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherPaths {
    base_dir: PathBuf,
}

impl LauncherPaths {
    /// Creates a new `LauncherPaths` with the auto-detected install directory.
    pub fn discover() -> Result<Self, LauncherError> {
        let base_dir = get_base_dir()?;
        Ok(Self { base_dir })
    }

    /// Creates a new `LauncherPaths` with a custom install directory.
    pub fn with_base(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Returns the launcher install directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Returns the launcher cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        self.base_dir.join("cache")
    }

    /// Returns the binary configuration file.
    pub fn configuration_path(&self) -> PathBuf {
        self.cache_dir().join("configuration").join("configurations")
    }

    /// Returns the binary ownership file for a user.
    pub fn ownership_path(&self, user_id: &str) -> PathBuf {
        self.cache_dir().join("ownership").join(user_id)
    }

    /// Returns the launcher's text log.
    pub fn log_path(&self) -> PathBuf {
        self.base_dir.join("logs").join("launcher_log.txt")
    }
}

// Platform-specific install directory detection.
#[cfg(target_os = "windows")]
fn get_base_dir() -> Result<PathBuf, LauncherError> {
    crate::paths_windows::get_base_dir()
}

#[cfg(not(target_os = "windows"))]
fn get_base_dir() -> Result<PathBuf, LauncherError> {
    Err(LauncherError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_with_base() {
        let paths = LauncherPaths::with_base("/opt/launcher");
        assert_eq!(paths.base_dir(), Path::new("/opt/launcher"));
        assert_eq!(paths.cache_dir(), PathBuf::from("/opt/launcher/cache"));
    }

    #[test]
    fn state_file_layout() {
        let paths = LauncherPaths::with_base("/launcher");
        assert_eq!(
            paths.configuration_path(),
            PathBuf::from("/launcher/cache/configuration/configurations")
        );
        assert_eq!(
            paths.ownership_path("0b8e-user"),
            PathBuf::from("/launcher/cache/ownership/0b8e-user")
        );
        assert_eq!(
            paths.log_path(),
            PathBuf::from("/launcher/logs/launcher_log.txt")
        );
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn discover_fails_off_windows() {
        assert!(matches!(
            LauncherPaths::discover(),
            Err(LauncherError::NotFound)
        ));
    }
}
