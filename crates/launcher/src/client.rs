//! Locates the launcher install and reads its state files.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::paths::LauncherPaths;

/// Handle on the local launcher install.
///
/// Paths are recomputed on [`refresh`](Self::refresh), so an install that
/// appears or disappears while the host runs is picked up.
#[derive(Debug, Default)]
pub struct LauncherClient {
    override_dir: Option<PathBuf>,
    paths: Option<LauncherPaths>,
    user_id: Option<String>,
    installed: bool,
    ownership_mtime: Option<SystemTime>,
}

impl LauncherClient {
    /// Creates a client. `override_dir` replaces registry discovery.
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        let mut client = Self {
            override_dir,
            ..Self::default()
        };
        client.refresh();
        client
    }

    /// Binds the client to a user and starts tracking their ownership file.
    pub fn initialize(&mut self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        info!(user_id = %user_id, "launcher client bound to user");
        self.user_id = Some(user_id);
        self.refresh();
        self.ownership_changed();
    }

    /// Re-detects the launcher install.
    pub fn refresh(&mut self) {
        let paths = match &self.override_dir {
            Some(dir) => Some(LauncherPaths::with_base(dir)),
            None => LauncherPaths::discover().ok(),
        }
        .filter(|p| p.base_dir().exists());

        match (&paths, self.installed) {
            (Some(p), false) => {
                info!(path = %p.base_dir().display(), "launcher installed");
                self.installed = true;
            }
            (None, true) => {
                info!("launcher uninstalled");
                self.installed = false;
            }
            _ => {}
        }
        self.paths = paths;
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn configuration_path(&self) -> Option<PathBuf> {
        self.paths.as_ref().map(LauncherPaths::configuration_path)
    }

    pub fn ownership_path(&self) -> Option<PathBuf> {
        let user_id = self.user_id.as_deref()?;
        self.paths.as_ref().map(|p| p.ownership_path(user_id))
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.paths.as_ref().map(LauncherPaths::log_path)
    }

    pub fn configurations_accessible(&self) -> bool {
        self.configuration_path().is_some_and(|p| readable(&p))
    }

    pub fn ownership_accessible(&self) -> bool {
        self.ownership_path().is_some_and(|p| readable(&p))
    }

    /// Reads the binary configuration file, or `None` if it is unavailable.
    pub fn read_configuration(&self) -> Option<Vec<u8>> {
        read_file(&self.configuration_path()?)
    }

    /// Reads the user's binary ownership file, or `None` if it is unavailable.
    pub fn read_ownership(&self) -> Option<Vec<u8>> {
        read_file(&self.ownership_path()?)
    }

    /// True once the user has logged in to the launcher on this machine.
    pub fn was_user_logged_in(&self) -> bool {
        self.ownership_path().is_some_and(|p| p.exists())
    }

    /// Returns true if the ownership file changed since the last call.
    ///
    /// A missing file re-detects the install and reports no change.
    pub fn ownership_changed(&mut self) -> bool {
        let Some(path) = self.ownership_path() else {
            warn!("ownership file path undecided, launcher may not be installed");
            self.refresh();
            return false;
        };

        match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(mtime) if self.ownership_mtime != Some(mtime) => {
                debug!(path = %path.display(), "ownership file changed");
                self.ownership_mtime = Some(mtime);
                true
            }
            Ok(_) => false,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "ownership file not present, user never logged in");
                self.refresh();
                false
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to stat ownership file");
                self.refresh();
                false
            }
        }
    }
}

fn readable(path: &Path) -> bool {
    File::open(path).is_ok()
}

fn read_file(path: &Path) -> Option<Vec<u8>> {
    match fs::read(path) {
        Ok(data) => Some(data),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read launcher file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launcher_tree() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("cache/configuration")).unwrap();
        fs::create_dir_all(tmp.path().join("cache/ownership")).unwrap();
        fs::write(tmp.path().join("cache/configuration/configurations"), [0x0A]).unwrap();
        tmp
    }

    #[test]
    fn override_dir_is_installed() {
        let tmp = launcher_tree();
        let client = LauncherClient::new(Some(tmp.path().to_path_buf()));
        assert!(client.is_installed());
        assert!(client.configurations_accessible());
        assert_eq!(client.read_configuration(), Some(vec![0x0A]));
        assert_eq!(
            client.log_path(),
            Some(tmp.path().join("logs").join("launcher_log.txt"))
        );
    }

    #[test]
    fn missing_dir_is_not_installed() {
        let client = LauncherClient::new(Some(PathBuf::from("/nonexistent/ubitrack/launcher")));
        assert!(!client.is_installed());
        assert!(!client.configurations_accessible());
        assert_eq!(client.read_configuration(), None);
        assert_eq!(client.log_path(), None);
    }

    #[test]
    fn ownership_needs_a_user() {
        let tmp = launcher_tree();
        let mut client = LauncherClient::new(Some(tmp.path().to_path_buf()));
        assert_eq!(client.ownership_path(), None);
        assert!(!client.was_user_logged_in());

        client.initialize("user-1");
        assert_eq!(
            client.ownership_path(),
            Some(tmp.path().join("cache").join("ownership").join("user-1"))
        );
        assert!(!client.was_user_logged_in());
        assert!(!client.ownership_accessible());
    }

    #[test]
    fn ownership_change_detection() {
        let tmp = launcher_tree();
        let mut client = LauncherClient::new(Some(tmp.path().to_path_buf()));
        client.initialize("user-1");
        assert!(!client.ownership_changed());

        let path = tmp.path().join("cache/ownership/user-1");
        fs::write(&path, [0u8; 4]).unwrap();
        assert!(client.was_user_logged_in());
        assert!(client.ownership_changed());
        assert!(!client.ownership_changed());

        let later = SystemTime::now() + std::time::Duration::from_secs(60);
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(later)
            .unwrap();
        assert!(client.ownership_changed());
        assert_eq!(client.read_ownership(), Some(vec![0u8; 4]));
    }
}
