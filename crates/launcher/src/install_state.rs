//! Install-state marker probing for launcher titles.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use ubitrack_model::GameStatus;

/// Marker file the launcher keeps in every install directory.
pub const INSTALL_STATE_FILE: &str = "uplay_install.state";

/// First byte of a marker for a completed install.
const INSTALLED_MARKER: u8 = 0x0A;

/// Reads the install-state marker in `game_dir`.
///
/// A missing, empty, or unreadable marker (the launcher may be rewriting it)
/// reads as NotInstalled.
pub fn read_install_state(game_dir: &Path) -> GameStatus {
    let marker = game_dir.join(INSTALL_STATE_FILE);
    let mut first = [0u8; 1];

    let read = File::open(&marker).and_then(|mut f| f.read(&mut first));
    match read {
        Ok(1) if first[0] == INSTALLED_MARKER => GameStatus::Installed,
        Ok(_) => GameStatus::NotInstalled,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => GameStatus::NotInstalled,
        Err(e) => {
            tracing::warn!(path = %marker.display(), error = %e, "failed to read install state marker");
            GameStatus::NotInstalled
        }
    }
}

/// Classifies a title's install directory as Installed or NotInstalled.
///
/// Titles installed before the marker existed are recognized by their
/// executable, but only when the install came from a vendor uninstall key.
pub fn installed_status(
    path: &str,
    executable: Option<&str>,
    fallback_registry_path: Option<&str>,
) -> GameStatus {
    if path.is_empty() {
        return GameStatus::NotInstalled;
    }
    let dir = Path::new(path);
    if !dir.exists() {
        return GameStatus::NotInstalled;
    }

    let status = read_install_state(dir);
    if status == GameStatus::NotInstalled
        && let (Some(exe), Some(_)) = (
            executable.filter(|e| !e.is_empty()),
            fallback_registry_path.filter(|p| !p.is_empty()),
        )
        && dir.is_dir()
        && dir.join(exe).is_file()
    {
        return GameStatus::Installed;
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_with_installed_byte() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(INSTALL_STATE_FILE), [0x0A, 0x02, 0x08]).unwrap();
        assert_eq!(read_install_state(tmp.path()), GameStatus::Installed);
    }

    #[test]
    fn marker_with_other_byte() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(INSTALL_STATE_FILE), [0x08]).unwrap();
        assert_eq!(read_install_state(tmp.path()), GameStatus::NotInstalled);
    }

    #[test]
    fn empty_marker_is_not_installed() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(INSTALL_STATE_FILE), []).unwrap();
        assert_eq!(read_install_state(tmp.path()), GameStatus::NotInstalled);
    }

    #[test]
    fn missing_directory_is_not_installed() {
        let status = installed_status("/nonexistent/ubitrack/game", None, None);
        assert_eq!(status, GameStatus::NotInstalled);
        assert_eq!(installed_status("", None, None), GameStatus::NotInstalled);
    }

    #[test]
    fn legacy_executable_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("game.exe"), b"MZ").unwrap();
        let path = tmp.path().to_str().unwrap();

        let status = installed_status(path, Some("game.exe"), Some(r"SOFTWARE\Uninstall\Game"));
        assert_eq!(status, GameStatus::Installed);

        // Without the vendor key the executable alone does not count.
        assert_eq!(
            installed_status(path, Some("game.exe"), None),
            GameStatus::NotInstalled
        );
        assert_eq!(
            installed_status(path, Some("missing.exe"), Some(r"SOFTWARE\Uninstall\Game")),
            GameStatus::NotInstalled
        );
    }

    #[test]
    fn marker_beats_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(INSTALL_STATE_FILE), [0x0A]).unwrap();
        let path = tmp.path().to_str().unwrap();
        assert_eq!(installed_status(path, None, None), GameStatus::Installed);
    }
}
