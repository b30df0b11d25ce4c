//! Schema for the structured-text payload embedded in configuration records.
//!
//! Every key is optional. Fields that are present but shaped unexpectedly are
//! read as absent rather than failing the whole payload, so one odd block in a
//! launcher manifest never hides the rest of the title's metadata.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;

use crate::LauncherError;

/// Substring that marks a payload as a launchable title.
pub const LAUNCHABLE_MARKER: &str = "start_game";

/// Placeholder names the launcher uses before localization.
const PLACEHOLDER_NAMES: [&str; 5] = ["gamename", "l1", "", "ubisoft game", "name"];

/// Top-level payload document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default, deserialize_with = "lenient")]
    pub root: Option<Root>,
    #[serde(default, deserialize_with = "lenient")]
    pub localizations: Option<Localizations>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Root {
    #[serde(default, deserialize_with = "scalar")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub space_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub third_party_platform: Option<ThirdPartyPlatform>,
    #[serde(default, deserialize_with = "lenient")]
    pub start_game: Option<StartGame>,
    #[serde(default, deserialize_with = "lenient")]
    pub installer: Option<Installer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThirdPartyPlatform {
    #[serde(default, deserialize_with = "scalar")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub platform_installation_status: Option<RegisterRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartGame {
    #[serde(default, deserialize_with = "lenient")]
    pub steam: Option<SteamStart>,
    #[serde(default, deserialize_with = "lenient")]
    pub online: Option<OnlineStart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SteamStart {
    #[serde(default, deserialize_with = "scalar")]
    pub game_installation_status_register: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub steam_app_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OnlineStart {
    #[serde(default)]
    pub executables: Vec<Executable>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Executable {
    #[serde(default, deserialize_with = "lenient")]
    pub working_directory: Option<RegisterRef>,
    #[serde(default, deserialize_with = "lenient")]
    pub path: Option<RelativePath>,
}

/// A registry value reference such as `HKEY_LOCAL_MACHINE\...\InstallLocation`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRef {
    #[serde(default, deserialize_with = "scalar")]
    pub register: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelativePath {
    #[serde(default, deserialize_with = "scalar")]
    pub relative: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Installer {
    #[serde(default, deserialize_with = "scalar")]
    pub game_identifier: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Localizations {
    #[serde(default, deserialize_with = "lenient")]
    pub default: Option<LocalizedStrings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalizedStrings {
    #[serde(rename = "GAMENAME", default, deserialize_with = "scalar")]
    pub game_name: Option<String>,
}

/// Embedded platform a title is proxied through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddedPlatform {
    Steam,
    Origin,
    /// A platform block this crate does not recognize.
    Other,
}

impl Manifest {
    /// Parses a payload document.
    pub fn parse(text: &str) -> Result<Self, LauncherError> {
        serde_yaml::from_str(text).map_err(|e| LauncherError::Payload(e.to_string()))
    }

    fn root(&self) -> Option<&Root> {
        self.root.as_ref()
    }

    pub fn space_id(&self) -> Option<&str> {
        self.root()?.space_id.as_deref().filter(|s| !s.is_empty())
    }

    /// Embedded platform named by the `third_party_platform` block.
    pub fn embedded_platform(&self) -> Option<EmbeddedPlatform> {
        let platform = self.root()?.third_party_platform.as_ref()?;
        let name = platform.name.as_deref().unwrap_or_default();
        Some(match name.to_lowercase().as_str() {
            "steam" => EmbeddedPlatform::Steam,
            "origin" => EmbeddedPlatform::Origin,
            _ => EmbeddedPlatform::Other,
        })
    }

    fn steam_start(&self) -> Option<&SteamStart> {
        self.root()?.start_game.as_ref()?.steam.as_ref()
    }

    /// Registry value Steam uses to publish the title's install state.
    pub fn steam_status_register(&self) -> Option<&str> {
        self.steam_start()?.game_installation_status_register.as_deref()
    }

    pub fn steam_app_id(&self) -> Option<&str> {
        self.steam_start()?.steam_app_id.as_deref()
    }

    pub fn origin_status_register(&self) -> Option<&str> {
        self.root()?
            .third_party_platform
            .as_ref()?
            .platform_installation_status
            .as_ref()?
            .register
            .as_deref()
    }

    fn first_executable(&self) -> Option<&Executable> {
        self.root()?
            .start_game
            .as_ref()?
            .online
            .as_ref()?
            .executables
            .first()
    }

    /// Working-directory registry reference of the first online executable.
    pub fn working_directory_register(&self) -> Option<&str> {
        self.first_executable()?
            .working_directory
            .as_ref()?
            .register
            .as_deref()
    }

    /// Executable path relative to the install directory.
    pub fn relative_executable(&self) -> Option<&str> {
        self.first_executable()?.path.as_ref()?.relative.as_deref()
    }

    /// Display name after placeholder fallbacks.
    ///
    /// `root.name` first; if that is a placeholder, the installer's game
    /// identifier; if that is still a placeholder, the default localization's
    /// `GAMENAME`.
    pub fn display_name(&self) -> String {
        let root = self.root();
        let mut name = root
            .and_then(|r| r.name.clone())
            .unwrap_or_default();

        if is_placeholder_name(&name)
            && let Some(id) = root
                .and_then(|r| r.installer.as_ref())
                .and_then(|i| i.game_identifier.clone())
        {
            name = id;
        }

        if is_placeholder_name(&name)
            && let Some(localized) = self
                .localizations
                .as_ref()
                .and_then(|l| l.default.as_ref())
                .and_then(|d| d.game_name.clone())
        {
            name = localized;
        }

        name
    }
}

/// Returns true for names the launcher uses as untranslated placeholders.
pub fn is_placeholder_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    PLACEHOLDER_NAMES.contains(&lower.as_str())
}

/// Reads a scalar of any type as a string; non-scalars read as absent.
fn scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_yaml::Value;

    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Reads a nested block, treating a mismatched shape as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    Ok(serde_yaml::from_value(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NATIVE: &str = r#"
root:
  name: Far Cry 5
  space_id: 4a5e5c2d-7f3b-4c4e-9a2b-0f1c2d3e4f50
  installer:
    game_identifier: FC5
  start_game:
    online:
      executables:
        - working_directory:
            register: HKEY_LOCAL_MACHINE\SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall\Uplay Install 5595\InstallLocation
          path:
            relative: bin\FarCry5.exe
"#;

    #[test]
    fn parse_native_manifest() {
        let m = Manifest::parse(NATIVE).unwrap();
        assert_eq!(m.space_id(), Some("4a5e5c2d-7f3b-4c4e-9a2b-0f1c2d3e4f50"));
        assert_eq!(m.display_name(), "Far Cry 5");
        assert_eq!(m.embedded_platform(), None);
        assert_eq!(m.relative_executable(), Some(r"bin\FarCry5.exe"));
        assert!(m.working_directory_register().unwrap().contains("Uplay Install 5595"));
    }

    #[test]
    fn parse_steam_manifest() {
        let text = r#"
root:
  name: Rainbow Six Siege
  third_party_platform:
    name: Steam
  start_game:
    steam:
      steam_app_id: 359550
      game_installation_status_register: HKEY_CURRENT_USER\Software\Valve\Steam\Apps\359550\Installed
"#;
        let m = Manifest::parse(text).unwrap();
        assert_eq!(m.embedded_platform(), Some(EmbeddedPlatform::Steam));
        assert_eq!(m.steam_app_id(), Some("359550"));
        assert!(m.steam_status_register().unwrap().ends_with(r"359550\Installed"));
        assert_eq!(m.space_id(), None);
    }

    #[test]
    fn parse_origin_manifest() {
        let text = r#"
root:
  name: Some Game
  third_party_platform:
    name: origin
    platform_installation_status:
      register: HKEY_LOCAL_MACHINE\SOFTWARE\Origin Games\123\Install Dir
  start_game: {}
"#;
        let m = Manifest::parse(text).unwrap();
        assert_eq!(m.embedded_platform(), Some(EmbeddedPlatform::Origin));
        assert!(m.origin_status_register().unwrap().ends_with("Install Dir"));
    }

    #[test]
    fn placeholder_falls_back_to_game_identifier() {
        let text = "root:\n  name: GameName\n  installer:\n    game_identifier: R6\n  start_game: {}\n";
        let m = Manifest::parse(text).unwrap();
        assert_eq!(m.display_name(), "R6");
    }

    #[test]
    fn placeholder_falls_back_to_localization() {
        let text = r#"
root:
  name: l1
  start_game: {}
localizations:
  default:
    l1: Anno 1800
    GAMENAME: Anno 1800
"#;
        let m = Manifest::parse(text).unwrap();
        assert_eq!(m.display_name(), "Anno 1800");
    }

    #[test]
    fn placeholder_identifier_still_tries_localization() {
        let text = r#"
root:
  name: NAME
  installer:
    game_identifier: Ubisoft Game
  start_game: {}
localizations:
  default:
    GAMENAME: The Division
"#;
        let m = Manifest::parse(text).unwrap();
        assert_eq!(m.display_name(), "The Division");
    }

    #[test]
    fn missing_name_without_fallbacks_is_empty() {
        let m = Manifest::parse("root:\n  start_game: {}\n").unwrap();
        assert_eq!(m.display_name(), "");
    }

    #[test]
    fn odd_shapes_read_as_absent() {
        let text = r#"
root:
  name: 1234
  installer: not-a-block
  start_game:
    online:
      executables:
        - working_directory: just-a-string
          path:
            relative: game.exe
"#;
        let m = Manifest::parse(text).unwrap();
        assert_eq!(m.display_name(), "1234");
        assert_eq!(m.working_directory_register(), None);
        assert_eq!(m.relative_executable(), Some("game.exe"));
    }

    #[test]
    fn invalid_document_is_payload_error() {
        let err = Manifest::parse("root: [unclosed").unwrap_err();
        assert!(matches!(err, LauncherError::Payload(_)));
    }

    #[test]
    fn placeholder_names_are_case_insensitive() {
        assert!(is_placeholder_name("GAMENAME"));
        assert!(is_placeholder_name("Ubisoft Game"));
        assert!(is_placeholder_name(""));
        assert!(!is_placeholder_name("Watch Dogs"));
    }
}
