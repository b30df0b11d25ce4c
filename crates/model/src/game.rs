use std::fmt;

use serde::{Deserialize, Serialize};

/// Catalog platform tag for titles playable through the desktop launcher.
pub const NATIVE_PLATFORM: &str = "PC";

/// How a title is installed and launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameKind {
    /// Launcher title with a catalog id.
    #[default]
    Native,
    /// Older launcher title without a catalog id.
    LegacyNative,
    /// Installed through an embedded Steam reference.
    EmbeddedSteam,
    /// Installed through an embedded Origin reference.
    EmbeddedOrigin,
}

/// Install/run state of a title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameStatus {
    /// Not yet observed locally (remote-only entries).
    #[default]
    Unknown,
    NotInstalled,
    Installed,
    Running,
}

impl GameStatus {
    /// Returns true for Installed and Running.
    pub fn is_local(self) -> bool {
        matches!(self, GameStatus::Installed | GameStatus::Running)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::Unknown => write!(f, "unknown"),
            GameStatus::NotInstalled => write!(f, "not installed"),
            GameStatus::Installed => write!(f, "installed"),
            GameStatus::Running => write!(f, "running"),
        }
    }
}

/// Identity and metadata for one title.
///
/// `space_id` keys the remote catalog, `launch_id` keys the launcher's local
/// files. Empty strings are never stored; absent ids are `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub third_party_id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_registry_path: Option<String>,
    #[serde(default)]
    pub kind: GameKind,
    #[serde(default)]
    pub status: GameStatus,
    #[serde(default)]
    pub owned: bool,
    /// Set once the entry has been returned from an owned-games listing.
    #[serde(default)]
    pub considered_for_enumeration: bool,
}

impl GameDescriptor {
    /// Creates a descriptor with only a name; ids are set with the builders.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the catalog id. Empty ids are dropped.
    pub fn with_space_id(mut self, space_id: impl Into<String>) -> Self {
        self.space_id = non_empty(space_id.into());
        self
    }

    /// Sets the launcher id. Empty ids are dropped.
    pub fn with_launch_id(mut self, launch_id: impl Into<String>) -> Self {
        self.launch_id = non_empty(launch_id.into());
        self
    }

    pub fn with_kind(mut self, kind: GameKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_status(mut self, status: GameStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_owned(mut self, owned: bool) -> Self {
        self.owned = owned;
        self
    }

    /// Catalog id, treating empty as absent.
    pub fn space_id(&self) -> Option<&str> {
        self.space_id.as_deref().filter(|s| !s.is_empty())
    }

    /// Launcher id, treating empty as absent.
    pub fn launch_id(&self) -> Option<&str> {
        self.launch_id.as_deref().filter(|s| !s.is_empty())
    }

    /// Returns true if either id equals `game_id`.
    pub fn matches_id(&self, game_id: &str) -> bool {
        self.space_id() == Some(game_id) || self.launch_id() == Some(game_id)
    }

    /// The id a host should use to refer to this title: catalog id first.
    pub fn primary_id(&self) -> Option<&str> {
        self.space_id().or_else(|| self.launch_id())
    }
}

impl fmt::Display for GameDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (space_id={}, launch_id={})",
            self.name,
            self.space_id().unwrap_or("-"),
            self.launch_id().unwrap_or("-")
        )
    }
}

/// One entry of the remote catalog's owned-titles listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogTitle {
    pub space_id: String,
    #[serde(rename = "title")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl CatalogTitle {
    /// Returns true when the title is tagged for the desktop launcher.
    pub fn is_native(&self) -> bool {
        self.platform.as_deref() == Some(NATIVE_PLATFORM)
    }
}

/// Maps an empty string to `None`.
pub fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_drop_empty_ids() {
        let game = GameDescriptor::new("Far Cry")
            .with_space_id("")
            .with_launch_id("420");
        assert_eq!(game.space_id, None);
        assert_eq!(game.launch_id(), Some("420"));
    }

    #[test]
    fn empty_id_is_treated_as_absent() {
        let mut game = GameDescriptor::new("x");
        game.space_id = Some(String::new());
        assert_eq!(game.space_id(), None);
        assert!(!game.matches_id(""));
    }

    #[test]
    fn matches_either_id() {
        let game = GameDescriptor::new("Anno")
            .with_space_id("abc-def")
            .with_launch_id("1234");
        assert!(game.matches_id("abc-def"));
        assert!(game.matches_id("1234"));
        assert!(!game.matches_id("9999"));
        assert_eq!(game.primary_id(), Some("abc-def"));
    }

    #[test]
    fn status_is_local() {
        assert!(GameStatus::Installed.is_local());
        assert!(GameStatus::Running.is_local());
        assert!(!GameStatus::NotInstalled.is_local());
        assert!(!GameStatus::Unknown.is_local());
    }

    #[test]
    fn catalog_title_from_json() {
        let json = r#"{"spaceId":"5e2a","title":"The Crew","platform":"PC"}"#;
        let title: CatalogTitle = serde_json::from_str(json).unwrap();
        assert_eq!(title.space_id, "5e2a");
        assert_eq!(title.display_name, "The Crew");
        assert!(title.is_native());

        let json = r#"{"spaceId":"5e2b","title":"The Crew"}"#;
        let title: CatalogTitle = serde_json::from_str(json).unwrap();
        assert!(!title.is_native());
    }

    #[test]
    fn descriptor_defaults() {
        let game = GameDescriptor::new("x");
        assert_eq!(game.kind, GameKind::Native);
        assert_eq!(game.status, GameStatus::Unknown);
        assert!(!game.owned);
        assert!(!game.considered_for_enumeration);
    }
}
