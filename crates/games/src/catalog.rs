//! Remote catalog seam and ingestion of its owned-titles listing.

use std::future::Future;
use std::pin::Pin;

use tracing::info;
use ubitrack_model::{CatalogTitle, GameDescriptor, GameKind, GameStatus};

use crate::error::GamesError;

/// Source of the user's owned titles.
///
/// The host implements this on top of its authenticated HTTP session.
pub trait CatalogService: Send + Sync {
    /// Fetches every title the account owns.
    fn fetch_owned_titles(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<CatalogTitle>, GamesError>> + Send + '_>>;
}

/// A fixed owned-titles listing, e.g. loaded from an exported JSON file.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    titles: Vec<CatalogTitle>,
}

impl StaticCatalog {
    pub fn new(titles: Vec<CatalogTitle>) -> Self {
        Self { titles }
    }

    /// Parses a JSON array of catalog titles.
    pub fn from_json(json: &str) -> Result<Self, GamesError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }
}

impl CatalogService for StaticCatalog {
    fn fetch_owned_titles(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<CatalogTitle>, GamesError>> + Send + '_>> {
        let titles = self.titles.clone();
        Box::pin(async move { Ok(titles) })
    }
}

/// Converts catalog titles into descriptors ready for merging.
///
/// Only titles tagged for the desktop launcher are kept. They carry no launch
/// id yet; merging with local records supplies it.
pub fn club_descriptors(titles: impl IntoIterator<Item = CatalogTitle>) -> Vec<GameDescriptor> {
    titles
        .into_iter()
        .filter(CatalogTitle::is_native)
        .map(|title| {
            info!(space_id = %title.space_id, name = %title.display_name, "parsed game from catalog");
            GameDescriptor::new(title.display_name)
                .with_space_id(title.space_id)
                .with_kind(GameKind::Native)
                .with_status(GameStatus::Unknown)
                .with_owned(true)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::GameRegistry;

    const LISTING: &str = r#"[
        {"spaceId": "r6s", "title": "Rainbow Six Siege", "platform": "PC"},
        {"spaceId": "r6s-ps", "title": "Rainbow Six Siege", "platform": "PS4"},
        {"spaceId": "anno", "title": "Anno 1800", "platform": "PC"},
        {"spaceId": "web", "title": "Companion"}
    ]"#;

    #[test]
    fn keeps_only_native_titles() {
        let catalog = StaticCatalog::from_json(LISTING).unwrap();
        let games = club_descriptors(catalog.titles.clone());
        let ids: Vec<&str> = games.iter().filter_map(|g| g.space_id()).collect();
        assert_eq!(ids, vec!["r6s", "anno"]);
        assert!(games.iter().all(|g| g.owned && g.launch_id().is_none()));
        assert!(games.iter().all(|g| g.status == GameStatus::Unknown));
    }

    #[test]
    fn malformed_listing_is_json_error() {
        let err = StaticCatalog::from_json("{\"spaceId\": 1}").unwrap_err();
        assert!(matches!(err, GamesError::Json(_)));
    }

    #[tokio::test]
    async fn catalog_titles_merge_into_local_entries() {
        let mut registry = GameRegistry::new();
        registry.merge([GameDescriptor::new("Anno 1800")
            .with_launch_id("4242")
            .with_space_id("anno")
            .with_status(GameStatus::Installed)]);

        let catalog = StaticCatalog::from_json(LISTING).unwrap();
        let titles = catalog.fetch_owned_titles().await.unwrap();
        registry.merge(club_descriptors(titles));

        assert_eq!(registry.len(), 2);
        let anno = registry.find("4242").unwrap();
        assert!(anno.owned);
        assert_eq!(anno.status, GameStatus::Installed);
        assert!(registry.find("r6s").unwrap().launch_id().is_none());
    }
}
