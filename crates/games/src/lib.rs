//! Game registry: the ordered, deduplicated set of titles known to a session.
//!
//! Titles arrive from three places: the launcher's configuration file (keyed
//! by launch id), the ownership file (a list of launch ids), and the remote
//! catalog (keyed by space id). [`GameRegistry::merge`] folds them into one
//! entry per title.

pub mod catalog;
pub mod error;
pub mod registry;

// Re-export primary types for convenience.
pub use catalog::{CatalogService, StaticCatalog, club_descriptors};
pub use error::GamesError;
pub use registry::GameRegistry;
