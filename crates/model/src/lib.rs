//! Shared data model for ubitrack.
//!
//! Every other crate speaks in these types: the launcher decoders produce
//! [`GameDescriptor`]s, the registry merges them, and the status tracker
//! publishes [`StatusSnapshot`]s keyed by launch id.

pub mod game;
pub mod snapshot;

// Re-export primary types for convenience.
pub use game::{CatalogTitle, GameDescriptor, GameKind, GameStatus, NATIVE_PLATFORM, non_empty};
pub use snapshot::StatusSnapshot;
