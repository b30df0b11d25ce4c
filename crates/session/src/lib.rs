//! Session facade: one launcher install, one user, one game registry.
//!
//! Ties the launcher decoders, the [`GameRegistry`](ubitrack_games::GameRegistry),
//! the remote catalog, and the [`StatusTracker`](ubitrack_status::StatusTracker)
//! together into the operations a host exposes: list owned games, list local
//! games, and report status changes.

pub mod config;
pub mod error;
pub mod session;

// Re-export primary types for convenience.
pub use config::Config;
pub use error::SessionError;
pub use session::{Session, StatusChange, StatusRefresh};
