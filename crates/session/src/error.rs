//! Error types for session operations.

use ubitrack_games::GamesError;

/// Errors produced by the session facade.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Games(#[from] GamesError),
}
