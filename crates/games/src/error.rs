//! Error types for registry and catalog operations.

/// Errors produced while fetching or ingesting titles.
#[derive(Debug, thiserror::Error)]
pub enum GamesError {
    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
