pub mod client;
pub mod configuration;
pub mod cursor;
pub mod install_state;
pub mod manifest;
pub mod ownership;
pub mod paths;
#[cfg(target_os = "windows")]
mod paths_windows;
pub mod registry;
pub mod steam;

// Re-export primary types.
pub use client::LauncherClient;
pub use configuration::{ConfigurationDecoder, ConfigurationRecord, LocalEnvironment, RecordWalk};
pub use cursor::{RecordCursor, Stop, normalize};
pub use install_state::{INSTALL_STATE_FILE, installed_status};
pub use ownership::OwnershipDecoder;
pub use paths::LauncherPaths;
pub use registry::{InstallRegistry, MemoryRegistry, SystemRegistry, resolve_local_path};
pub use steam::{EmbeddedStatusProbe, SteamRegistryProbe};

/// Errors for launcher operations.
#[derive(Debug, thiserror::Error)]
pub enum LauncherError {
    #[error("launcher installation not found")]
    NotFound,

    #[error("malformed record at offset {offset}: {reason}")]
    MalformedRecord { offset: usize, reason: String },

    #[error("payload error: {0}")]
    Payload(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl LauncherError {
    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        LauncherError::MalformedRecord {
            offset,
            reason: reason.into(),
        }
    }

    /// Shifts a record-relative offset to a file offset.
    pub(crate) fn rebase(self, base: usize) -> Self {
        match self {
            LauncherError::MalformedRecord { offset, reason } => LauncherError::MalformedRecord {
                offset: base + offset,
                reason,
            },
            other => other,
        }
    }
}
