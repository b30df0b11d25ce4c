//! Install/run status tracking for launcher titles.
//!
//! A supervised polling task classifies every tracked title once per tick from
//! its install-state marker, the tail of the launcher log, and the liveness of
//! processes the log reported. Each tick publishes a fresh
//! [`StatusSnapshot`](ubitrack_model::StatusSnapshot) over a watch channel.

pub mod error;
pub mod log_scan;
pub mod process;
pub mod tracker;

// Re-export primary types for convenience.
pub use error::StatusError;
pub use log_scan::{LogVerdict, read_tail, scan_for_start};
pub use process::{ProcessKind, ProcessProbe, ProcessWatcher, SystemProcesses, WatchedProcess};
pub use tracker::{Probes, StatusTracker};
