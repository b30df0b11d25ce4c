//! Launcher log tail reading and game-start detection.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::StatusError;

/// Logged when the launcher loses its session; nothing older counts.
pub const DISCONNECT_MARKER: &str = "disconnected";
/// Logged when the launcher starts a title.
pub const START_MARKER: &str = "has been started with product id";

static PID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Game with process id ([-+]?[0-9]+) has been started")
        .expect("pid pattern is a valid regex")
});

/// Outcome of scanning the log tail for one title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogVerdict {
    NotRunning,
    /// The launcher reported starting the title as process `pid`.
    Started { pid: u32 },
}

/// Reads the last `lines` lines of the launcher log.
///
/// A missing log is normal (the launcher never ran) and yields no lines.
pub fn read_tail(path: &Path, lines: usize) -> Result<Vec<String>, StatusError> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StatusError::LogRead(format!("{}: {e}", path.display()))),
    };

    let text = String::from_utf8_lossy(&data);
    let all: Vec<&str> = text.lines().collect();
    let skip = all.len().saturating_sub(lines);
    Ok(all[skip..].iter().map(|l| l.to_string()).collect())
}

/// Scans `lines` from newest to oldest for the start of `launch_id`.
///
/// A disconnect line seen first means not running. The first start line that
/// names `launch_id` decides: running if it carries a process id, otherwise
/// not running.
pub fn scan_for_start<S: AsRef<str>>(lines: &[S], launch_id: &str) -> LogVerdict {
    for line in lines.iter().rev() {
        let line: &str = line.as_ref();
        if line.contains(DISCONNECT_MARKER) {
            return LogVerdict::NotRunning;
        }
        if line.contains(START_MARKER) && mentions_id(line, launch_id) {
            return match extract_pid(line) {
                Some(pid) => LogVerdict::Started { pid },
                None => {
                    tracing::debug!(launch_id, line, "start line without a usable process id");
                    LogVerdict::NotRunning
                }
            };
        }
    }
    LogVerdict::NotRunning
}

fn extract_pid(line: &str) -> Option<u32> {
    let captures = PID_PATTERN.captures(line)?;
    let pid: i64 = captures.get(1)?.as_str().parse().ok()?;
    u32::try_from(pid).ok().filter(|&pid| pid != 0)
}

/// Returns true if `id` occurs in `line` as a whole number.
fn mentions_id(line: &str, id: &str) -> bool {
    if id.is_empty() {
        return false;
    }
    line.match_indices(id).any(|(start, _)| {
        let before = line[..start].chars().next_back();
        let after = line[start + id.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_digit()) && !after.is_some_and(|c| c.is_ascii_digit())
    })
}
