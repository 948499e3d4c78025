//! Forced server states read from the status file.
//!
//! The keywords are the ones HAProxy's agent-check understands as an
//! administrative or operational state; see
//! <https://cbonte.github.io/haproxy-dconv/2.0/configuration.html#5.2-agent-check>.

use std::fmt;
use std::io;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// State forced through the status file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverrideState {
    Down,
    Drain,
    Failed,
    Maint,
    Stopped,
    Ready,
    Up,
}

impl OverrideState {
    pub const ALL: [OverrideState; 7] = [
        Self::Down,
        Self::Drain,
        Self::Failed,
        Self::Maint,
        Self::Stopped,
        Self::Ready,
        Self::Up,
    ];

    /// Keyword as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Down => "down",
            Self::Drain => "drain",
            Self::Failed => "failed",
            Self::Maint => "maint",
            Self::Stopped => "stopped",
            Self::Ready => "ready",
            Self::Up => "up",
        }
    }
}

impl fmt::Display for OverrideState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status file content that is not one of the known keywords.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported instructions in status file: '{0}'")]
pub struct ParseOverrideError(pub String);

impl FromStr for OverrideState {
    type Err = ParseOverrideError;

    /// Exact, case-sensitive keyword match. Callers trim first.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ParseOverrideError(s.to_string()))
    }
}

/// Outcome of reading the status file.
#[derive(Debug)]
pub enum OverrideRead {
    /// A recognized keyword.
    State(OverrideState),
    /// The file was read but holds something else (already trimmed).
    Unrecognized(String),
    /// The file could not be read, most often because it vanished.
    Unreadable(io::Error),
}

/// Read and classify the status file.
pub async fn read_override(path: &Path) -> OverrideRead {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let content = String::from_utf8_lossy(&bytes);
            let content = content.trim();
            match content.parse() {
                Ok(state) => OverrideRead::State(state),
                Err(ParseOverrideError(content)) => OverrideRead::Unrecognized(content),
            }
        }
        Err(e) => OverrideRead::Unreadable(e),
    }
}

/// Whether the status file is present.
///
/// Only a definite "not found" counts as absent; any other stat failure is
/// treated as present.
pub async fn override_exists(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(_) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            debug!(
                path = %path.display(),
                error = %e,
                "Status file stat failed, assuming present"
            );
            true
        }
    }
}
