//! Errors reported by the idle-time reporter.

use thiserror::Error;

/// Errors that can occur while reading idle time.
///
/// Neither variant is fatal: callers treat both as "idle time unknown" and
/// assume the user is active.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdleError {
    #[error("Idle time source unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to read idle time: {0}")]
    Read(String),
}

impl IdleError {
    /// Returns true if the idle source does not exist on this system.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
