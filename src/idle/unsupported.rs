//! Fallback for platforms without a supported idle-time registry.

use super::IdleRegistry;
use crate::error::IdleError;

/// Placeholder registry. Never opens successfully.
#[derive(Debug)]
pub struct UnsupportedRegistry {
    _private: (),
}

impl UnsupportedRegistry {
    /// Always fails with [`IdleError::Unavailable`].
    pub fn open() -> Result<Self, IdleError> {
        Err(IdleError::Unavailable(format!(
            "idle time is not supported on {}",
            std::env::consts::OS
        )))
    }
}

impl IdleRegistry for UnsupportedRegistry {
    fn read_idle_nanos(&self) -> Result<u64, IdleError> {
        Err(IdleError::Read("no idle time registry on this platform".to_string()))
    }

    fn close(&mut self) {}
}
