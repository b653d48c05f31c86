//! Configuration loading and defaults for idlemgt.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Main configuration for idlemgt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds without input before the user counts as idle (default: 300).
    /// Zero disables idle gating.
    pub idle_threshold_seconds: u64,

    /// Seconds between idle time reads (default: 10).
    pub poll_interval_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            idle_threshold_seconds: 300,
            poll_interval_seconds: 10,
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from the default path, or return defaults if not found.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(p) = path {
            return Self::load(p);
        }

        if let Some(default_path) = Self::default_path()
            && default_path.exists()
        {
            return Self::load(&default_path);
        }

        Ok(Self::default())
    }

    /// `<config dir>/idlemgt/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("idlemgt").join("config.toml"))
    }

    pub fn idle_threshold(&self) -> Duration {
        Duration::from_secs(self.idle_threshold_seconds)
    }

    /// Poll interval, never shorter than one second.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds.max(1))
    }

    /// True when a whole idle period can fit between two polls.
    pub fn poll_interval_exceeds_threshold(&self) -> bool {
        self.idle_threshold_seconds > 0 && self.poll_interval() > self.idle_threshold()
    }

    /// Log settings that make idle detection coarse.
    pub fn warn_if_coarse(&self) {
        if self.poll_interval_exceeds_threshold() {
            warn!(
                "poll_interval_seconds ({}) is longer than idle_threshold_seconds ({}); \
                 short absences may go unnoticed",
                self.poll_interval().as_secs(),
                self.idle_threshold_seconds
            );
        }
    }
}
