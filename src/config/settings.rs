//! Configuration settings and validation.

use crate::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default coalescing latency for change notifications, in milliseconds.
/// Matches the one-second latency of the underlying OS subscription.
const DEFAULT_DEBOUNCE_MS: u64 = 1000;

/// Main configuration for a Folio library.
#[derive(Debug, Clone)]
pub struct Config {
    /// Folder whose image files make up the catalog.
    pub root_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON logging output.
    pub log_json: bool,

    /// Change-notification coalescing window, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            log_level: "info".to_string(),
            log_json: false,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl Config {
    /// Create a configuration for the given root folder, with defaults
    /// for everything else.
    #[must_use]
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.root_dir.as_os_str().is_empty() {
            return Err(Error::config("root directory cannot be empty"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.debounce_ms == 0 {
            return Err(Error::config("debounce_ms cannot be 0"));
        }

        if self.debounce_ms > 60_000 {
            return Err(Error::config("debounce_ms cannot exceed 60000 (one minute)"));
        }

        Ok(())
    }

    /// Get the coalescing window as a `Duration`.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
