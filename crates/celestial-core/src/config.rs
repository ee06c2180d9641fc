use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Queue capacity used when nothing else is configured.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 64;

/// Tunables for a [`crate::Store`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Events buffered per subscriber before deliveries are dropped.
    #[serde(default = "default_subscriber_capacity")]
    pub subscriber_capacity: usize,
    /// Events to reserve room for up front.
    #[serde(default)]
    pub initial_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            subscriber_capacity: default_subscriber_capacity(),
            initial_capacity: 0,
        }
    }
}

const fn default_subscriber_capacity() -> usize {
    DEFAULT_SUBSCRIBER_CAPACITY
}

impl StoreConfig {
    /// Parse from a TOML document; missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML or a key has the
    /// wrong type.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("failed to parse store config")
    }

    /// Load from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("in {}", path.display()))
    }
}
