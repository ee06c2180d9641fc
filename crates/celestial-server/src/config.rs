use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use celestial_core::StoreConfig;
use serde::{Deserialize, Serialize};

use crate::telemetry::LogConfig;

/// Everything the `celestialtree` binary can be configured with.
///
/// Sourced from a TOML file, then overridden by command-line flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Full `host:port` listen address. Takes precedence over
    /// `host`/`http_port` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_addr: Option<String>,
    /// Emit a `genesis` event at startup.
    #[serde(default = "default_true")]
    pub genesis: bool,
    #[serde(default = "default_genesis_message")]
    pub genesis_message: String,
    /// Seconds to wait for in-flight requests after a shutdown signal.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            http_addr: None,
            genesis: default_true(),
            genesis_message: default_genesis_message(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            store: StoreConfig::default(),
            log: LogConfig::default(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_http_port() -> u16 {
    7777
}

const fn default_true() -> bool {
    true
}

fn default_genesis_message() -> String {
    "CelestialTree begins.".to_string()
}

const fn default_shutdown_grace_secs() -> u64 {
    5
}

/// Command-line values that win over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub host: Option<String>,
    pub http_port: Option<u16>,
    pub http_addr: Option<String>,
    pub subscriber_capacity: Option<usize>,
    pub no_genesis: bool,
}

impl ServerConfig {
    /// Parse from a TOML document; missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML or a key has the
    /// wrong type.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("failed to parse server config")
    }

    /// Load configuration.
    ///
    /// An explicit `path` must exist. Otherwise the per-user file is used
    /// when present, and defaults when it is not.
    ///
    /// # Errors
    ///
    /// Returns an error if a file that should be read cannot be read or
    /// parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_file(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::load_file(&path),
            _ => Ok(Self::default()),
        }
    }

    fn load_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_toml_str(&raw).with_context(|| format!("in {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Apply command-line overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.http_port {
            self.http_port = port;
        }
        if overrides.http_addr.is_some() {
            self.http_addr = overrides.http_addr;
        }
        if let Some(capacity) = overrides.subscriber_capacity {
            self.store.subscriber_capacity = capacity;
        }
        if overrides.no_genesis {
            self.genesis = false;
        }
        self
    }

    /// The address to listen on as written: `http_addr` if set, else
    /// `host:http_port`. Host names are resolved when binding.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        match self.http_addr.as_deref().map(str::trim) {
            Some(addr) if !addr.is_empty() => addr.to_string(),
            _ => join_host_port(&self.host, self.http_port),
        }
    }

    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Render as TOML for `celestialtree config`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to render config")
    }
}

fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// `<config dir>/celestialtree/config.toml`, if the platform has a config
/// dir.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("celestialtree").join("config.toml"))
}
