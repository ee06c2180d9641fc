//! Tracing setup for the `celestialtree` binary.
//!
//! The `[log]` table of the config file picks the filter and output
//! format. `CELESTIAL_LOG` and `CELESTIAL_LOG_FORMAT` override it, and a set
//! `DEBUG` raises the built-in filter when nothing else chose one. Logs go
//! to stderr so `celestialtree config` can print clean TOML on stdout.

use std::env;
use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt as layer_fmt};

pub const LOG_ENV: &str = "CELESTIAL_LOG";
pub const LOG_FORMAT_ENV: &str = "CELESTIAL_LOG_FORMAT";

const DEFAULT_DIRECTIVES: &str =
    "celestial_core=info,celestial_server=info,celestialtree=info,warn";
const DEBUG_DIRECTIVES: &str =
    "celestial_core=debug,celestial_server=debug,celestialtree=debug,tower_http=debug,info";

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One human-readable line per event.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Compact => "compact",
            Self::Json => "json",
        })
    }
}

/// Error for an unrecognized log format name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log format: {0}")]
pub struct ParseLogFormatError(String);

impl FromStr for LogFormat {
    type Err = ParseLogFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(ParseLogFormatError(other.to_string())),
        }
    }
}

/// The `[log]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directives. Unset means the built-in default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default)]
    pub format: LogFormat,
}

impl LogConfig {
    /// Apply the process environment on top of the file settings.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_vars(|name| env::var(name).ok())
    }

    /// Apply variables from `lookup`. An unparseable format keeps the file
    /// setting.
    #[must_use]
    pub fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        match lookup(LOG_ENV).filter(|raw| !raw.trim().is_empty()) {
            Some(filter) => self.filter = Some(filter),
            None if self.filter.is_none() && lookup("DEBUG").is_some() => {
                self.filter = Some(DEBUG_DIRECTIVES.to_string());
            }
            None => {}
        }
        if let Some(format) = lookup(LOG_FORMAT_ENV).and_then(|raw| raw.parse().ok()) {
            self.format = format;
        }
        self
    }

    /// The filter directives that will be installed.
    #[must_use]
    pub fn directives(&self) -> &str {
        self.filter.as_deref().unwrap_or(DEFAULT_DIRECTIVES)
    }
}

/// Install the global tracing subscriber described by `config`.
///
/// # Errors
///
/// Returns an error if the filter does not parse or a subscriber is
/// already installed.
pub fn init_tracing(config: &LogConfig) -> Result<()> {
    let directives = config.directives();
    let filter = EnvFilter::try_new(directives)
        .with_context(|| format!("invalid log filter {directives:?}"))?;
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => registry
            .with(
                layer_fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(layer_fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
    }
    .context("failed to install tracing subscriber")
}
