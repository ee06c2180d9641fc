//! Build identity reported by `/version` and at startup.

use serde::Serialize;

pub const NAME: &str = "CelestialTree";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commit hash, injected at build time through `CELESTIAL_GIT_COMMIT`.
pub const GIT_COMMIT: &str = match option_env!("CELESTIAL_GIT_COMMIT") {
    Some(commit) => commit,
    None => "unknown",
};

/// Build timestamp, injected at build time through `CELESTIAL_BUILD_TIME`.
pub const BUILD_TIME: &str = match option_env!("CELESTIAL_BUILD_TIME") {
    Some(time) => time,
    None => "unknown",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub commit: &'static str,
    pub build: &'static str,
}

impl VersionInfo {
    #[must_use]
    pub const fn current() -> Self {
        Self {
            name: NAME,
            version: VERSION,
            commit: GIT_COMMIT,
            build: BUILD_TIME,
        }
    }
}
