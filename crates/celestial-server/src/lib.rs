//! celestial-server: HTTP/JSON and SSE access to a CelestialTree store.
//!
//! # Conventions
//!
//! - **Errors**: handlers return [`http::ApiError`]; startup and config use
//!   `anyhow::Result`.
//! - **Logging**: `tracing` macros; [`telemetry::init_tracing`] installs the
//!   subscriber for the binary.

pub mod config;
pub mod http;
pub mod server;
pub mod telemetry;
pub mod version;

pub use config::{Overrides, ServerConfig};
pub use http::{AppState, build_router};
pub use server::ServerError;
