//! HTTP/JSON transport over a shared [`celestial_core::Store`].
//!
//! - [`router`]: route table and middleware.
//! - [`handlers`]: REST endpoints.
//! - [`sse`]: the `/subscribe` event stream.
//! - [`error`]: mapping of failures to status codes and JSON bodies.

pub mod error;
pub mod handlers;
pub mod router;
pub mod sse;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
