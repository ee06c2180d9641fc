//! Axum router construction.
//!
//! Paths keep the layout existing CelestialTree clients call.
//! A path that exists under a different method answers 405 and an unknown
//! path answers 404, both with the usual JSON error body.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::state::AppState;
use super::{handlers, sse};

/// Build the complete router for a shared [`AppState`].
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Ledger
        .route("/emit", post(handlers::emit))
        .route("/event/{id}", get(handlers::get_event))
        // Graph
        .route("/children/{id}", get(handlers::children))
        .route("/ancestors/{id}", get(handlers::ancestors))
        .route("/heads", get(handlers::heads))
        // Trees and forests
        .route("/descendants/{id}", get(handlers::descendants))
        .route("/descendants", post(handlers::descendants_batch))
        .route("/provenance/{id}", get(handlers::provenance))
        .route("/provenance", post(handlers::provenance_batch))
        // Streaming
        .route("/subscribe", get(sse::subscribe))
        // Service
        .route("/healthz", get(handlers::healthz))
        .route("/version", get(handlers::version))
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .fallback(handlers::unknown_route)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
