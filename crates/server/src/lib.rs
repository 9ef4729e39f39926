//! HTTP surface of tunecache.
//!
//! Named routes serve the metadata proxy, the client event stream and cache
//! administration. Every other request falls through to the intercepting
//! route and is answered by the worker.

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, StartupError};
pub use state::AppState;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/events", get(routes::events::events))
        .route("/youtube/search", get(routes::youtube::search))
        .route("/youtube/video/{id}", get(routes::youtube::video))
        .route("/youtube/embed-test/{id}", get(routes::youtube::embed_test))
        .route("/proxy", get(routes::proxy::proxy))
        .route("/cache/partitions", get(routes::cache::partitions))
        .route("/cache/purge", post(routes::cache::purge))
        .route("/fetch", get(routes::intercept::fetch_absolute))
        .fallback(routes::intercept::intercept)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
