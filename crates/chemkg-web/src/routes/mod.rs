//! HTTP routes for the query service.

mod api;

pub use api::ApiError;

use crate::AppState;
use axum::{routing::get, Router};
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Create the router with every route bounded by `timeout`.
pub fn create_router(state: AppState, timeout: Duration) -> Router {
    Router::new()
        .route("/api/trace", get(api::trace))
        .route("/api/concepts", get(api::concepts))
        .route("/api/path", get(api::path))
        .route("/api/health", get(api::health))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        // CORS for browser clients
        .layer(CorsLayer::permissive())
        .with_state(state)
}
