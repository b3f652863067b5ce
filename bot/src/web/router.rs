use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use super::app_state::AppState;
use super::rest_api;

/// Largest accepted event body. A chat message is at most a few KiB.
const MAX_EVENT_BODY: usize = 64 * 1024;

/// Build the axum router with the health, listing and event ingest routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(rest_api::health))
        .route("/api/modlists", get(rest_api::list_modlists))
        .route(
            "/api/events",
            post(rest_api::ingest_event).layer(DefaultBodyLimit::max(MAX_EVENT_BODY)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
