use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use serde::Serialize;
use tracing::debug;

use crate::commands::CommandEvent;
use crate::engine::modlist::Modlist;

use super::app_state::AppState;
use super::auth_middleware::GatewayAuth;

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

/// GET /api/modlists: every registered modlist, ordered by id.
pub async fn list_modlists(State(state): State<Arc<AppState>>) -> Json<Vec<Modlist>> {
    Json(state.handler.herald().list_modlists())
}

#[derive(Debug, Serialize)]
pub struct EventReplies {
    pub replies: Vec<String>,
}

/// POST /api/events: run a chat message through the command layer.
/// The gateway posts the returned replies in the event's channel.
pub async fn ingest_event(
    State(state): State<Arc<AppState>>,
    _auth: GatewayAuth,
    Json(event): Json<CommandEvent>,
) -> impl IntoResponse {
    let replies = state.handler.handle(&event).await;
    debug!(
        server_id = %event.server_id,
        channel_id = %event.channel_id,
        replies = replies.len(),
        "event handled"
    );
    Json(EventReplies { replies })
}
