//! Route table for the chat API.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{chat_with_handler, health, start_chat, ChatAppState};

/// Builds the `/api` router for the chat endpoints.
pub fn chat_routes(state: ChatAppState) -> Router {
    Router::new()
        .route("/api/chat/start", post(start_chat))
        .route("/api/chat/agents/:handler_id", post(chat_with_handler))
        .route("/api/health", get(health))
        .with_state(state)
}
