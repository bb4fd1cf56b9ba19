//! Route definitions for direct messages and conversations.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::messaging;
use crate::state::AppState;

/// Routes mounted at `/messages`.
///
/// ```text
/// POST   /       -> send_message
/// DELETE /{id}   -> delete_message (sender only)
/// ```
pub fn messages_router() -> Router<AppState> {
    Router::new()
        .route("/", post(messaging::send_message))
        .route("/{id}", delete(messaging::delete_message))
}

/// Routes mounted at `/conversations`.
///
/// ```text
/// GET    /       -> list_conversations
/// GET    /{id}   -> get_conversation (with messages)
/// DELETE /{id}   -> delete_conversation
/// ```
pub fn conversations_router() -> Router<AppState> {
    Router::new()
        .route("/", get(messaging::list_conversations))
        .route(
            "/{id}",
            get(messaging::get_conversation).delete(messaging::delete_conversation),
        )
}
