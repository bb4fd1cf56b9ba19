//! Handlers for direct messages and conversations.
//!
//! Conversations are created implicitly by the first message between two
//! users. New and deleted messages are pushed to the receiver over
//! WebSocket.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use gradhub_core::error::CoreError;
use gradhub_core::messaging::{other_participant, validate_message};
use gradhub_core::roles::ROLE_GRADUATED;
use gradhub_core::storage::CATEGORY_MESSAGES;
use gradhub_core::types::DbId;
use gradhub_core::validation::FieldErrors;
use gradhub_db::models::conversation::{Conversation, ConversationSummary, CreateMessage, Message};
use gradhub_db::models::user::UserSummary;
use gradhub_db::repositories::{ConversationRepo, MessageRepo, UserRepo};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::form::{discard_upload, store_upload, FormData};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;
use crate::ws::ChatEvent;

/// A conversation with the other participant and one page of messages.
#[derive(Debug, Serialize)]
pub struct ConversationView {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub other_user: Option<UserSummary>,
    /// Oldest first.
    pub messages: Vec<Message>,
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// POST /api/v1/messages
///
/// Multipart `receiver_id`, `body` and/or `file`. Returns 201 with the
/// stored message.
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<Message>>)> {
    let form = FormData::from_multipart(multipart).await?;

    let mut errors = FieldErrors::new();
    let receiver_id = form.required_id("receiver_id", &mut errors);
    errors.into_result()?;

    let body = form.text("body").map(str::to_string);
    validate_message(user.user_id, receiver_id, body.as_deref(), form.file.is_some())?;

    if !UserRepo::missing_ids(&state.pool, &[receiver_id]).await?.is_empty() {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: receiver_id,
        }));
    }

    let input = CreateMessage {
        receiver_id,
        body,
        file: store_upload(state.storage.as_ref(), CATEGORY_MESSAGES, form.file.as_ref()).await?,
    };

    let message = match MessageRepo::send(&state.pool, user.user_id, &input).await {
        Ok(message) => message,
        Err(e) => {
            if let Some(path) = &input.file {
                discard_upload(state.storage.as_ref(), path).await;
            }
            return Err(e.into());
        }
    };

    let delivered = state
        .ws_manager
        .push_event(receiver_id, &ChatEvent::MessageCreated(&message))
        .await;
    tracing::debug!(
        message_id = message.id,
        conversation_id = message.conversation_id,
        sender_id = user.user_id,
        receiver_id,
        delivered,
        "Message sent"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: message })))
}

/// DELETE /api/v1/messages/{id}
///
/// Only the sender may delete a message. Returns 204 No Content.
pub async fn delete_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let existing = MessageRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Message",
            id,
        }))?;
    if existing.sender_id != user.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "You can only delete your own messages".into(),
        )));
    }

    let removed = MessageRepo::delete_own(&state.pool, id, user.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Message",
            id,
        }))?;
    if let Some(file) = &removed.file {
        discard_upload(state.storage.as_ref(), file).await;
    }

    state
        .ws_manager
        .push_event(
            removed.receiver_id,
            &ChatEvent::MessageDeleted {
                id: removed.id,
                conversation_id: removed.conversation_id,
            },
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

/// GET /api/v1/conversations
///
/// The caller's conversations, most recently active first.
pub async fn list_conversations(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<ConversationSummary>>>> {
    ensure_can_read_chat(&user)?;
    let data = ConversationRepo::list_for_user(&state.pool, user.user_id).await?;
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/conversations/{id}
///
/// Participants only. Messages are paged with `?limit=&offset=`.
pub async fn get_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<ConversationView>>> {
    ensure_can_read_chat(&user)?;
    let conversation = find_own_conversation(&state, &user, id).await?;

    let other_id = other_participant(
        (conversation.user1_id, conversation.user2_id),
        user.user_id,
    );
    let other_user = match other_id {
        Some(other) => UserRepo::find_summary(&state.pool, other).await?,
        None => None,
    };
    let messages =
        MessageRepo::list_for_conversation(&state.pool, id, params.limit(), params.offset())
            .await?;

    Ok(Json(DataResponse {
        data: ConversationView {
            conversation,
            other_user,
            messages,
        },
    }))
}

/// DELETE /api/v1/conversations/{id}
///
/// Either participant may delete the conversation with all its messages.
/// Attachments are removed and both participants get `conversation.deleted`.
pub async fn delete_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let conversation = find_own_conversation(&state, &user, id).await?;
    let files = ConversationRepo::delete(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Conversation",
            id,
        }))?;
    for file in &files {
        discard_upload(state.storage.as_ref(), file).await;
    }
    tracing::info!(
        conversation_id = id,
        user_id = user.user_id,
        attachments = files.len(),
        "Conversation deleted"
    );

    let event = ChatEvent::ConversationDeleted { id };
    for participant in [conversation.user1_id, conversation.user2_id] {
        state.ws_manager.push_event(participant, &event).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ensure_can_read_chat(user: &AuthUser) -> AppResult<()> {
    if user.has_role(ROLE_GRADUATED) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Graduated users cannot access conversations".into(),
        )));
    }
    Ok(())
}

async fn find_own_conversation(
    state: &AppState,
    user: &AuthUser,
    id: DbId,
) -> AppResult<Conversation> {
    let conversation = ConversationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Conversation",
            id,
        }))?;
    if !conversation.has_participant(user.user_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "You are not a participant of this conversation".into(),
        )));
    }
    Ok(conversation)
}
