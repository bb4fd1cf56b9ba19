//! Conversation and message models.

use gradhub_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `conversations` table. `user1_id < user2_id` always.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Conversation {
    pub id: DbId,
    pub user1_id: DbId,
    pub user2_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Conversation {
    pub fn has_participant(&self, user_id: DbId) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }
}

/// A conversation as listed for one participant, with the latest message.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ConversationSummary {
    pub id: DbId,
    pub other_user_id: DbId,
    pub other_user_name: String,
    pub other_user_image: Option<String>,
    pub last_message: Option<String>,
    pub last_message_at: Option<Timestamp>,
}

/// A row from the `messages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Message {
    pub id: DbId,
    pub conversation_id: DbId,
    pub sender_id: DbId,
    pub receiver_id: DbId,
    pub body: Option<String>,
    pub file: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for sending a message.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMessage {
    pub receiver_id: DbId,
    pub body: Option<String>,
    pub file: Option<String>,
}
