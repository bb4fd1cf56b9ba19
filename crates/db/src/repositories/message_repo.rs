//! Repository for the `messages` table.

use gradhub_core::types::DbId;
use sqlx::PgPool;

use crate::models::conversation::{CreateMessage, Message};
use crate::repositories::ConversationRepo;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, conversation_id, sender_id, receiver_id, body, file, created_at";

/// Provides access to direct messages.
pub struct MessageRepo;

impl MessageRepo {
    /// Store a message, creating the conversation on first contact. Both
    /// writes happen in one transaction.
    pub async fn send(
        pool: &PgPool,
        sender_id: DbId,
        input: &CreateMessage,
    ) -> Result<Message, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let conversation =
            ConversationRepo::find_or_create(&mut *tx, sender_id, input.receiver_id).await?;

        let query = format!(
            "INSERT INTO messages (conversation_id, sender_id, receiver_id, body, file)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        let message = sqlx::query_as::<_, Message>(&query)
            .bind(conversation.id)
            .bind(sender_id)
            .bind(input.receiver_id)
            .bind(input.body.as_deref().map(str::trim))
            .bind(&input.file)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Message>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM messages WHERE id = $1");
        sqlx::query_as::<_, Message>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Messages of a conversation, oldest first.
    pub async fn list_for_conversation(
        pool: &PgPool,
        conversation_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM messages
             WHERE conversation_id = $1
             ORDER BY created_at ASC, id ASC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(conversation_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Delete a message only if `sender_id` sent it. Returns the removed row.
    pub async fn delete_own(
        pool: &PgPool,
        id: DbId,
        sender_id: DbId,
    ) -> Result<Option<Message>, sqlx::Error> {
        let query =
            format!("DELETE FROM messages WHERE id = $1 AND sender_id = $2 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Message>(&query)
            .bind(id)
            .bind(sender_id)
            .fetch_optional(pool)
            .await
    }
}
