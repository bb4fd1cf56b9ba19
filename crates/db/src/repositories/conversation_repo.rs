//! Repository for the `conversations` table.

use gradhub_core::messaging::ordered_pair;
use gradhub_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::conversation::{Conversation, ConversationSummary};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user1_id, user2_id, created_at, updated_at";

/// Provides access to two-party conversations.
pub struct ConversationRepo;

impl ConversationRepo {
    /// Return the conversation between two users, creating it on first
    /// contact. Bumps `updated_at` either way.
    pub async fn find_or_create<'e>(
        executor: impl PgExecutor<'e>,
        a: DbId,
        b: DbId,
    ) -> Result<Conversation, sqlx::Error> {
        let (user1, user2) = ordered_pair(a, b);
        let query = format!(
            "INSERT INTO conversations (user1_id, user2_id)
             VALUES ($1, $2)
             ON CONFLICT (user1_id, user2_id) DO UPDATE SET updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Conversation>(&query)
            .bind(user1)
            .bind(user2)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Conversation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM conversations WHERE id = $1");
        sqlx::query_as::<_, Conversation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Conversations of a user with the other participant and the latest
    /// message, most recently active first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<ConversationSummary>, sqlx::Error> {
        sqlx::query_as::<_, ConversationSummary>(
            "SELECT c.id,
                    other.id AS other_user_id,
                    other.name AS other_user_name,
                    other.image AS other_user_image,
                    last.body AS last_message,
                    last.created_at AS last_message_at
             FROM conversations c
             JOIN users other
               ON other.id = CASE WHEN c.user1_id = $1 THEN c.user2_id ELSE c.user1_id END
             LEFT JOIN LATERAL (
                 SELECT m.body, m.created_at FROM messages m
                 WHERE m.conversation_id = c.id
                 ORDER BY m.created_at DESC, m.id DESC
                 LIMIT 1
             ) last ON true
             WHERE c.user1_id = $1 OR c.user2_id = $1
             ORDER BY COALESCE(last.created_at, c.updated_at) DESC, c.id DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Delete a conversation and its messages in one transaction.
    ///
    /// Returns the stored attachment paths of the removed messages, or
    /// `None` if no conversation has the given `id`.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<Option<Vec<String>>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let files = sqlx::query_scalar::<_, Option<String>>(
            "DELETE FROM messages
             WHERE conversation_id = $1
             RETURNING file",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(files.into_iter().flatten().collect()))
    }
}
