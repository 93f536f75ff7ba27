//! Repository for the `messages` table.

use cyberxercise_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::message::{CreateMessage, Message, MessageWithSender};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, session_id, participant_id, content, created_at";

/// Provides insert and read-back for messages.
pub struct MessageRepo;

impl MessageRepo {
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        input: &CreateMessage,
    ) -> Result<Message, sqlx::Error> {
        let query = format!(
            "INSERT INTO messages (session_id, participant_id, content)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(input.session_id)
            .bind(input.participant_id)
            .bind(&input.content)
            .fetch_one(executor)
            .await
    }

    /// Messages of a session in chronological order; ties fall back to
    /// insertion order via the serial id.
    pub async fn list_for_session<'e>(
        executor: impl PgExecutor<'e>,
        session_id: DbId,
    ) -> Result<Vec<MessageWithSender>, sqlx::Error> {
        sqlx::query_as::<_, MessageWithSender>(
            "SELECT m.id, m.participant_id, p.display_name, m.content, m.created_at
             FROM messages m
             JOIN participants p ON p.id = m.participant_id
             WHERE m.session_id = $1
             ORDER BY m.created_at ASC, m.id ASC",
        )
        .bind(session_id)
        .fetch_all(executor)
        .await
    }
}
