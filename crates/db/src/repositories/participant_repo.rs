//! Repository for the `participants` table.

use cyberxercise_core::participant_token::TokenDigest;
use cyberxercise_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;

use crate::models::participant::{CreateParticipant, Participant};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, session_id, display_name, is_ready, token_digest, token_revoked_at, \
                       joined_at, left_at";

/// Provides CRUD operations for participants.
pub struct ParticipantRepo;

impl ParticipantRepo {
    /// Insert a participant.
    ///
    /// Fails with a unique violation on `uq_participants_session_display_name`
    /// or `uq_participants_token_digest`.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        input: &CreateParticipant,
    ) -> Result<Participant, sqlx::Error> {
        let query = format!(
            "INSERT INTO participants (session_id, display_name, token_digest)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Participant>(&query)
            .bind(input.session_id)
            .bind(&input.display_name)
            .bind(&input.token_digest[..])
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<Participant>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM participants WHERE id = $1");
        sqlx::query_as::<_, Participant>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_token_digest<'e>(
        executor: impl PgExecutor<'e>,
        digest: &TokenDigest,
    ) -> Result<Option<Participant>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM participants WHERE token_digest = $1");
        sqlx::query_as::<_, Participant>(&query)
            .bind(&digest[..])
            .fetch_optional(executor)
            .await
    }

    /// Number of participants in the session that have not left.
    pub async fn count_active<'e>(
        executor: impl PgExecutor<'e>,
        session_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM participants WHERE session_id = $1 AND left_at IS NULL",
        )
        .bind(session_id)
        .fetch_one(executor)
        .await
    }

    /// All participants ever admitted, ordered by join time.
    pub async fn list_for_session<'e>(
        executor: impl PgExecutor<'e>,
        session_id: DbId,
    ) -> Result<Vec<Participant>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM participants
             WHERE session_id = $1
             ORDER BY joined_at ASC, id ASC"
        );
        sqlx::query_as::<_, Participant>(&query)
            .bind(session_id)
            .fetch_all(executor)
            .await
    }

    /// Set the ready flag of an active participant.
    pub async fn set_ready<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
        is_ready: bool,
    ) -> Result<Option<Participant>, sqlx::Error> {
        let query = format!(
            "UPDATE participants SET is_ready = $2
             WHERE id = $1 AND left_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Participant>(&query)
            .bind(id)
            .bind(is_ready)
            .fetch_optional(executor)
            .await
    }

    /// Record a voluntary leave and revoke the token.
    ///
    /// Existing timestamps are preserved, so repeating the call is harmless.
    pub async fn mark_left<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
        at: Timestamp,
    ) -> Result<Option<Participant>, sqlx::Error> {
        let query = format!(
            "UPDATE participants
             SET left_at = COALESCE(left_at, $2),
                 token_revoked_at = COALESCE(token_revoked_at, $2)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Participant>(&query)
            .bind(id)
            .bind(at)
            .fetch_optional(executor)
            .await
    }
}
