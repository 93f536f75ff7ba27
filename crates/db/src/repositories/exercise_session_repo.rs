//! Repository for the `exercise_sessions` table.
//!
//! Status transitions are compare-and-set updates: they only match a row
//! still in the expected source status, so a losing concurrent writer gets
//! `None` back instead of re-applying the transition.

use cyberxercise_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;

use crate::models::exercise_session::{CreateExerciseSession, ExerciseSession};
use crate::models::status::EndedBy;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, instructor_id, team_code, status, max_participants, duration_seconds, \
                       started_at, ended_at, ended_by, created_at";

/// Provides CRUD and lifecycle operations for exercise sessions.
pub struct ExerciseSessionRepo;

impl ExerciseSessionRepo {
    /// Insert a new session in the `lobby` state.
    ///
    /// Fails with a unique violation on `uq_exercise_sessions_team_code` when
    /// the team code is already taken.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        input: &CreateExerciseSession,
    ) -> Result<ExerciseSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO exercise_sessions (instructor_id, team_code, max_participants, duration_seconds)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ExerciseSession>(&query)
            .bind(input.instructor_id)
            .bind(&input.team_code)
            .bind(input.max_participants)
            .bind(input.duration_seconds)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<ExerciseSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM exercise_sessions WHERE id = $1");
        sqlx::query_as::<_, ExerciseSession>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_team_code<'e>(
        executor: impl PgExecutor<'e>,
        team_code: &str,
    ) -> Result<Option<ExerciseSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM exercise_sessions WHERE team_code = $1");
        sqlx::query_as::<_, ExerciseSession>(&query)
            .bind(team_code)
            .fetch_optional(executor)
            .await
    }

    /// Lock the session row exclusively for the rest of the transaction.
    ///
    /// Serializes joins and status transitions for one session.
    pub async fn lock_for_update<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<ExerciseSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM exercise_sessions WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, ExerciseSession>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Take a shared lock on the session row for the rest of the transaction.
    ///
    /// Blocks concurrent transitions while allowing other shared holders.
    pub async fn lock_for_share<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<ExerciseSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM exercise_sessions WHERE id = $1 FOR SHARE");
        sqlx::query_as::<_, ExerciseSession>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Move `lobby -> running` if at least one participant is active and
    /// every active participant is ready.
    pub async fn start<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
        started_at: Timestamp,
    ) -> Result<Option<ExerciseSession>, sqlx::Error> {
        let query = format!(
            "UPDATE exercise_sessions s
             SET status = 'running', started_at = $2
             WHERE s.id = $1
               AND s.status = 'lobby'
               AND EXISTS (
                   SELECT 1 FROM participants p
                   WHERE p.session_id = s.id AND p.left_at IS NULL
               )
               AND NOT EXISTS (
                   SELECT 1 FROM participants p
                   WHERE p.session_id = s.id AND p.left_at IS NULL AND NOT p.is_ready
               )
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ExerciseSession>(&query)
            .bind(id)
            .bind(started_at)
            .fetch_optional(executor)
            .await
    }

    /// Move `running -> ended`.
    pub async fn end<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
        ended_at: Timestamp,
        ended_by: EndedBy,
    ) -> Result<Option<ExerciseSession>, sqlx::Error> {
        let query = format!(
            "UPDATE exercise_sessions
             SET status = 'ended', ended_at = $2, ended_by = $3
             WHERE id = $1 AND status = 'running'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ExerciseSession>(&query)
            .bind(id)
            .bind(ended_at)
            .bind(ended_by)
            .fetch_optional(executor)
            .await
    }

    /// Running sessions whose configured duration has elapsed at `now`.
    pub async fn list_expired<'e>(
        executor: impl PgExecutor<'e>,
        now: Timestamp,
    ) -> Result<Vec<ExerciseSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM exercise_sessions
             WHERE status = 'running'
               AND duration_seconds IS NOT NULL
               AND started_at + duration_seconds * INTERVAL '1 second' <= $1
             ORDER BY started_at ASC, id ASC"
        );
        sqlx::query_as::<_, ExerciseSession>(&query)
            .bind(now)
            .fetch_all(executor)
            .await
    }
}
