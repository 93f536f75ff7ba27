//! The storage seam used by the session lifecycle engine.
//!
//! [`SessionStore`] bundles every read and write the engine performs. The
//! operations that decide races (joins, status transitions, ready changes,
//! message inserts) re-check their preconditions atomically at commit time:
//! a losing concurrent writer gets a [`StoreError`] or `None` back, never a
//! silently double-applied change.
//!
//! - [`postgres::PgSessionStore`] -- sqlx/PostgreSQL, row locks plus unique
//!   constraints.
//! - [`memory::MemorySessionStore`] -- one mutex over in-memory tables that
//!   mirror the same constraints. Used by tests and database-less runs.

use async_trait::async_trait;
use cyberxercise_core::participant_token::TokenDigest;
use cyberxercise_core::types::{DbId, Timestamp};

use crate::models::exercise_session::{CreateExerciseSession, ExerciseSession};
use crate::models::instructor::{CreateInstructor, Instructor};
use crate::models::message::{CreateMessage, Message, MessageWithSender};
use crate::models::participant::{CreateParticipant, Participant};
use crate::models::status::{EndedBy, SessionStatus};

pub mod memory;
pub mod postgres;

pub use memory::MemorySessionStore;
pub use postgres::PgSessionStore;

/// Constraint names shared by the migration and the in-memory store.
pub mod constraints {
    pub const UQ_INSTRUCTORS_USERNAME: &str = "uq_instructors_username";
    pub const UQ_SESSIONS_TEAM_CODE: &str = "uq_exercise_sessions_team_code";
    pub const UQ_PARTICIPANTS_DISPLAY_NAME: &str = "uq_participants_session_display_name";
    pub const UQ_PARTICIPANTS_TOKEN_DIGEST: &str = "uq_participants_token_digest";
    pub const CK_SESSIONS_MAX_PARTICIPANTS: &str = "ck_exercise_sessions_max_participants";
    pub const CK_SESSIONS_TEAM_CODE_FORMAT: &str = "ck_exercise_sessions_team_code_format";
    pub const CK_SESSIONS_DURATION: &str = "ck_exercise_sessions_duration";
    pub const FK_SESSIONS_INSTRUCTOR: &str = "exercise_sessions_instructor_id_fkey";
}

/// PostgreSQL SQLSTATE for `unique_violation`.
const PG_UNIQUE_VIOLATION: &str = "23505";
/// PostgreSQL SQLSTATE for `foreign_key_violation`.
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";
/// PostgreSQL SQLSTATE for `check_violation`.
const PG_CHECK_VIOLATION: &str = "23514";

/// Errors surfaced by a [`SessionStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("Foreign key constraint violated: {constraint}")]
    ForeignKeyViolation { constraint: String },

    #[error("Check constraint violated: {constraint}")]
    CheckViolation { constraint: String },

    #[error("Session not found")]
    SessionNotFound,

    /// The session left the lobby before the join committed.
    #[error("Session is not joinable (status {0})")]
    NotJoinable(SessionStatus),

    #[error("Session is full")]
    SessionFull,

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    pub fn is_unique_violation(&self, name: &str) -> bool {
        matches!(self, StoreError::UniqueViolation { constraint } if constraint == name)
    }
}

/// Classify integrity violations by SQLSTATE; everything else stays opaque.
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            match db_err.code().as_deref() {
                Some(PG_UNIQUE_VIOLATION) => return StoreError::UniqueViolation { constraint },
                Some(PG_FOREIGN_KEY_VIOLATION) => {
                    return StoreError::ForeignKeyViolation { constraint }
                }
                Some(PG_CHECK_VIOLATION) => return StoreError::CheckViolation { constraint },
                _ => {}
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Verify the backing store is reachable.
    async fn ping(&self) -> StoreResult<()>;

    // --- Instructors ---

    async fn create_instructor(&self, input: &CreateInstructor) -> StoreResult<Instructor>;

    async fn find_instructor_by_id(&self, id: DbId) -> StoreResult<Option<Instructor>>;

    async fn find_instructor_by_username(&self, username: &str)
        -> StoreResult<Option<Instructor>>;

    // --- Sessions ---

    /// Insert a session in `lobby`. A taken team code surfaces as
    /// [`StoreError::UniqueViolation`] on `uq_exercise_sessions_team_code`.
    async fn create_session(&self, input: &CreateExerciseSession) -> StoreResult<ExerciseSession>;

    async fn find_session(&self, id: DbId) -> StoreResult<Option<ExerciseSession>>;

    async fn find_session_by_team_code(&self, team_code: &str)
        -> StoreResult<Option<ExerciseSession>>;

    /// `lobby -> running`, only while at least one participant is active and
    /// all active participants are ready. `None` when the guard fails.
    async fn start_session(&self, id: DbId, at: Timestamp)
        -> StoreResult<Option<ExerciseSession>>;

    /// `running -> ended`. `None` when the session is not running.
    async fn end_session(
        &self,
        id: DbId,
        at: Timestamp,
        ended_by: EndedBy,
    ) -> StoreResult<Option<ExerciseSession>>;

    /// Running sessions whose duration has elapsed at `now`.
    async fn list_expired_sessions(&self, now: Timestamp) -> StoreResult<Vec<ExerciseSession>>;

    // --- Participants ---

    /// Admit a participant into a lobby.
    ///
    /// Status and capacity are re-checked under the session lock, so this
    /// fails with [`StoreError::NotJoinable`] or [`StoreError::SessionFull`]
    /// for a join that lost a race. Duplicate display names surface as a
    /// unique violation.
    async fn add_participant(&self, input: &CreateParticipant) -> StoreResult<Participant>;

    async fn find_participant(&self, id: DbId) -> StoreResult<Option<Participant>>;

    async fn find_participant_by_token_digest(
        &self,
        digest: &TokenDigest,
    ) -> StoreResult<Option<Participant>>;

    /// Everyone ever admitted to the session, ordered by `(joined_at, id)`.
    async fn list_participants(&self, session_id: DbId) -> StoreResult<Vec<Participant>>;

    /// `None` when the participant has left or the session is not in lobby.
    async fn set_participant_ready(
        &self,
        participant_id: DbId,
        is_ready: bool,
    ) -> StoreResult<Option<Participant>>;

    /// Set `left_at` and `token_revoked_at` where unset. `None` only when the
    /// participant does not exist.
    async fn mark_participant_left(
        &self,
        participant_id: DbId,
        at: Timestamp,
    ) -> StoreResult<Option<Participant>>;

    // --- Messages ---

    /// `None` when the session is not running or the sender has left.
    async fn add_message(&self, input: &CreateMessage) -> StoreResult<Option<Message>>;

    /// Messages ordered by `(created_at, id)` with sender display names.
    async fn list_messages(&self, session_id: DbId) -> StoreResult<Vec<MessageWithSender>>;
}
