//! PostgreSQL-backed [`SessionStore`].
//!
//! Joins and transitions take `FOR UPDATE` on the session row; ready changes
//! and message inserts take `FOR SHARE`. Both serialize against each other,
//! so a start never commits while a concurrent join or un-ready is pending.

use async_trait::async_trait;
use cyberxercise_core::participant_token::TokenDigest;
use cyberxercise_core::types::{DbId, Timestamp};

use super::{SessionStore, StoreError, StoreResult};
use crate::models::exercise_session::{CreateExerciseSession, ExerciseSession};
use crate::models::instructor::{CreateInstructor, Instructor};
use crate::models::message::{CreateMessage, Message, MessageWithSender};
use crate::models::participant::{CreateParticipant, Participant};
use crate::models::status::{EndedBy, SessionStatus};
use crate::repositories::{ExerciseSessionRepo, InstructorRepo, MessageRepo, ParticipantRepo};
use crate::DbPool;

#[derive(Clone)]
pub struct PgSessionStore {
    pool: DbPool,
}

impl PgSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn ping(&self) -> StoreResult<()> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }

    async fn create_instructor(&self, input: &CreateInstructor) -> StoreResult<Instructor> {
        Ok(InstructorRepo::create(&self.pool, input).await?)
    }

    async fn find_instructor_by_id(&self, id: DbId) -> StoreResult<Option<Instructor>> {
        Ok(InstructorRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_instructor_by_username(
        &self,
        username: &str,
    ) -> StoreResult<Option<Instructor>> {
        Ok(InstructorRepo::find_by_username(&self.pool, username).await?)
    }

    async fn create_session(&self, input: &CreateExerciseSession) -> StoreResult<ExerciseSession> {
        Ok(ExerciseSessionRepo::create(&self.pool, input).await?)
    }

    async fn find_session(&self, id: DbId) -> StoreResult<Option<ExerciseSession>> {
        Ok(ExerciseSessionRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_session_by_team_code(
        &self,
        team_code: &str,
    ) -> StoreResult<Option<ExerciseSession>> {
        Ok(ExerciseSessionRepo::find_by_team_code(&self.pool, team_code).await?)
    }

    async fn start_session(
        &self,
        id: DbId,
        at: Timestamp,
    ) -> StoreResult<Option<ExerciseSession>> {
        let mut tx = self.pool.begin().await?;
        if ExerciseSessionRepo::lock_for_update(&mut *tx, id)
            .await?
            .is_none()
        {
            return Ok(None);
        }
        let started = ExerciseSessionRepo::start(&mut *tx, id, at).await?;
        tx.commit().await?;
        Ok(started)
    }

    async fn end_session(
        &self,
        id: DbId,
        at: Timestamp,
        ended_by: EndedBy,
    ) -> StoreResult<Option<ExerciseSession>> {
        Ok(ExerciseSessionRepo::end(&self.pool, id, at, ended_by).await?)
    }

    async fn list_expired_sessions(&self, now: Timestamp) -> StoreResult<Vec<ExerciseSession>> {
        Ok(ExerciseSessionRepo::list_expired(&self.pool, now).await?)
    }

    async fn add_participant(&self, input: &CreateParticipant) -> StoreResult<Participant> {
        let mut tx = self.pool.begin().await?;

        let session = ExerciseSessionRepo::lock_for_update(&mut *tx, input.session_id)
            .await?
            .ok_or(StoreError::SessionNotFound)?;
        if session.status != SessionStatus::Lobby {
            return Err(StoreError::NotJoinable(session.status));
        }

        let active = ParticipantRepo::count_active(&mut *tx, session.id).await?;
        if active >= i64::from(session.max_participants) {
            return Err(StoreError::SessionFull);
        }

        let participant = ParticipantRepo::create(&mut *tx, input).await?;
        tx.commit().await?;
        Ok(participant)
    }

    async fn find_participant(&self, id: DbId) -> StoreResult<Option<Participant>> {
        Ok(ParticipantRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_participant_by_token_digest(
        &self,
        digest: &TokenDigest,
    ) -> StoreResult<Option<Participant>> {
        Ok(ParticipantRepo::find_by_token_digest(&self.pool, digest).await?)
    }

    async fn list_participants(&self, session_id: DbId) -> StoreResult<Vec<Participant>> {
        Ok(ParticipantRepo::list_for_session(&self.pool, session_id).await?)
    }

    async fn set_participant_ready(
        &self,
        participant_id: DbId,
        is_ready: bool,
    ) -> StoreResult<Option<Participant>> {
        let mut tx = self.pool.begin().await?;

        let Some(participant) = ParticipantRepo::find_by_id(&mut *tx, participant_id).await? else {
            return Ok(None);
        };
        let in_lobby = ExerciseSessionRepo::lock_for_share(&mut *tx, participant.session_id)
            .await?
            .is_some_and(|s| s.status == SessionStatus::Lobby);
        if !in_lobby {
            return Ok(None);
        }

        let updated = ParticipantRepo::set_ready(&mut *tx, participant_id, is_ready).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn mark_participant_left(
        &self,
        participant_id: DbId,
        at: Timestamp,
    ) -> StoreResult<Option<Participant>> {
        Ok(ParticipantRepo::mark_left(&self.pool, participant_id, at).await?)
    }

    async fn add_message(&self, input: &CreateMessage) -> StoreResult<Option<Message>> {
        let mut tx = self.pool.begin().await?;

        let running = ExerciseSessionRepo::lock_for_share(&mut *tx, input.session_id)
            .await?
            .is_some_and(|s| s.status == SessionStatus::Running);
        if !running {
            return Ok(None);
        }
        let sender_active = ParticipantRepo::find_by_id(&mut *tx, input.participant_id)
            .await?
            .is_some_and(|p| p.session_id == input.session_id && p.is_active());
        if !sender_active {
            return Ok(None);
        }

        let message = MessageRepo::create(&mut *tx, input).await?;
        tx.commit().await?;
        Ok(Some(message))
    }

    async fn list_messages(&self, session_id: DbId) -> StoreResult<Vec<MessageWithSender>> {
        Ok(MessageRepo::list_for_session(&self.pool, session_id).await?)
    }
}
