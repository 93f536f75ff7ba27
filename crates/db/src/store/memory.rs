//! In-memory [`SessionStore`] for tests and database-less runs.
//!
//! Every operation runs under one mutex, which gives the same serialization
//! the PostgreSQL store gets from row locks. Unique, check and foreign-key
//! constraints from the migration are mirrored by hand and reported with the
//! same constraint names.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use cyberxercise_core::participant_token::TokenDigest;
use cyberxercise_core::team_code::is_valid_team_code;
use cyberxercise_core::types::{DbId, Timestamp};
use cyberxercise_core::validation::{MAX_PARTICIPANTS, MIN_PARTICIPANTS};
use tokio::sync::Mutex;

use super::constraints;
use super::{SessionStore, StoreError, StoreResult};
use crate::models::exercise_session::{CreateExerciseSession, ExerciseSession};
use crate::models::instructor::{CreateInstructor, Instructor};
use crate::models::message::{CreateMessage, Message, MessageWithSender};
use crate::models::participant::{CreateParticipant, Participant};
use crate::models::status::{EndedBy, SessionStatus};

#[derive(Default)]
struct Tables {
    next_id: DbId,
    instructors: BTreeMap<DbId, Instructor>,
    sessions: BTreeMap<DbId, ExerciseSession>,
    participants: BTreeMap<DbId, Participant>,
    messages: BTreeMap<DbId, Message>,
}

impl Tables {
    /// One counter for every table; ids stay unique and monotonic.
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn active_count(&self, session_id: DbId) -> usize {
        self.participants
            .values()
            .filter(|p| p.session_id == session_id && p.is_active())
            .count()
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    tables: Mutex<Tables>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn unique(constraint: &str) -> StoreError {
    StoreError::UniqueViolation {
        constraint: constraint.to_string(),
    }
}

fn check(constraint: &str) -> StoreError {
    StoreError::CheckViolation {
        constraint: constraint.to_string(),
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_instructor(&self, input: &CreateInstructor) -> StoreResult<Instructor> {
        let mut t = self.tables.lock().await;
        if t.instructors.values().any(|i| i.username == input.username) {
            return Err(unique(constraints::UQ_INSTRUCTORS_USERNAME));
        }
        let instructor = Instructor {
            id: t.next_id(),
            username: input.username.clone(),
            password_hash: input.password_hash.clone(),
            created_at: Utc::now(),
        };
        t.instructors.insert(instructor.id, instructor.clone());
        Ok(instructor)
    }

    async fn find_instructor_by_id(&self, id: DbId) -> StoreResult<Option<Instructor>> {
        Ok(self.tables.lock().await.instructors.get(&id).cloned())
    }

    async fn find_instructor_by_username(
        &self,
        username: &str,
    ) -> StoreResult<Option<Instructor>> {
        let t = self.tables.lock().await;
        Ok(t.instructors
            .values()
            .find(|i| i.username == username)
            .cloned())
    }

    async fn create_session(&self, input: &CreateExerciseSession) -> StoreResult<ExerciseSession> {
        let mut t = self.tables.lock().await;
        if !t.instructors.contains_key(&input.instructor_id) {
            return Err(StoreError::ForeignKeyViolation {
                constraint: constraints::FK_SESSIONS_INSTRUCTOR.to_string(),
            });
        }
        if !(MIN_PARTICIPANTS..=MAX_PARTICIPANTS).contains(&input.max_participants) {
            return Err(check(constraints::CK_SESSIONS_MAX_PARTICIPANTS));
        }
        if !is_valid_team_code(&input.team_code) {
            return Err(check(constraints::CK_SESSIONS_TEAM_CODE_FORMAT));
        }
        if input.duration_seconds.is_some_and(|d| d < 1) {
            return Err(check(constraints::CK_SESSIONS_DURATION));
        }
        if t.sessions.values().any(|s| s.team_code == input.team_code) {
            return Err(unique(constraints::UQ_SESSIONS_TEAM_CODE));
        }

        let session = ExerciseSession {
            id: t.next_id(),
            instructor_id: input.instructor_id,
            team_code: input.team_code.clone(),
            status: SessionStatus::Lobby,
            max_participants: input.max_participants,
            duration_seconds: input.duration_seconds,
            started_at: None,
            ended_at: None,
            ended_by: None,
            created_at: Utc::now(),
        };
        t.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_session(&self, id: DbId) -> StoreResult<Option<ExerciseSession>> {
        Ok(self.tables.lock().await.sessions.get(&id).cloned())
    }

    async fn find_session_by_team_code(
        &self,
        team_code: &str,
    ) -> StoreResult<Option<ExerciseSession>> {
        let t = self.tables.lock().await;
        Ok(t.sessions
            .values()
            .find(|s| s.team_code == team_code)
            .cloned())
    }

    async fn start_session(
        &self,
        id: DbId,
        at: Timestamp,
    ) -> StoreResult<Option<ExerciseSession>> {
        let mut t = self.tables.lock().await;

        let mut active = t
            .participants
            .values()
            .filter(|p| p.session_id == id && p.is_active())
            .peekable();
        let has_active = active.peek().is_some();
        let all_ready = active.all(|p| p.is_ready);
        if !has_active || !all_ready {
            return Ok(None);
        }

        let Some(session) = t.sessions.get_mut(&id) else {
            return Ok(None);
        };
        if session.status != SessionStatus::Lobby {
            return Ok(None);
        }
        session.status = SessionStatus::Running;
        session.started_at = Some(at);
        Ok(Some(session.clone()))
    }

    async fn end_session(
        &self,
        id: DbId,
        at: Timestamp,
        ended_by: EndedBy,
    ) -> StoreResult<Option<ExerciseSession>> {
        let mut t = self.tables.lock().await;
        let Some(session) = t.sessions.get_mut(&id) else {
            return Ok(None);
        };
        if session.status != SessionStatus::Running {
            return Ok(None);
        }
        session.status = SessionStatus::Ended;
        session.ended_at = Some(at);
        session.ended_by = Some(ended_by);
        Ok(Some(session.clone()))
    }

    async fn list_expired_sessions(&self, now: Timestamp) -> StoreResult<Vec<ExerciseSession>> {
        let t = self.tables.lock().await;
        let mut expired: Vec<_> = t
            .sessions
            .values()
            .filter(|s| s.status == SessionStatus::Running)
            .filter(|s| s.expires_at().is_some_and(|at| at <= now))
            .cloned()
            .collect();
        expired.sort_by_key(|s| (s.started_at, s.id));
        Ok(expired)
    }

    async fn add_participant(&self, input: &CreateParticipant) -> StoreResult<Participant> {
        let mut t = self.tables.lock().await;

        let session = t
            .sessions
            .get(&input.session_id)
            .ok_or(StoreError::SessionNotFound)?;
        if session.status != SessionStatus::Lobby {
            return Err(StoreError::NotJoinable(session.status));
        }
        let capacity = usize::try_from(session.max_participants).unwrap_or(0);
        if t.active_count(session.id) >= capacity {
            return Err(StoreError::SessionFull);
        }

        if t.participants
            .values()
            .any(|p| p.session_id == input.session_id && p.display_name == input.display_name)
        {
            return Err(unique(constraints::UQ_PARTICIPANTS_DISPLAY_NAME));
        }
        if t.participants
            .values()
            .any(|p| p.token_digest[..] == input.token_digest[..])
        {
            return Err(unique(constraints::UQ_PARTICIPANTS_TOKEN_DIGEST));
        }

        let participant = Participant {
            id: t.next_id(),
            session_id: input.session_id,
            display_name: input.display_name.clone(),
            is_ready: false,
            token_digest: input.token_digest.to_vec(),
            token_revoked_at: None,
            joined_at: Utc::now(),
            left_at: None,
        };
        t.participants.insert(participant.id, participant.clone());
        Ok(participant)
    }

    async fn find_participant(&self, id: DbId) -> StoreResult<Option<Participant>> {
        Ok(self.tables.lock().await.participants.get(&id).cloned())
    }

    async fn find_participant_by_token_digest(
        &self,
        digest: &TokenDigest,
    ) -> StoreResult<Option<Participant>> {
        let t = self.tables.lock().await;
        Ok(t.participants
            .values()
            .find(|p| p.token_digest[..] == digest[..])
            .cloned())
    }

    async fn list_participants(&self, session_id: DbId) -> StoreResult<Vec<Participant>> {
        let t = self.tables.lock().await;
        let mut participants: Vec<_> = t
            .participants
            .values()
            .filter(|p| p.session_id == session_id)
            .cloned()
            .collect();
        participants.sort_by_key(|p| (p.joined_at, p.id));
        Ok(participants)
    }

    async fn set_participant_ready(
        &self,
        participant_id: DbId,
        is_ready: bool,
    ) -> StoreResult<Option<Participant>> {
        let mut t = self.tables.lock().await;

        let Some(session_id) = t.participants.get(&participant_id).map(|p| p.session_id) else {
            return Ok(None);
        };
        let in_lobby = t
            .sessions
            .get(&session_id)
            .is_some_and(|s| s.status == SessionStatus::Lobby);
        if !in_lobby {
            return Ok(None);
        }

        match t.participants.get_mut(&participant_id) {
            Some(p) if p.is_active() => {
                p.is_ready = is_ready;
                Ok(Some(p.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn mark_participant_left(
        &self,
        participant_id: DbId,
        at: Timestamp,
    ) -> StoreResult<Option<Participant>> {
        let mut t = self.tables.lock().await;
        let Some(p) = t.participants.get_mut(&participant_id) else {
            return Ok(None);
        };
        p.left_at.get_or_insert(at);
        p.token_revoked_at.get_or_insert(at);
        Ok(Some(p.clone()))
    }

    async fn add_message(&self, input: &CreateMessage) -> StoreResult<Option<Message>> {
        let mut t = self.tables.lock().await;

        let running = t
            .sessions
            .get(&input.session_id)
            .is_some_and(|s| s.status == SessionStatus::Running);
        let sender_active = t
            .participants
            .get(&input.participant_id)
            .is_some_and(|p| p.session_id == input.session_id && p.is_active());
        if !running || !sender_active {
            return Ok(None);
        }

        let message = Message {
            id: t.next_id(),
            session_id: input.session_id,
            participant_id: input.participant_id,
            content: input.content.clone(),
            created_at: Utc::now(),
        };
        t.messages.insert(message.id, message.clone());
        Ok(Some(message))
    }

    async fn list_messages(&self, session_id: DbId) -> StoreResult<Vec<MessageWithSender>> {
        let t = self.tables.lock().await;
        let mut messages: Vec<_> = t
            .messages
            .values()
            .filter(|m| m.session_id == session_id)
            .filter_map(|m| {
                let sender = t.participants.get(&m.participant_id)?;
                Some(MessageWithSender {
                    id: m.id,
                    participant_id: m.participant_id,
                    display_name: sender.display_name.clone(),
                    content: m.content.clone(),
                    created_at: m.created_at,
                })
            })
            .collect();
        messages.sort_by_key(|m| (m.created_at, m.id));
        Ok(messages)
    }
}
