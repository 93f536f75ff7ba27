use std::sync::Arc;

use chrono::Utc;
use cyberxercise_core::error::CoreError;
use cyberxercise_core::participant_token::{digest_participant_token, generate_participant_token};
use cyberxercise_core::team_code::{generate_team_code, normalize_team_code};
use cyberxercise_core::types::{DbId, Timestamp};
use cyberxercise_core::validation::{
    validate_display_name, validate_duration_seconds, validate_max_participants,
    validate_message_content, validate_team_code,
};
use cyberxercise_db::models::exercise_session::{CreateExerciseSession, ExerciseSession};
use cyberxercise_db::models::message::{CreateMessage, Message, MessageWithSender};
use cyberxercise_db::models::participant::{CreateParticipant, Participant};
use cyberxercise_db::models::status::{EndedBy, SessionStatus};
use cyberxercise_db::store::{constraints, SessionStore, StoreError};

use super::broadcast::Broadcaster;
use super::events::SessionEvent;
use super::identity::{resolve_participant, AuthRejection, ParticipantAuth, ParticipantContext};

const NOT_IN_LOBBY: &str = "Session is not in lobby";
const NOT_RUNNING: &str = "Session is not running";
const NOT_JOINABLE: &str = "Session is not joinable";
const SESSION_FULL: &str = "Session is full";
const NAME_TAKEN: &str = "Display name already taken";
const INVALID_TOKEN: &str = "Invalid token";

/// Produces candidate team codes. Swappable so collisions can be forced.
pub type TeamCodeSource = Arc<dyn Fn() -> String + Send + Sync>;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub participant_token_pepper: String,
    pub team_code_max_attempts: u32,
}

/// Returned from a successful join. The raw token is never retrievable again.
#[derive(Debug, Clone)]
pub struct JoinedParticipant {
    pub participant_token: String,
    pub participant_id: DbId,
    pub session_id: DbId,
}

#[derive(Debug, Clone)]
pub struct LeftParticipant {
    pub participant_id: DbId,
    pub session_id: DbId,
    pub left_at: Timestamp,
}

pub struct LifecycleEngine {
    store: Arc<dyn SessionStore>,
    broadcaster: Arc<dyn Broadcaster>,
    config: EngineConfig,
    team_codes: TeamCodeSource,
}

/// Wrap an unexpected storage failure. Logged once, where it surfaces: the
/// HTTP error response, the expiry sweeper or the realtime handler.
fn storage(err: StoreError) -> CoreError {
    CoreError::Internal(format!("Session store failure: {err}"))
}

fn session_not_found(id: DbId) -> CoreError {
    CoreError::NotFound {
        entity: "Session",
        id,
    }
}

impl LifecycleEngine {
    pub fn new(
        store: Arc<dyn SessionStore>,
        broadcaster: Arc<dyn Broadcaster>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            broadcaster,
            config,
            team_codes: Arc::new(generate_team_code),
        }
    }

    pub fn with_team_code_source(mut self, source: TeamCodeSource) -> Self {
        self.team_codes = source;
        self
    }

    // -----------------------------------------------------------------------
    // Instructor operations
    // -----------------------------------------------------------------------

    /// Create a lobby session with a fresh team code.
    ///
    /// Team-code collisions are retried with a new code up to the configured
    /// attempt budget; running out is [`CoreError::Unavailable`].
    pub async fn create_session(
        &self,
        instructor_id: DbId,
        max_participants: i32,
        duration_seconds: Option<i32>,
    ) -> Result<ExerciseSession, CoreError> {
        validate_max_participants(max_participants)?;
        validate_duration_seconds(duration_seconds)?;

        for attempt in 1..=self.config.team_code_max_attempts {
            let input = CreateExerciseSession {
                instructor_id,
                team_code: (self.team_codes)(),
                max_participants,
                duration_seconds,
            };
            match self.store.create_session(&input).await {
                Ok(session) => {
                    tracing::info!(
                        session_id = session.id,
                        instructor_id,
                        team_code = %session.team_code,
                        "Session created"
                    );
                    return Ok(session);
                }
                Err(e) if e.is_unique_violation(constraints::UQ_SESSIONS_TEAM_CODE) => {
                    tracing::debug!(attempt, team_code = %input.team_code, "Team code collision");
                }
                Err(e) => return Err(storage(e)),
            }
        }

        tracing::warn!(
            attempts = self.config.team_code_max_attempts,
            "Team code allocation exhausted"
        );
        Err(CoreError::Unavailable(
            "Unable to allocate a unique team code. Please retry.".into(),
        ))
    }

    /// Load a session owned by `instructor_id`. Sessions owned by someone
    /// else are reported as not found.
    pub async fn owned_session(
        &self,
        instructor_id: DbId,
        session_id: DbId,
    ) -> Result<ExerciseSession, CoreError> {
        self.store
            .find_session(session_id)
            .await
            .map_err(storage)?
            .filter(|s| s.is_owned_by(instructor_id))
            .ok_or_else(|| session_not_found(session_id))
    }

    pub async fn list_participants(
        &self,
        instructor_id: DbId,
        session_id: DbId,
    ) -> Result<Vec<Participant>, CoreError> {
        let session = self.owned_session(instructor_id, session_id).await?;
        self.store
            .list_participants(session.id)
            .await
            .map_err(storage)
    }

    pub async fn list_messages(
        &self,
        instructor_id: DbId,
        session_id: DbId,
    ) -> Result<Vec<MessageWithSender>, CoreError> {
        let session = self.owned_session(instructor_id, session_id).await?;
        self.store.list_messages(session.id).await.map_err(storage)
    }

    /// `lobby -> running`. Needs at least one active participant and every
    /// active participant ready.
    pub async fn start_session(
        &self,
        instructor_id: DbId,
        session_id: DbId,
    ) -> Result<ExerciseSession, CoreError> {
        let session = self.owned_session(instructor_id, session_id).await?;
        self.check_startable(&session).await?;

        match self
            .store
            .start_session(session.id, Utc::now())
            .await
            .map_err(storage)?
        {
            Some(started) => {
                tracing::info!(session_id = started.id, "Session started");
                self.broadcaster
                    .broadcast(started.id, SessionEvent::session_started(&started))
                    .await;
                Ok(started)
            }
            None => {
                // Lost a race; re-derive the precise reason from fresh state.
                let current = self.owned_session(instructor_id, session_id).await?;
                self.check_startable(&current).await?;
                Err(CoreError::Conflict(
                    "Session changed concurrently, please retry".into(),
                ))
            }
        }
    }

    async fn check_startable(&self, session: &ExerciseSession) -> Result<(), CoreError> {
        if session.status != SessionStatus::Lobby {
            return Err(CoreError::InvalidState(NOT_IN_LOBBY.into()));
        }
        let participants = self
            .store
            .list_participants(session.id)
            .await
            .map_err(storage)?;
        let mut active = participants.iter().filter(|p| p.is_active()).peekable();
        if active.peek().is_none() {
            return Err(CoreError::InvalidState("No participants have joined".into()));
        }
        if !active.all(|p| p.is_ready) {
            return Err(CoreError::InvalidState(
                "Not all participants are ready".into(),
            ));
        }
        Ok(())
    }

    /// `running -> ended`, attributed to the instructor.
    pub async fn end_session(
        &self,
        instructor_id: DbId,
        session_id: DbId,
    ) -> Result<ExerciseSession, CoreError> {
        let session = self.owned_session(instructor_id, session_id).await?;
        if session.status != SessionStatus::Running {
            return Err(CoreError::InvalidState(NOT_RUNNING.into()));
        }
        self.finish(session.id, Utc::now(), EndedBy::Instructor)
            .await?
            .ok_or_else(|| CoreError::InvalidState(NOT_RUNNING.into()))
    }

    // -----------------------------------------------------------------------
    // Expiry
    // -----------------------------------------------------------------------

    /// End a running session on behalf of the system. `None` when it was
    /// no longer running.
    pub async fn expire_session(
        &self,
        session_id: DbId,
        now: Timestamp,
    ) -> Result<Option<ExerciseSession>, CoreError> {
        self.finish(session_id, now, EndedBy::System).await
    }

    /// End every running session whose duration has elapsed at `now`.
    /// Returns how many sessions this call ended.
    pub async fn expire_due_sessions(&self, now: Timestamp) -> Result<usize, CoreError> {
        let due = self
            .store
            .list_expired_sessions(now)
            .await
            .map_err(storage)?;

        let mut ended = 0;
        for session in due {
            if self.expire_session(session.id, now).await?.is_some() {
                ended += 1;
            }
        }
        Ok(ended)
    }

    async fn finish(
        &self,
        session_id: DbId,
        at: Timestamp,
        ended_by: EndedBy,
    ) -> Result<Option<ExerciseSession>, CoreError> {
        let ended = self
            .store
            .end_session(session_id, at, ended_by)
            .await
            .map_err(storage)?;
        if let Some(session) = &ended {
            tracing::info!(session_id, ended_by = ?ended_by, "Session ended");
            self.broadcaster
                .broadcast(session.id, SessionEvent::session_ended(session))
                .await;
        }
        Ok(ended)
    }

    // -----------------------------------------------------------------------
    // Participant operations
    // -----------------------------------------------------------------------

    /// Admit `display_name` into the lobby identified by `team_code`.
    pub async fn join_session(
        &self,
        team_code: &str,
        display_name: &str,
    ) -> Result<JoinedParticipant, CoreError> {
        let team_code = normalize_team_code(team_code);
        validate_team_code(&team_code)?;
        validate_display_name(display_name)?;

        let session = self
            .store
            .find_session_by_team_code(&team_code)
            .await
            .map_err(storage)?
            .ok_or_else(|| CoreError::NotFoundBy {
                entity: "Session",
                field: "team_code",
                value: team_code.clone(),
            })?;

        if session.status != SessionStatus::Lobby {
            return Err(CoreError::Conflict(NOT_JOINABLE.into()));
        }
        let participants = self
            .store
            .list_participants(session.id)
            .await
            .map_err(storage)?;
        let active = participants.iter().filter(|p| p.is_active()).count();
        if active >= usize::try_from(session.max_participants).unwrap_or(0) {
            return Err(CoreError::Conflict(SESSION_FULL.into()));
        }
        if participants.iter().any(|p| p.display_name == display_name) {
            return Err(CoreError::Conflict(NAME_TAKEN.into()));
        }

        let participant_token = generate_participant_token();
        let input = CreateParticipant {
            session_id: session.id,
            display_name: display_name.to_string(),
            token_digest: digest_participant_token(
                &participant_token,
                &self.config.participant_token_pepper,
            ),
        };

        // The store repeats the checks under the session lock; a join that
        // lost a race lands here with the matching conflict.
        let participant = match self.store.add_participant(&input).await {
            Ok(p) => p,
            Err(StoreError::NotJoinable(_)) => {
                return Err(CoreError::Conflict(NOT_JOINABLE.into()))
            }
            Err(StoreError::SessionFull) => return Err(CoreError::Conflict(SESSION_FULL.into())),
            Err(e) if e.is_unique_violation(constraints::UQ_PARTICIPANTS_DISPLAY_NAME) => {
                return Err(CoreError::Conflict(NAME_TAKEN.into()))
            }
            Err(e @ StoreError::UniqueViolation { .. }) => {
                tracing::warn!(error = %e, session_id = session.id, "Join hit a unique constraint");
                return Err(CoreError::Conflict("Unable to join".into()));
            }
            Err(StoreError::SessionNotFound) => return Err(session_not_found(session.id)),
            Err(e) => return Err(storage(e)),
        };

        tracing::info!(
            session_id = session.id,
            participant_id = participant.id,
            "Participant joined"
        );
        self.broadcaster
            .broadcast(session.id, SessionEvent::participant_joined(&participant))
            .await;

        Ok(JoinedParticipant {
            participant_token,
            participant_id: participant.id,
            session_id: session.id,
        })
    }

    /// Resolve a participant token into an identity or a rejection.
    pub async fn authenticate_participant(
        &self,
        token: Option<&str>,
    ) -> Result<ParticipantAuth, CoreError> {
        resolve_participant(
            self.store.as_ref(),
            &self.config.participant_token_pepper,
            token,
        )
        .await
        .map_err(storage)
    }

    /// Authorize a participant realtime subscription: the token must resolve
    /// and belong to the session behind `team_code`.
    pub async fn authorize_participant_channel(
        &self,
        team_code: &str,
        token: Option<&str>,
    ) -> Result<ParticipantAuth, CoreError> {
        let team_code = normalize_team_code(team_code);
        if validate_team_code(&team_code).is_err() {
            return Ok(ParticipantAuth::Rejected(AuthRejection::WrongSession));
        }
        match self.authenticate_participant(token).await? {
            ParticipantAuth::Authenticated(ctx) if ctx.session.team_code != team_code => {
                Ok(ParticipantAuth::Rejected(AuthRejection::WrongSession))
            }
            other => Ok(other),
        }
    }

    pub async fn set_ready(
        &self,
        ctx: &ParticipantContext,
        is_ready: bool,
    ) -> Result<Participant, CoreError> {
        if ctx.session.status != SessionStatus::Lobby {
            return Err(CoreError::InvalidState(NOT_IN_LOBBY.into()));
        }

        let updated = self
            .store
            .set_participant_ready(ctx.participant.id, is_ready)
            .await
            .map_err(storage)?;
        let Some(participant) = updated else {
            return Err(self
                .explain_participant_race(ctx, SessionStatus::Lobby, NOT_IN_LOBBY)
                .await);
        };

        tracing::info!(
            session_id = participant.session_id,
            participant_id = participant.id,
            is_ready,
            "Participant readiness changed"
        );
        self.broadcaster
            .broadcast(
                participant.session_id,
                SessionEvent::participant_ready_changed(&participant),
            )
            .await;
        Ok(participant)
    }

    pub async fn submit_message(
        &self,
        ctx: &ParticipantContext,
        content: &str,
    ) -> Result<Message, CoreError> {
        validate_message_content(content)?;
        if ctx.session.status != SessionStatus::Running {
            return Err(CoreError::InvalidState(NOT_RUNNING.into()));
        }

        let input = CreateMessage {
            session_id: ctx.session.id,
            participant_id: ctx.participant.id,
            content: content.to_string(),
        };
        let Some(message) = self.store.add_message(&input).await.map_err(storage)? else {
            return Err(self
                .explain_participant_race(ctx, SessionStatus::Running, NOT_RUNNING)
                .await);
        };

        tracing::info!(
            session_id = message.session_id,
            participant_id = message.participant_id,
            message_id = message.id,
            "Message submitted"
        );
        self.broadcaster
            .broadcast(
                message.session_id,
                SessionEvent::message_submitted(&message, &ctx.participant),
            )
            .await;
        Ok(message)
    }

    /// Leave voluntarily. Irreversible: the token is revoked and the seat is
    /// freed immediately.
    pub async fn leave(&self, ctx: &ParticipantContext) -> Result<LeftParticipant, CoreError> {
        let now = Utc::now();
        let participant = self
            .store
            .mark_participant_left(ctx.participant.id, now)
            .await
            .map_err(storage)?
            .ok_or_else(|| CoreError::Unauthorized(INVALID_TOKEN.into()))?;

        tracing::info!(
            session_id = participant.session_id,
            participant_id = participant.id,
            "Participant left"
        );
        self.broadcaster
            .broadcast(
                participant.session_id,
                SessionEvent::participant_left(&participant),
            )
            .await;

        Ok(LeftParticipant {
            participant_id: participant.id,
            session_id: participant.session_id,
            left_at: participant.left_at.unwrap_or(now),
        })
    }

    /// A participant-scoped write found its guard false at commit time.
    /// Work out from fresh state whether the caller lost its identity or the
    /// session moved on.
    async fn explain_participant_race(
        &self,
        ctx: &ParticipantContext,
        expected: SessionStatus,
        state_message: &str,
    ) -> CoreError {
        let participant = match self.store.find_participant(ctx.participant.id).await {
            Ok(p) => p,
            Err(e) => return storage(e),
        };
        if !participant.is_some_and(|p| p.is_active() && p.token_revoked_at.is_none()) {
            return CoreError::Unauthorized(INVALID_TOKEN.into());
        }

        let session = match self.store.find_session(ctx.session.id).await {
            Ok(s) => s,
            Err(e) => return storage(e),
        };
        match session {
            Some(s) if s.status == SessionStatus::Ended => {
                CoreError::Unauthorized(INVALID_TOKEN.into())
            }
            Some(s) if s.status != expected => CoreError::InvalidState(state_message.into()),
            Some(_) => CoreError::Conflict("Session changed concurrently, please retry".into()),
            None => CoreError::Unauthorized(INVALID_TOKEN.into()),
        }
    }
}
