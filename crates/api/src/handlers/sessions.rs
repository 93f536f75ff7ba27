//! Handlers for the `/sessions` resource. All routes require the owning
//! instructor; other instructors see 404.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use cyberxercise_core::types::DbId;
use cyberxercise_core::validation::MAX_PARTICIPANTS;
use cyberxercise_db::models::exercise_session::ExerciseSession;
use cyberxercise_db::models::message::MessageWithSender;
use cyberxercise_db::models::participant::ParticipantResponse;
use cyberxercise_db::models::status::SessionStatus;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::auth::AuthInstructor;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /sessions`. The body itself is optional.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default = "default_max_participants")]
    pub max_participants: i32,
    #[serde(default)]
    pub duration_seconds: Option<i32>,
}

fn default_max_participants() -> i32 {
    MAX_PARTICIPANTS
}

impl Default for CreateSessionRequest {
    fn default() -> Self {
        Self {
            max_participants: default_max_participants(),
            duration_seconds: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionCreatedResponse {
    pub session_id: DbId,
    pub team_code: String,
    pub status: SessionStatus,
    pub max_participants: i32,
    pub duration_seconds: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ParticipantsListResponse {
    pub session_id: DbId,
    pub participants: Vec<ParticipantResponse>,
}

#[derive(Debug, Serialize)]
pub struct MessagesListResponse {
    pub session_id: DbId,
    pub messages: Vec<MessageWithSender>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/sessions
///
/// A request without a JSON body creates a session with default settings.
pub async fn create_session(
    State(state): State<AppState>,
    instructor: AuthInstructor,
    body: Option<Json<CreateSessionRequest>>,
) -> AppResult<(StatusCode, Json<SessionCreatedResponse>)> {
    let input = body.map(|Json(input)| input).unwrap_or_default();

    let session = state
        .engine
        .create_session(
            instructor.instructor_id,
            input.max_participants,
            input.duration_seconds,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionCreatedResponse {
            session_id: session.id,
            team_code: session.team_code,
            status: session.status,
            max_participants: session.max_participants,
            duration_seconds: session.duration_seconds,
        }),
    ))
}

/// GET /api/v1/sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    instructor: AuthInstructor,
    Path(session_id): Path<DbId>,
) -> AppResult<Json<ExerciseSession>> {
    let session = state
        .engine
        .owned_session(instructor.instructor_id, session_id)
        .await?;
    Ok(Json(session))
}

/// GET /api/v1/sessions/{id}/participants
///
/// Includes participants who have left, ordered by join time.
pub async fn list_participants(
    State(state): State<AppState>,
    instructor: AuthInstructor,
    Path(session_id): Path<DbId>,
) -> AppResult<Json<ParticipantsListResponse>> {
    let participants = state
        .engine
        .list_participants(instructor.instructor_id, session_id)
        .await?;
    Ok(Json(ParticipantsListResponse {
        session_id,
        participants: participants.iter().map(ParticipantResponse::from).collect(),
    }))
}

/// GET /api/v1/sessions/{id}/messages
pub async fn list_messages(
    State(state): State<AppState>,
    instructor: AuthInstructor,
    Path(session_id): Path<DbId>,
) -> AppResult<Json<MessagesListResponse>> {
    let messages = state
        .engine
        .list_messages(instructor.instructor_id, session_id)
        .await?;
    Ok(Json(MessagesListResponse {
        session_id,
        messages,
    }))
}

/// POST /api/v1/sessions/{id}/start
pub async fn start_session(
    State(state): State<AppState>,
    instructor: AuthInstructor,
    Path(session_id): Path<DbId>,
) -> AppResult<Json<ExerciseSession>> {
    let session = state
        .engine
        .start_session(instructor.instructor_id, session_id)
        .await?;
    Ok(Json(session))
}

/// POST /api/v1/sessions/{id}/end
pub async fn end_session(
    State(state): State<AppState>,
    instructor: AuthInstructor,
    Path(session_id): Path<DbId>,
) -> AppResult<Json<ExerciseSession>> {
    let session = state
        .engine
        .end_session(instructor.instructor_id, session_id)
        .await?;
    Ok(Json(session))
}
