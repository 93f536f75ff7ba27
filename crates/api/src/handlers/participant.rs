//! Handlers for the `/participant` resource. Every route requires the
//! `X-Participant-Token` header.

use axum::extract::State;
use axum::Json;
use cyberxercise_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::auth::AuthParticipant;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReadyRequest {
    pub is_ready: bool,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub participant_id: DbId,
    pub is_ready: bool,
}

#[derive(Debug, Deserialize)]
pub struct SubmitMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitMessageResponse {
    pub message_id: DbId,
    pub session_id: DbId,
    pub participant_id: DbId,
    pub content: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Serialize)]
pub struct LeaveResponse {
    pub participant_id: DbId,
    pub session_id: DbId,
    pub left_at: Timestamp,
}

/// POST /api/v1/participant/ready
pub async fn set_ready(
    State(state): State<AppState>,
    AuthParticipant(ctx): AuthParticipant,
    Json(input): Json<ReadyRequest>,
) -> AppResult<Json<ReadyResponse>> {
    let participant = state.engine.set_ready(&ctx, input.is_ready).await?;
    Ok(Json(ReadyResponse {
        participant_id: participant.id,
        is_ready: participant.is_ready,
    }))
}

/// POST /api/v1/participant/message
pub async fn submit_message(
    State(state): State<AppState>,
    AuthParticipant(ctx): AuthParticipant,
    Json(input): Json<SubmitMessageRequest>,
) -> AppResult<Json<SubmitMessageResponse>> {
    let message = state.engine.submit_message(&ctx, &input.content).await?;
    Ok(Json(SubmitMessageResponse {
        message_id: message.id,
        session_id: message.session_id,
        participant_id: message.participant_id,
        content: message.content,
        created_at: message.created_at,
    }))
}

/// POST /api/v1/participant/leave
///
/// Irreversible. The token stops working immediately.
pub async fn leave(
    State(state): State<AppState>,
    AuthParticipant(ctx): AuthParticipant,
) -> AppResult<Json<LeaveResponse>> {
    let left = state.engine.leave(&ctx).await?;
    Ok(Json(LeaveResponse {
        participant_id: left.participant_id,
        session_id: left.session_id,
        left_at: left.left_at,
    }))
}
