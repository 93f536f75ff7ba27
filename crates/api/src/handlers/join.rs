//! Handler for `POST /join`, the only unauthenticated participant action.

use axum::extract::State;
use axum::Json;
use cyberxercise_core::types::DbId;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    #[serde(alias = "team_id")]
    pub team_code: String,
    pub display_name: String,
}

/// The raw token appears here and nowhere else.
#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub participant_token: String,
    pub participant_id: DbId,
    pub session_id: DbId,
}

/// POST /api/v1/join
pub async fn join_session(
    State(state): State<AppState>,
    Json(input): Json<JoinRequest>,
) -> AppResult<Json<JoinResponse>> {
    let joined = state
        .engine
        .join_session(&input.team_code, &input.display_name)
        .await?;

    Ok(Json(JoinResponse {
        participant_token: joined.participant_token,
        participant_id: joined.participant_id,
        session_id: joined.session_id,
    }))
}
