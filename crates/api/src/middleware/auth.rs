//! Extractors that resolve the caller's identity for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use cyberxercise_core::error::CoreError;
use cyberxercise_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::engine::{ParticipantAuth, ParticipantContext};
use crate::error::AppError;
use crate::state::AppState;

/// Header carrying a participant's opaque token.
pub const PARTICIPANT_TOKEN_HEADER: &str = "x-participant-token";

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get("authorization")?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}

/// Authenticated instructor extracted from a JWT Bearer token.
///
/// The instructor must still exist; a valid token for a deleted account is
/// rejected.
///
/// ```ignore
/// async fn my_handler(instructor: AuthInstructor) -> AppResult<Json<()>> {
///     tracing::info!(instructor_id = instructor.instructor_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthInstructor {
    /// The instructor's internal database id (from `claims.sub`).
    pub instructor_id: DbId,
}

impl FromRequestParts<AppState> for AuthInstructor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Not authenticated".into()))
        })?;

        let claims = validate_token(token, &state.config.jwt)
            .map_err(|_| AppError::Core(CoreError::Unauthorized("Invalid token".into())))?;

        state
            .store
            .find_instructor_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::Core(CoreError::Unauthorized("Invalid token".into())))?;

        Ok(AuthInstructor {
            instructor_id: claims.sub,
        })
    }
}

/// Authenticated participant extracted from the `X-Participant-Token` header.
///
/// Rejected with 401 when the token is missing, unknown, revoked, belongs to
/// someone who left, or the session has ended.
#[derive(Debug, Clone)]
pub struct AuthParticipant(pub ParticipantContext);

impl FromRequestParts<AppState> for AuthParticipant {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(PARTICIPANT_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok());

        match state.engine.authenticate_participant(token).await? {
            ParticipantAuth::Authenticated(ctx) => Ok(AuthParticipant(ctx)),
            ParticipantAuth::Rejected(reason) => {
                tracing::debug!(?reason, "Participant token rejected");
                Err(AppError::Core(CoreError::Unauthorized(
                    reason.message().into(),
                )))
            }
        }
    }
}
