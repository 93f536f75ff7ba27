//! Participant identity resolution.
//!
//! A presented token is digested with the pepper and looked up. The outcome
//! is an explicit [`ParticipantAuth`]; callers decide how a rejection is
//! surfaced (401 over HTTP, close code 1008 on a realtime channel).

use cyberxercise_core::participant_token::digest_participant_token;
use cyberxercise_db::models::exercise_session::ExerciseSession;
use cyberxercise_db::models::participant::Participant;
use cyberxercise_db::models::status::SessionStatus;
use cyberxercise_db::store::{SessionStore, StoreError};

/// An admitted participant together with the session it belongs to.
#[derive(Debug, Clone)]
pub struct ParticipantContext {
    pub participant: Participant,
    pub session: ExerciseSession,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    MissingToken,
    UnknownToken,
    Revoked,
    Left,
    SessionEnded,
    /// The token is valid but belongs to a different session than the one
    /// requested.
    WrongSession,
}

impl AuthRejection {
    /// Client-facing message; only a missing token is distinguished.
    pub fn message(self) -> &'static str {
        match self {
            AuthRejection::MissingToken => "Not authenticated",
            _ => "Invalid token",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ParticipantAuth {
    Authenticated(ParticipantContext),
    Rejected(AuthRejection),
}

pub(crate) async fn resolve_participant(
    store: &dyn SessionStore,
    pepper: &str,
    token: Option<&str>,
) -> Result<ParticipantAuth, StoreError> {
    let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(ParticipantAuth::Rejected(AuthRejection::MissingToken));
    };

    let digest = digest_participant_token(token, pepper);
    let Some(participant) = store.find_participant_by_token_digest(&digest).await? else {
        return Ok(ParticipantAuth::Rejected(AuthRejection::UnknownToken));
    };

    if participant.token_revoked_at.is_some() {
        return Ok(ParticipantAuth::Rejected(AuthRejection::Revoked));
    }
    if participant.left_at.is_some() {
        return Ok(ParticipantAuth::Rejected(AuthRejection::Left));
    }

    // A participant row always references a session; a dangling one is
    // treated like an unknown token.
    let Some(session) = store.find_session(participant.session_id).await? else {
        return Ok(ParticipantAuth::Rejected(AuthRejection::UnknownToken));
    };
    if session.status == SessionStatus::Ended {
        return Ok(ParticipantAuth::Rejected(AuthRejection::SessionEnded));
    }

    Ok(ParticipantAuth::Authenticated(ParticipantContext {
        participant,
        session,
    }))
}
