//! Participant entity model and DTOs.

use cyberxercise_core::participant_token::TokenDigest;
use cyberxercise_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `participants` table.
///
/// Holds the token digest -- use [`ParticipantResponse`] for external output.
#[derive(Debug, Clone, FromRow)]
pub struct Participant {
    pub id: DbId,
    pub session_id: DbId,
    pub display_name: String,
    pub is_ready: bool,
    pub token_digest: Vec<u8>,
    pub token_revoked_at: Option<Timestamp>,
    pub joined_at: Timestamp,
    pub left_at: Option<Timestamp>,
}

impl Participant {
    /// Active participants count toward capacity and readiness.
    pub fn is_active(&self) -> bool {
        self.left_at.is_none()
    }
}

/// Participant projection for instructor listings.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantResponse {
    pub id: DbId,
    pub display_name: String,
    pub is_ready: bool,
    pub joined_at: Timestamp,
    pub left_at: Option<Timestamp>,
}

impl From<&Participant> for ParticipantResponse {
    fn from(p: &Participant) -> Self {
        Self {
            id: p.id,
            display_name: p.display_name.clone(),
            is_ready: p.is_ready,
            joined_at: p.joined_at,
            left_at: p.left_at,
        }
    }
}

/// DTO for admitting a participant into a lobby.
#[derive(Debug, Clone)]
pub struct CreateParticipant {
    pub session_id: DbId,
    pub display_name: String,
    pub token_digest: TokenDigest,
}
