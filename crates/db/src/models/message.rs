//! Message entity model and DTOs.

use cyberxercise_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `messages` table. Messages are immutable once created.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Message {
    pub id: DbId,
    pub session_id: DbId,
    pub participant_id: DbId,
    pub content: String,
    pub created_at: Timestamp,
}

/// A message joined with its sender's display name, for read-back.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MessageWithSender {
    pub id: DbId,
    pub participant_id: DbId,
    pub display_name: String,
    pub content: String,
    pub created_at: Timestamp,
}

/// DTO for submitting a message.
#[derive(Debug, Clone)]
pub struct CreateMessage {
    pub session_id: DbId,
    pub participant_id: DbId,
    pub content: String,
}
