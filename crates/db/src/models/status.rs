//! Lifecycle enums mapped to PostgreSQL enum types.

use serde::{Deserialize, Serialize};

/// Exercise session lifecycle status (`session_status` enum).
///
/// Transitions are strictly `Lobby -> Running -> Ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "session_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Lobby,
    Running,
    Ended,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Lobby => "lobby",
            SessionStatus::Running => "running",
            SessionStatus::Ended => "ended",
        }
    }

    /// Whether moving from `self` to `next` is a legal single step.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (SessionStatus::Lobby, SessionStatus::Running)
                | (SessionStatus::Running, SessionStatus::Ended)
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who ended a session (`session_ended_by` enum).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "session_ended_by", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EndedBy {
    Instructor,
    System,
}
