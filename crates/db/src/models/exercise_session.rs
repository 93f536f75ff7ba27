//! Exercise session entity model and DTOs.

use cyberxercise_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::{EndedBy, SessionStatus};

/// A row from the `exercise_sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExerciseSession {
    pub id: DbId,
    pub instructor_id: DbId,
    pub team_code: String,
    pub status: SessionStatus,
    pub max_participants: i32,
    pub duration_seconds: Option<i32>,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
    pub ended_by: Option<EndedBy>,
    pub created_at: Timestamp,
}

impl ExerciseSession {
    /// When a running session with a duration is due to end.
    pub fn expires_at(&self) -> Option<Timestamp> {
        let started_at = self.started_at?;
        let secs = self.duration_seconds?;
        Some(started_at + chrono::Duration::seconds(i64::from(secs)))
    }

    pub fn is_owned_by(&self, instructor_id: DbId) -> bool {
        self.instructor_id == instructor_id
    }
}

/// DTO for creating a new session in the `lobby` state.
#[derive(Debug, Clone)]
pub struct CreateExerciseSession {
    pub instructor_id: DbId,
    pub team_code: String,
    pub max_participants: i32,
    pub duration_seconds: Option<i32>,
}
