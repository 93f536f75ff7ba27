//! Instructor entity model and DTOs.

use cyberxercise_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// Full instructor row from the `instructors` table.
///
/// Contains the password hash -- NEVER serialize this to API responses directly.
#[derive(Debug, Clone, FromRow)]
pub struct Instructor {
    pub id: DbId,
    pub username: String,
    pub password_hash: String,
    pub created_at: Timestamp,
}

/// DTO for registering a new instructor.
#[derive(Debug, Clone)]
pub struct CreateInstructor {
    pub username: String,
    pub password_hash: String,
}
