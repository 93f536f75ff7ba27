//! Repository for the `instructors` table.

use cyberxercise_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::instructor::{CreateInstructor, Instructor};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, username, password_hash, created_at";

/// Provides CRUD operations for instructors.
pub struct InstructorRepo;

impl InstructorRepo {
    /// Insert a new instructor, returning the created row.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        input: &CreateInstructor,
    ) -> Result<Instructor, sqlx::Error> {
        let query = format!(
            "INSERT INTO instructors (username, password_hash)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Instructor>(&query)
            .bind(&input.username)
            .bind(&input.password_hash)
            .fetch_one(executor)
            .await
    }

    /// Find an instructor by internal ID.
    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<Instructor>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM instructors WHERE id = $1");
        sqlx::query_as::<_, Instructor>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find an instructor by username (case-sensitive).
    pub async fn find_by_username<'e>(
        executor: impl PgExecutor<'e>,
        username: &str,
    ) -> Result<Option<Instructor>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM instructors WHERE username = $1");
        sqlx::query_as::<_, Instructor>(&query)
            .bind(username)
            .fetch_optional(executor)
            .await
    }
}
