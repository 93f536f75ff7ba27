//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - A create DTO for inserts
//! - A `Serialize` projection where the row holds secrets

pub mod exercise_session;
pub mod instructor;
pub mod message;
pub mod participant;
pub mod status;
