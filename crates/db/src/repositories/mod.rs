//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods that
//! accept any PostgreSQL executor (`&PgPool` or `&mut PgConnection` inside a
//! transaction) as the first argument.

pub mod exercise_session_repo;
pub mod instructor_repo;
pub mod message_repo;
pub mod participant_repo;

pub use exercise_session_repo::ExerciseSessionRepo;
pub use instructor_repo::InstructorRepo;
pub use message_repo::MessageRepo;
pub use participant_repo::ParticipantRepo;
