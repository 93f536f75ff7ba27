//! Authentication extractors.
//!
//! - [`auth::AuthInstructor`] -- an instructor identified by a JWT Bearer token.
//! - [`auth::AuthParticipant`] -- a participant identified by an opaque token.

pub mod auth;
