//! Domain primitives shared by the storage and API layers.
//!
//! This crate has zero internal dependencies so that every other crate in
//! the workspace can use it:
//!
//! - [`error`] -- the domain error taxonomy.
//! - [`types`] -- id and timestamp aliases.
//! - [`team_code`] -- human-enterable session codes.
//! - [`participant_token`] -- opaque participant tokens and their keyed digests.
//! - [`validation`] -- input limits for sessions, participants and messages.

pub mod error;
pub mod participant_token;
pub mod team_code;
pub mod types;
pub mod validation;
