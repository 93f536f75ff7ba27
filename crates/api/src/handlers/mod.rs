//! Request handlers.
//!
//! Handlers parse input, delegate to the [`LifecycleEngine`] (or the store
//! for instructor accounts) and shape the JSON response. Errors are mapped
//! via [`AppError`].
//!
//! [`LifecycleEngine`]: crate::engine::LifecycleEngine
//! [`AppError`]: crate::error::AppError

pub mod auth;
pub mod join;
pub mod participant;
pub mod sessions;
