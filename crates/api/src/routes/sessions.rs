//! Route definitions for the `/sessions` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::sessions;
use crate::state::AppState;

/// Routes mounted at `/sessions`.
///
/// ```text
/// POST /                   -> create_session
/// GET  /{id}               -> get_session
/// GET  /{id}/participants  -> list_participants
/// GET  /{id}/messages      -> list_messages
/// POST /{id}/start         -> start_session
/// POST /{id}/end           -> end_session
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(sessions::create_session))
        .route("/{id}", get(sessions::get_session))
        .route("/{id}/participants", get(sessions::list_participants))
        .route("/{id}/messages", get(sessions::list_messages))
        .route("/{id}/start", post(sessions::start_session))
        .route("/{id}/end", post(sessions::end_session))
}
