pub mod auth;
pub mod health;
pub mod participant;
pub mod sessions;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                          login (public)
/// /auth/register                       register (public, when enabled)
///
/// /sessions                            create (instructor)
/// /sessions/{id}                       detail (owner)
/// /sessions/{id}/participants          list participants (owner)
/// /sessions/{id}/messages              list messages (owner)
/// /sessions/{id}/start                 start (owner, POST)
/// /sessions/{id}/end                   end (owner, POST)
///
/// /join                                join a lobby (public, POST)
///
/// /participant/ready                   set readiness (participant token)
/// /participant/message                 submit a message (participant token)
/// /participant/leave                   leave the session (participant token)
///
/// /ws/instructor/{session_id}          instructor event stream
/// /ws/participant/{team_code}          participant event stream
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/sessions", sessions::router())
        .nest("/participant", participant::router())
        .route("/join", post(handlers::join::join_session))
        .route("/ws/instructor/{session_id}", get(ws::instructor_ws_handler))
        .route("/ws/participant/{team_code}", get(ws::participant_ws_handler))
}
