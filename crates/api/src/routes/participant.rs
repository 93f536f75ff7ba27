//! Route definitions for the `/participant` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::participant;
use crate::state::AppState;

/// Routes mounted at `/participant`.
///
/// ```text
/// POST /ready    -> set_ready
/// POST /message  -> submit_message
/// POST /leave    -> leave
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ready", post(participant::set_ready))
        .route("/message", post(participant::submit_message))
        .route("/leave", post(participant::leave))
}
