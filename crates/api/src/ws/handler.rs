use std::sync::Arc;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use cyberxercise_core::error::CoreError;
use cyberxercise_core::types::DbId;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::auth::jwt::validate_token;
use crate::engine::ParticipantAuth;
use crate::middleware::auth::{bearer_token, PARTICIPANT_TOKEN_HEADER};
use crate::state::AppState;
use crate::ws::manager::{Role, WsManager};

#[derive(Debug, Deserialize)]
pub struct InstructorWsQuery {
    pub access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ParticipantWsQuery {
    pub token: Option<String>,
}

/// GET /api/v1/ws/instructor/{session_id}
///
/// The bearer token comes from the `Authorization` header or the
/// `access_token` query parameter (browsers cannot set headers on a
/// WebSocket handshake). Only the owning instructor is subscribed; anyone
/// else is upgraded and immediately closed with a policy-violation frame.
pub async fn instructor_ws_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<DbId>,
    Query(query): Query<InstructorWsQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let token = bearer_token(&headers)
        .map(str::to_owned)
        .or(query.access_token);

    ws.on_upgrade(move |socket| async move {
        if authorize_instructor(&state, token.as_deref(), session_id).await {
            handle_socket(socket, state.ws_manager, session_id, Role::Instructor).await;
        } else {
            reject(socket).await;
        }
    })
}

/// GET /api/v1/ws/participant/{team_code}
///
/// The participant token comes from the `token` query parameter or the
/// `X-Participant-Token` header. The path code is trimmed and uppercased
/// before it is checked against the token's session.
pub async fn participant_ws_handler(
    ws: WebSocketUpgrade,
    Path(team_code): Path<String>,
    Query(query): Query<ParticipantWsQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let token = query.token.or_else(|| {
        headers
            .get(PARTICIPANT_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    });

    ws.on_upgrade(move |socket| async move {
        match authorize_participant(&state, &team_code, token.as_deref()).await {
            Some(session_id) => {
                handle_socket(socket, state.ws_manager, session_id, Role::Participant).await
            }
            None => reject(socket).await,
        }
    })
}

/// Resolve the participant token against the channel's team code.
///
/// Runs inside the upgrade callback, directly before registration, so a
/// participant who left or whose session ended during the handshake is
/// refused rather than subscribed.
async fn authorize_participant(
    state: &AppState,
    team_code: &str,
    token: Option<&str>,
) -> Option<DbId> {
    match state
        .engine
        .authorize_participant_channel(team_code, token)
        .await
    {
        Ok(ParticipantAuth::Authenticated(ctx)) => Some(ctx.session.id),
        Ok(ParticipantAuth::Rejected(reason)) => {
            tracing::debug!(?reason, "Participant channel rejected");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "Participant channel authorization failed");
            None
        }
    }
}

async fn authorize_instructor(state: &AppState, token: Option<&str>, session_id: DbId) -> bool {
    let Some(token) = token else {
        return false;
    };
    let Ok(claims) = validate_token(token, &state.config.jwt) else {
        return false;
    };
    match state.store.find_instructor_by_id(claims.sub).await {
        Ok(Some(_)) => {}
        Ok(None) => return false,
        Err(e) => {
            tracing::error!(error = %e, "Instructor lookup failed");
            return false;
        }
    }
    match state.engine.owned_session(claims.sub, session_id).await {
        Ok(_) => true,
        Err(CoreError::NotFound { .. }) => false,
        Err(e) => {
            tracing::error!(error = %e, "Instructor channel authorization failed");
            false
        }
    }
}

/// Close an unauthorized socket with code 1008 (policy violation).
async fn reject(mut socket: WebSocket) {
    let frame = CloseFrame {
        code: close_code::POLICY,
        reason: "Not authorized".into(),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}

/// Manage a single authorized WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection under its session with `WsManager`.
///   2. Spawns a sender task that forwards messages from the manager channel.
///   3. Drains inbound frames on the current task (the channel is push-only).
///   4. Unregisters on disconnect.
async fn handle_socket(socket: WebSocket, ws_manager: Arc<WsManager>, session_id: DbId, role: Role) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, session_id, ?role, "WebSocket connected");

    let mut rx = ws_manager.add(session_id, conn_id.clone(), role).await;

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    ws_manager.remove(session_id, &conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, session_id, "WebSocket disconnected");
}
