//! End-to-end realtime channel tests over a real socket.

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use cyberxercise_api::state::AppState;
use cyberxercise_api::ws::Role;
use cyberxercise_core::types::DbId;
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use common::{
    bearer, build_test_app, build_test_state, create_session, join_ok, participant_post,
    post_empty, seed_instructor, send,
};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect(url: String) -> Client {
    let (client, _) = connect_async(url).await.expect("websocket handshake");
    client
}

/// Registration happens after the upgrade completes; wait for it.
async fn wait_for_subscribers(state: &AppState, session_id: DbId, role: Role, expected: usize) {
    for _ in 0..100 {
        if state.ws_manager.session_connection_count(session_id, Some(role)).await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("subscriber count for session {session_id} never reached {expected}");
}

/// Next JSON event, skipping control frames.
async fn next_event(client: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for an event")
            .expect("stream ended")
            .expect("websocket error");
        match frame {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn expect_policy_close(client: &mut Client) {
    let frame = tokio::time::timeout(Duration::from_secs(2), client.next())
        .await
        .expect("timed out waiting for close")
        .expect("stream ended")
        .expect("websocket error");
    match frame {
        Message::Close(Some(close)) => assert_eq!(close.code, CloseCode::Policy),
        other => panic!("expected a close frame, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Event fan-out
// ---------------------------------------------------------------------------

#[tokio::test]
async fn instructor_and_participants_receive_session_events() {
    let state = build_test_state();
    let app = build_test_app(state.clone());
    let addr = spawn_server(app.clone()).await;

    let (_, token) = seed_instructor(&state, "coach").await;
    let auth = bearer(&token);
    let (session_id, team_code) = create_session(&app, &token, json!({})).await;

    let mut instructor = connect(format!(
        "ws://{addr}/api/v1/ws/instructor/{session_id}?access_token={token}"
    ))
    .await;
    wait_for_subscribers(&state, session_id, Role::Instructor, 1).await;

    let alice = join_ok(&app, &team_code, "alice").await;
    let event = next_event(&mut instructor).await;
    assert_eq!(event["type"], "participant_joined");
    assert_eq!(event["data"]["participant"]["display_name"], "alice");
    assert_eq!(event["data"]["participant"]["is_ready"], false);

    let mut participant = connect(format!(
        "ws://{addr}/api/v1/ws/participant/{}?token={alice}",
        team_code.to_lowercase()
    ))
    .await;
    wait_for_subscribers(&state, session_id, Role::Participant, 1).await;

    participant_post(
        &app,
        "/api/v1/participant/ready",
        &alice,
        Some(json!({"is_ready": true})),
    )
    .await;
    for client in [&mut instructor, &mut participant] {
        let event = next_event(client).await;
        assert_eq!(event["type"], "participant_ready_changed");
        assert_eq!(event["data"]["participant"]["is_ready"], true);
    }

    let (status, _) = send(
        &app,
        post_empty(
            &format!("/api/v1/sessions/{session_id}/start"),
            &[("authorization", &auth)],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    for client in [&mut instructor, &mut participant] {
        let event = next_event(client).await;
        assert_eq!(event["type"], "session_started");
        assert_eq!(event["data"]["session"]["status"], "running");
    }

    participant_post(
        &app,
        "/api/v1/participant/message",
        &alice,
        Some(json!({"content": "flag{ws}"})),
    )
    .await;
    for client in [&mut instructor, &mut participant] {
        let event = next_event(client).await;
        assert_eq!(event["type"], "message_submitted");
        assert_eq!(event["data"]["message"]["content"], "flag{ws}");
        assert_eq!(event["data"]["participant"]["display_name"], "alice");
    }

    send(
        &app,
        post_empty(
            &format!("/api/v1/sessions/{session_id}/end"),
            &[("authorization", &auth)],
        ),
    )
    .await;
    for client in [&mut instructor, &mut participant] {
        let event = next_event(client).await;
        assert_eq!(event["type"], "session_ended");
        assert_eq!(event["data"]["session"]["ended_by"], "instructor");
    }
}

#[tokio::test]
async fn events_stay_within_their_session() {
    let state = build_test_state();
    let app = build_test_app(state.clone());
    let addr = spawn_server(app.clone()).await;

    let (_, token) = seed_instructor(&state, "coach").await;
    let (first_id, _) = create_session(&app, &token, json!({})).await;
    let (_, second_code) = create_session(&app, &token, json!({})).await;

    let mut instructor = connect(format!(
        "ws://{addr}/api/v1/ws/instructor/{first_id}?access_token={token}"
    ))
    .await;
    wait_for_subscribers(&state, first_id, Role::Instructor, 1).await;

    join_ok(&app, &second_code, "elsewhere").await;

    let quiet = tokio::time::timeout(Duration::from_millis(200), instructor.next()).await;
    assert!(quiet.is_err(), "received an event from another session");
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unauthorized_channels_close_with_policy_violation() {
    let state = build_test_state();
    let app = build_test_app(state.clone());
    let addr = spawn_server(app.clone()).await;

    let (_, owner) = seed_instructor(&state, "owner").await;
    let (_, intruder) = seed_instructor(&state, "intruder").await;
    let (session_id, team_code) = create_session(&app, &owner, json!({})).await;
    let (_, other_code) = create_session(&app, &owner, json!({})).await;
    let alice = join_ok(&app, &team_code, "alice").await;

    let urls = [
        format!("ws://{addr}/api/v1/ws/instructor/{session_id}"),
        format!("ws://{addr}/api/v1/ws/instructor/{session_id}?access_token=garbage"),
        format!("ws://{addr}/api/v1/ws/instructor/{session_id}?access_token={intruder}"),
        format!("ws://{addr}/api/v1/ws/participant/{team_code}"),
        format!("ws://{addr}/api/v1/ws/participant/{team_code}?token=forged"),
        format!("ws://{addr}/api/v1/ws/participant/{other_code}?token={alice}"),
    ];
    for url in urls {
        let mut client = connect(url).await;
        expect_policy_close(&mut client).await;
    }

    assert_eq!(state.ws_manager.connection_count().await, 0);
}

#[tokio::test]
async fn departed_and_ended_participants_cannot_subscribe() {
    let state = build_test_state();
    let app = build_test_app(state.clone());
    let addr = spawn_server(app.clone()).await;

    let (_, token) = seed_instructor(&state, "coach").await;
    let auth = bearer(&token);
    let (session_id, team_code) = create_session(&app, &token, json!({})).await;
    let leaver = join_ok(&app, &team_code, "leaver").await;
    let stayer = join_ok(&app, &team_code, "stayer").await;

    participant_post(&app, "/api/v1/participant/leave", &leaver, None).await;
    let mut client = connect(format!(
        "ws://{addr}/api/v1/ws/participant/{team_code}?token={leaver}"
    ))
    .await;
    expect_policy_close(&mut client).await;

    participant_post(
        &app,
        "/api/v1/participant/ready",
        &stayer,
        Some(json!({"is_ready": true})),
    )
    .await;
    for action in ["start", "end"] {
        let (status, _) = send(
            &app,
            post_empty(
                &format!("/api/v1/sessions/{session_id}/{action}"),
                &[("authorization", &auth)],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let mut client = connect(format!(
        "ws://{addr}/api/v1/ws/participant/{team_code}?token={stayer}"
    ))
    .await;
    expect_policy_close(&mut client).await;

    assert_eq!(
        state
            .ws_manager
            .session_connection_count(session_id, Some(Role::Participant))
            .await,
        0
    );
}

#[tokio::test]
async fn participant_token_in_header_is_accepted() {
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;

    let state = build_test_state();
    let app = build_test_app(state.clone());
    let addr = spawn_server(app.clone()).await;

    let (_, token) = seed_instructor(&state, "coach").await;
    let (session_id, team_code) = create_session(&app, &token, json!({})).await;
    let alice = join_ok(&app, &team_code, "alice").await;

    let mut request = format!("ws://{addr}/api/v1/ws/participant/{team_code}")
        .into_client_request()
        .unwrap();
    request
        .headers_mut()
        .insert("x-participant-token", alice.parse().unwrap());
    let (_client, _) = connect_async(request).await.unwrap();

    wait_for_subscribers(&state, session_id, Role::Participant, 1).await;
}
