//! Instructor session endpoints.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{
    bearer, build_test_app, build_test_state, create_session, get, join_ok, participant_post,
    post_empty, post_json, seed_instructor, send,
};

#[tokio::test]
async fn create_session_with_defaults_and_explicit_values() {
    let state = build_test_state();
    let app = build_test_app(state.clone());
    let (_, token) = seed_instructor(&state, "coach").await;
    let auth = bearer(&token);

    // Empty body means defaults.
    let (status, json) = send(
        &app,
        post_empty("/api/v1/sessions", &[("authorization", &auth)]),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["status"], "lobby");
    assert_eq!(json["max_participants"], 10);
    assert!(json["duration_seconds"].is_null());
    assert_eq!(json["team_code"].as_str().unwrap().len(), 6);

    let (status, json) = send(
        &app,
        post_json(
            "/api/v1/sessions",
            &json!({"max_participants": 4, "duration_seconds": 900}),
            &[("authorization", &auth)],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["max_participants"], 4);
    assert_eq!(json["duration_seconds"], 900);
}

#[tokio::test]
async fn create_session_rejects_out_of_range_values() {
    let state = build_test_state();
    let app = build_test_app(state.clone());
    let (_, token) = seed_instructor(&state, "coach").await;
    let auth = bearer(&token);

    for body in [
        json!({"max_participants": 0}),
        json!({"max_participants": 11}),
        json!({"duration_seconds": 0}),
    ] {
        let (status, json) = send(
            &app,
            post_json("/api/v1/sessions", &body, &[("authorization", &auth)]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
        assert_eq!(json["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn session_endpoints_require_an_instructor() {
    let state = build_test_state();
    let app = build_test_app(state.clone());

    let (status, json) = send(&app, post_empty("/api/v1/sessions", &[])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Not authenticated");

    let (status, json) = send(&app, get("/api/v1/sessions/1", Some("garbage"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Invalid token");
}

#[tokio::test]
async fn other_instructors_see_not_found() {
    let state = build_test_state();
    let app = build_test_app(state.clone());
    let (_, owner) = seed_instructor(&state, "owner").await;
    let (_, intruder) = seed_instructor(&state, "intruder").await;
    let (session_id, _) = create_session(&app, &owner, json!({})).await;

    let (status, _) = send(&app, get(&format!("/api/v1/sessions/{session_id}"), Some(&owner))).await;
    assert_eq!(status, StatusCode::OK);

    for path in ["", "/participants", "/messages"] {
        let uri = format!("/api/v1/sessions/{session_id}{path}");
        let (status, json) = send(&app, get(&uri, Some(&intruder))).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "GET {uri}");
        assert_eq!(json["code"], "NOT_FOUND");
    }

    let intruder_auth = bearer(&intruder);
    let (status, _) = send(
        &app,
        post_empty(
            &format!("/api/v1/sessions/{session_id}/start"),
            &[("authorization", &intruder_auth)],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn start_and_end_follow_the_lifecycle() {
    let state = build_test_state();
    let app = build_test_app(state.clone());
    let (_, token) = seed_instructor(&state, "coach").await;
    let auth = bearer(&token);
    let (session_id, team_code) = create_session(&app, &token, json!({})).await;
    let start = format!("/api/v1/sessions/{session_id}/start");
    let end = format!("/api/v1/sessions/{session_id}/end");

    let (status, json) = send(&app, post_empty(&start, &[("authorization", &auth)])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_STATE");

    let (status, _) = send(&app, post_empty(&end, &[("authorization", &auth)])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let alice = join_ok(&app, &team_code, "alice").await;
    let (status, _) = participant_post(
        &app,
        "/api/v1/participant/ready",
        &alice,
        Some(json!({"is_ready": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, post_empty(&start, &[("authorization", &auth)])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "running");
    assert!(json["started_at"].is_string());

    let (status, _) = send(&app, post_empty(&start, &[("authorization", &auth)])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(&app, post_empty(&end, &[("authorization", &auth)])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ended");
    assert_eq!(json["ended_by"], "instructor");

    let (status, _) = send(&app, post_empty(&end, &[("authorization", &auth)])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn participant_and_message_listings() {
    let state = build_test_state();
    let app = build_test_app(state.clone());
    let (_, token) = seed_instructor(&state, "coach").await;
    let auth = bearer(&token);
    let (session_id, team_code) = create_session(&app, &token, json!({})).await;

    let alice = join_ok(&app, &team_code, "alice").await;
    let bob = join_ok(&app, &team_code, "bob").await;
    participant_post(&app, "/api/v1/participant/leave", &bob, None).await;

    let (status, json) = send(
        &app,
        get(&format!("/api/v1/sessions/{session_id}/participants"), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["session_id"], session_id);
    let participants = json["participants"].as_array().unwrap();
    assert_eq!(participants.len(), 2);
    assert_eq!(participants[0]["display_name"], "alice");
    assert!(participants[0]["left_at"].is_null());
    assert!(participants[1]["left_at"].is_string());
    assert!(participants[0].get("token_digest").is_none());

    participant_post(
        &app,
        "/api/v1/participant/ready",
        &alice,
        Some(json!({"is_ready": true})),
    )
    .await;
    send(
        &app,
        post_empty(
            &format!("/api/v1/sessions/{session_id}/start"),
            &[("authorization", &auth)],
        ),
    )
    .await;
    for content in ["first", "second"] {
        let (status, _) = participant_post(
            &app,
            "/api/v1/participant/message",
            &alice,
            Some(json!({"content": content})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, json) = send(
        &app,
        get(&format!("/api/v1/sessions/{session_id}/messages"), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let messages = json["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["content"], "first");
    assert_eq!(messages[1]["content"], "second");
    assert_eq!(messages[0]["display_name"], "alice");
}

#[tokio::test]
async fn malformed_create_body_is_rejected_by_the_json_extractor() {
    use axum::body::Body;
    use axum::http::Request;

    let state = build_test_state();
    let app = build_test_app(state.clone());
    let (_, token) = seed_instructor(&state, "coach").await;
    let auth = bearer(&token);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/sessions")
        .header("content-type", "application/json")
        .header("authorization", &auth)
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post_json(
            "/api/v1/sessions",
            &json!({"max_participants": "ten"}),
            &[("authorization", &auth)],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // A well-formed body still goes through.
    create_session(&app, &token, json!({"max_participants": 2})).await;
}
