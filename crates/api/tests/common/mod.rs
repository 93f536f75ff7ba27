#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use cyberxercise_api::auth::jwt::{generate_access_token, JwtConfig};
use cyberxercise_api::config::ServerConfig;
use cyberxercise_api::engine::{Broadcaster, EngineConfig, LifecycleEngine, SessionEvent};
use cyberxercise_api::router::build_app_router;
use cyberxercise_api::state::AppState;
use cyberxercise_core::types::DbId;
use cyberxercise_db::models::instructor::CreateInstructor;
use cyberxercise_db::store::{MemorySessionStore, SessionStore};

pub const PEPPER: &str = "test-pepper";

/// Build a test `ServerConfig` with safe defaults and registration enabled.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            issuer: "cyberxercise".to_string(),
            audience: "cyberxercise-api".to_string(),
            access_token_ttl_secs: 3600,
        },
        participant_token_pepper: PEPPER.to_string(),
        allow_instructor_register: true,
        team_code_max_attempts: 10,
        session_expiry_interval_secs: 1,
        database_url: None,
    }
}

/// Application state backed by a fresh in-memory store.
pub fn build_test_state() -> AppState {
    build_test_state_with(test_config())
}

pub fn build_test_state_with(config: ServerConfig) -> AppState {
    AppState::new(Arc::new(MemorySessionStore::new()), config)
}

/// Build the full application router with all middleware layers.
///
/// Uses the same builder as `main.rs`, so integration tests exercise the
/// production middleware stack.
pub fn build_test_app(state: AppState) -> Router {
    build_app_router(state).expect("test config is valid")
}

/// Create an instructor directly in the store and mint an access token.
pub async fn seed_instructor(state: &AppState, username: &str) -> (DbId, String) {
    let instructor = state
        .store
        .create_instructor(&CreateInstructor {
            username: username.to_string(),
            password_hash: "not-used-by-these-tests".to_string(),
        })
        .await
        .expect("seed instructor");
    let token = generate_access_token(instructor.id, &state.config.jwt).expect("mint token");
    (instructor.id, token)
}

// ---------------------------------------------------------------------------
// Engine fixtures
// ---------------------------------------------------------------------------

/// Broadcaster that records every event instead of delivering it.
#[derive(Default)]
pub struct RecordingBroadcaster {
    events: Mutex<Vec<(DbId, SessionEvent)>>,
}

impl RecordingBroadcaster {
    pub fn events(&self) -> Vec<(DbId, SessionEvent)> {
        self.events.lock().unwrap().clone()
    }

    pub fn event_types(&self, session_id: DbId) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == session_id)
            .map(|(_, e)| e.event_type())
            .collect()
    }
}

#[async_trait]
impl Broadcaster for RecordingBroadcaster {
    async fn broadcast(&self, session_id: DbId, event: SessionEvent) {
        self.events.lock().unwrap().push((session_id, event));
    }
}

pub struct EngineFixture {
    pub engine: Arc<LifecycleEngine>,
    pub store: Arc<MemorySessionStore>,
    pub events: Arc<RecordingBroadcaster>,
    pub instructor_id: DbId,
}

pub async fn engine_fixture() -> EngineFixture {
    let store = Arc::new(MemorySessionStore::new());
    let events = Arc::new(RecordingBroadcaster::default());
    let engine = LifecycleEngine::new(
        store.clone(),
        events.clone(),
        EngineConfig {
            participant_token_pepper: PEPPER.to_string(),
            team_code_max_attempts: 10,
        },
    );
    let instructor_id = store
        .create_instructor(&CreateInstructor {
            username: "instructor".into(),
            password_hash: "hash".into(),
        })
        .await
        .expect("seed instructor")
        .id;

    EngineFixture {
        engine: Arc::new(engine),
        store,
        events,
        instructor_id,
    }
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Send a request and return the status with the parsed JSON body
/// (`Value::Null` for an empty body).
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

pub fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &Value, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn post_empty(uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

// ---------------------------------------------------------------------------
// Flow helpers
// ---------------------------------------------------------------------------

/// Create a session over HTTP; returns `(session_id, team_code)`.
pub async fn create_session(app: &Router, token: &str, body: Value) -> (DbId, String) {
    let auth = bearer(token);
    let (status, json) = send(
        app,
        post_json("/api/v1/sessions", &body, &[("authorization", &auth)]),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create session failed: {json}");
    (
        json["session_id"].as_i64().unwrap(),
        json["team_code"].as_str().unwrap().to_string(),
    )
}

/// Join over HTTP; returns the raw participant token.
pub async fn join(app: &Router, team_code: &str, name: &str) -> (StatusCode, Value) {
    send(
        app,
        post_json(
            "/api/v1/join",
            &serde_json::json!({"team_code": team_code, "display_name": name}),
            &[],
        ),
    )
    .await
}

pub async fn join_ok(app: &Router, team_code: &str, name: &str) -> String {
    let (status, json) = join(app, team_code, name).await;
    assert_eq!(status, StatusCode::OK, "join failed: {json}");
    json["participant_token"].as_str().unwrap().to_string()
}

pub async fn participant_post(
    app: &Router,
    path: &str,
    token: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let headers = [("x-participant-token", token)];
    let request = match body {
        Some(body) => post_json(path, &body, &headers),
        None => post_empty(path, &headers),
    };
    send(app, request).await
}
