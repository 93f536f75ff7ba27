//! Handlers for the `/auth` resource (login, register).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use cyberxercise_core::error::CoreError;
use cyberxercise_core::types::DbId;
use cyberxercise_core::validation::{validate_new_password, validate_username};
use cyberxercise_db::models::instructor::CreateInstructor;
use cyberxercise_db::store::constraints;
use serde::{Deserialize, Serialize};

use crate::auth::jwt::generate_access_token;
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login` and `POST /auth/register`.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct InstructorResponse {
    pub id: DbId,
    pub username: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
///
/// Exchange instructor credentials for an access token. Unknown usernames
/// and wrong passwords are indistinguishable to the caller.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<Credentials>,
) -> AppResult<Json<TokenResponse>> {
    let invalid = || AppError::Core(CoreError::Unauthorized("Invalid credentials".into()));

    let instructor = state
        .store
        .find_instructor_by_username(&input.username)
        .await?
        .ok_or_else(invalid)?;

    let password_valid = verify_password(&input.password, &instructor.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        tracing::info!(username = %input.username, "Failed instructor login");
        return Err(invalid());
    }

    let access_token = generate_access_token(instructor.id, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    tracing::info!(instructor_id = instructor.id, "Instructor logged in");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
        expires_in: state.config.jwt.access_token_ttl_secs,
    }))
}

/// POST /api/v1/auth/register
///
/// Create an instructor account. Only exposed when
/// `ALLOW_INSTRUCTOR_REGISTER` is enabled; otherwise behaves like an
/// unknown route.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<Credentials>,
) -> AppResult<(StatusCode, Json<InstructorResponse>)> {
    if !state.config.allow_instructor_register {
        return Err(AppError::NotFound("Not found".into()));
    }

    validate_username(&input.username)?;
    validate_new_password(&input.password)?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let created = state
        .store
        .create_instructor(&CreateInstructor {
            username: input.username,
            password_hash,
        })
        .await;
    let instructor = match created {
        Ok(instructor) => instructor,
        Err(e) if e.is_unique_violation(constraints::UQ_INSTRUCTORS_USERNAME) => {
            return Err(AppError::Core(CoreError::Conflict(
                "Username already exists".into(),
            )));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(instructor_id = instructor.id, "Instructor registered");
    Ok((
        StatusCode::CREATED,
        Json(InstructorResponse {
            id: instructor.id,
            username: instructor.username,
        }),
    ))
}
