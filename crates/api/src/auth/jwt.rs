//! JWT access-token generation and validation for instructors.
//!
//! Access tokens are HS256-signed JWTs containing a [`Claims`] payload bound
//! to a configured issuer and audience. There are no refresh tokens; clients
//! log in again once the token expires.

use cyberxercise_core::types::DbId;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{parse_or, required, ConfigError};

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the instructor's internal database id.
    pub sub: DbId,
    pub iss: String,
    pub aud: String,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier (UUID v4) for audit.
    pub jti: String,
}

/// Configuration for JWT token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    /// Access token lifetime in seconds (default: 3600).
    pub access_token_ttl_secs: i64,
}

/// Default access token lifetime in seconds.
const DEFAULT_ACCESS_TTL_SECS: i64 = 3600;

impl JwtConfig {
    /// Load JWT configuration through a key lookup.
    ///
    /// | Env Var               | Required | Default            |
    /// |-----------------------|----------|--------------------|
    /// | `JWT_SECRET`          | **yes**  | --                 |
    /// | `JWT_ISSUER`          | no       | `cyberxercise`     |
    /// | `JWT_AUDIENCE`        | no       | `cyberxercise-api` |
    /// | `JWT_ACCESS_TTL_SECS` | no       | `3600`             |
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = required(lookup, "JWT_SECRET")?;
        let issuer = lookup("JWT_ISSUER").unwrap_or_else(|| "cyberxercise".into());
        let audience = lookup("JWT_AUDIENCE").unwrap_or_else(|| "cyberxercise-api".into());
        let access_token_ttl_secs =
            parse_or(lookup, "JWT_ACCESS_TTL_SECS", DEFAULT_ACCESS_TTL_SECS)?;
        if access_token_ttl_secs <= 0 {
            return Err(ConfigError::Invalid {
                name: "JWT_ACCESS_TTL_SECS",
                reason: "must be positive".into(),
            });
        }

        Ok(Self {
            secret,
            issuer,
            audience,
            access_token_ttl_secs,
        })
    }
}

/// Generate an HS256 access token for the given instructor.
pub fn generate_access_token(
    instructor_id: DbId,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();

    let claims = Claims {
        sub: instructor_id,
        iss: config.issuer.clone(),
        aud: config.audience.clone(),
        exp: now + config.access_token_ttl_secs,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Validate and decode an access token, returning the embedded [`Claims`].
///
/// Checks the signature, expiration, issuer and audience.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);
    validation.set_audience(&[&config.audience]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;
    Ok(token_data.claims)
}
