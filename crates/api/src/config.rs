use std::str::FromStr;

use crate::auth::jwt::JwtConfig;

/// Floor for the team-code allocation retry budget.
pub const MIN_TEAM_CODE_ATTEMPTS: u32 = 10;

/// Errors raised while reading configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Server configuration loaded from environment variables.
///
/// Everything except the two secrets has a default suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on post-shutdown cleanup in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Instructor access-token settings.
    pub jwt: JwtConfig,
    /// Key for participant token digests. Rotating it invalidates every
    /// outstanding participant token.
    pub participant_token_pepper: String,
    /// Exposes `POST /auth/register` when set. Development only.
    pub allow_instructor_register: bool,
    /// Team-code allocation attempts before giving up (never below 10).
    pub team_code_max_attempts: u32,
    /// How often the expiry sweeper looks for overdue sessions.
    pub session_expiry_interval_secs: u64,
    /// PostgreSQL URL. `None` selects the in-memory store.
    pub database_url: Option<String>,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                        | Default                 |
    /// |--------------------------------|-------------------------|
    /// | `HOST`                         | `0.0.0.0`               |
    /// | `PORT`                         | `3000`                  |
    /// | `CORS_ORIGINS`                 | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`         | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`        | `30`                    |
    /// | `PARTICIPANT_TOKEN_PEPPER`     | **required**            |
    /// | `ALLOW_INSTRUCTOR_REGISTER`    | `false`                 |
    /// | `TEAM_CODE_MAX_ATTEMPTS`       | `10`                    |
    /// | `SESSION_EXPIRY_INTERVAL_SECS` | `5`                     |
    /// | `DATABASE_URL`                 | unset (in-memory store) |
    ///
    /// JWT variables are documented on [`JwtConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_or(&lookup, "PORT", 3000)?;

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?;
        let shutdown_timeout_secs = parse_or(&lookup, "SHUTDOWN_TIMEOUT_SECS", 30)?;

        let jwt = JwtConfig::from_lookup(&lookup)?;
        let participant_token_pepper = required(&lookup, "PARTICIPANT_TOKEN_PEPPER")?;

        let allow_instructor_register = match lookup("ALLOW_INSTRUCTOR_REGISTER") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid {
                name: "ALLOW_INSTRUCTOR_REGISTER",
                reason: format!("expected a boolean, got '{raw}'"),
            })?,
            None => false,
        };

        let team_code_max_attempts: u32 =
            parse_or(&lookup, "TEAM_CODE_MAX_ATTEMPTS", MIN_TEAM_CODE_ATTEMPTS)?;
        let session_expiry_interval_secs: u64 =
            parse_or(&lookup, "SESSION_EXPIRY_INTERVAL_SECS", 5)?;
        if session_expiry_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "SESSION_EXPIRY_INTERVAL_SECS",
                reason: "must be at least 1".into(),
            });
        }

        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt,
            participant_token_pepper,
            allow_instructor_register,
            team_code_max_attempts: team_code_max_attempts.max(MIN_TEAM_CODE_ATTEMPTS),
            session_expiry_interval_secs,
            database_url,
        })
    }
}

/// Read a variable that must be present and non-empty.
pub(crate) fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

/// Parse a variable, falling back to `default` when unset.
pub(crate) fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
