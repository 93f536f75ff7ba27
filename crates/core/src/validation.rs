//! Input limits for sessions, participants, messages and instructor accounts.

use crate::error::CoreError;
use crate::team_code::is_valid_team_code;

/// Smallest allowed `max_participants`.
pub const MIN_PARTICIPANTS: i32 = 1;

/// Largest allowed `max_participants`, also the default.
pub const MAX_PARTICIPANTS: i32 = 10;

/// Maximum display name length in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 64;

/// Maximum message length in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Maximum instructor username length in characters.
pub const MAX_USERNAME_CHARS: usize = 255;

/// Minimum length for a newly registered instructor password.
pub const MIN_PASSWORD_CHARS: usize = 8;

/// Maximum instructor password length in characters.
pub const MAX_PASSWORD_CHARS: usize = 72;

pub fn validate_max_participants(value: i32) -> Result<(), CoreError> {
    if !(MIN_PARTICIPANTS..=MAX_PARTICIPANTS).contains(&value) {
        return Err(CoreError::Validation(format!(
            "max_participants must be between {MIN_PARTICIPANTS} and {MAX_PARTICIPANTS}"
        )));
    }
    Ok(())
}

pub fn validate_duration_seconds(value: Option<i32>) -> Result<(), CoreError> {
    match value {
        Some(secs) if secs < 1 => Err(CoreError::Validation(
            "duration_seconds must be at least 1".into(),
        )),
        _ => Ok(()),
    }
}

pub fn validate_team_code(code: &str) -> Result<(), CoreError> {
    if !is_valid_team_code(code) {
        return Err(CoreError::Validation(
            "team_code must be 6 characters from A-H, J-N, P-Z, 2-9".into(),
        ));
    }
    Ok(())
}

/// Display names are compared case-sensitively and stored verbatim.
pub fn validate_display_name(name: &str) -> Result<(), CoreError> {
    validate_char_range("display_name", name, 1, MAX_DISPLAY_NAME_CHARS)
}

pub fn validate_message_content(content: &str) -> Result<(), CoreError> {
    validate_char_range("content", content, 1, MAX_MESSAGE_CHARS)
}

pub fn validate_username(username: &str) -> Result<(), CoreError> {
    validate_char_range("username", username, 1, MAX_USERNAME_CHARS)
}

pub fn validate_new_password(password: &str) -> Result<(), CoreError> {
    validate_char_range("password", password, MIN_PASSWORD_CHARS, MAX_PASSWORD_CHARS)
}

fn validate_char_range(field: &str, value: &str, min: usize, max: usize) -> Result<(), CoreError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(CoreError::Validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn max_participants_bounds() {
        assert!(validate_max_participants(1).is_ok());
        assert!(validate_max_participants(10).is_ok());
        assert_matches!(validate_max_participants(0), Err(CoreError::Validation(_)));
        assert_matches!(validate_max_participants(11), Err(CoreError::Validation(_)));
    }

    #[test]
    fn duration_must_be_positive_when_present() {
        assert!(validate_duration_seconds(None).is_ok());
        assert!(validate_duration_seconds(Some(60)).is_ok());
        assert_matches!(validate_duration_seconds(Some(0)), Err(CoreError::Validation(_)));
    }

    #[test]
    fn display_name_counts_characters_not_bytes() {
        let name: String = "é".repeat(64);
        assert!(validate_display_name(&name).is_ok());
        assert!(validate_display_name(&"é".repeat(65)).is_err());
        assert!(validate_display_name("").is_err());
    }

    #[test]
    fn message_content_limits() {
        assert!(validate_message_content("hello").is_ok());
        assert!(validate_message_content("").is_err());
        assert!(validate_message_content(&"x".repeat(2001)).is_err());
    }

    #[test]
    fn password_limits() {
        assert!(validate_new_password("short").is_err());
        assert!(validate_new_password("long-enough").is_ok());
        assert!(validate_new_password(&"p".repeat(73)).is_err());
    }
}
