//! Short, human-enterable session codes.
//!
//! Codes are drawn from an alphabet without the visually ambiguous
//! characters `I`, `O`, `0` and `1`. Generation does not guarantee
//! uniqueness; the storage layer enforces it and the caller retries.

use rand::Rng;

/// Characters a team code may contain.
pub const TEAM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of every team code.
pub const TEAM_CODE_LENGTH: usize = 6;

/// Generate a random team code of the standard length.
pub fn generate_team_code() -> String {
    generate_team_code_with_length(TEAM_CODE_LENGTH)
}

/// Generate a random code of `length` characters from [`TEAM_CODE_ALPHABET`].
pub fn generate_team_code_with_length(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| char::from(TEAM_CODE_ALPHABET[rng.random_range(0..TEAM_CODE_ALPHABET.len())]))
        .collect()
}

/// Whether `code` is exactly [`TEAM_CODE_LENGTH`] characters from the alphabet.
pub fn is_valid_team_code(code: &str) -> bool {
    code.len() == TEAM_CODE_LENGTH && code.bytes().all(|b| TEAM_CODE_ALPHABET.contains(&b))
}

/// Trim and uppercase user-entered input before validation.
pub fn normalize_team_code(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_use_restricted_alphabet() {
        for _ in 0..500 {
            let code = generate_team_code();
            assert_eq!(code.len(), TEAM_CODE_LENGTH);
            assert!(is_valid_team_code(&code), "invalid code generated: {code}");
            assert!(
                !code.contains(['I', 'O', '0', '1']),
                "ambiguous character in {code}"
            );
        }
    }

    #[test]
    fn alphabet_excludes_ambiguous_characters() {
        for ambiguous in [b'I', b'O', b'0', b'1'] {
            assert!(!TEAM_CODE_ALPHABET.contains(&ambiguous));
        }
        assert_eq!(TEAM_CODE_ALPHABET.len(), 32);
    }

    #[test]
    fn custom_length_is_respected() {
        assert_eq!(generate_team_code_with_length(10).len(), 10);
        assert!(generate_team_code_with_length(0).is_empty());
    }

    #[test]
    fn validation_rejects_bad_codes() {
        assert!(is_valid_team_code("ABC234"));
        assert!(!is_valid_team_code("ABC23"));
        assert!(!is_valid_team_code("ABC2345"));
        assert!(!is_valid_team_code("ABCDE1"));
        assert!(!is_valid_team_code("ABCDEO"));
        assert!(!is_valid_team_code("abc234"));
    }

    #[test]
    fn normalize_trims_and_uppercases() {
        assert_eq!(normalize_team_code("  abc234 "), "ABC234");
    }
}
