//! Participant token generation and keyed digests.
//!
//! The raw token is handed to the participant exactly once. Only its
//! HMAC-SHA256 digest, keyed by a process-wide pepper, is ever stored, and
//! lookups recompute the digest from the presented token.

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

/// Number of characters in a generated token (~258 bits of entropy).
pub const TOKEN_LENGTH: usize = 43;

/// Byte length of a token digest.
pub const DIGEST_LENGTH: usize = 32;

/// URL-safe characters a token is drawn from.
const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Fixed-length digest of a participant token.
pub type TokenDigest = [u8; DIGEST_LENGTH];

type HmacSha256 = Hmac<Sha256>;

/// Generate a new opaque participant token.
///
/// Uniqueness is not guaranteed by construction; the storage layer holds a
/// unique constraint on the digest.
pub fn generate_participant_token() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LENGTH)
        .map(|_| char::from(TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())]))
        .collect()
}

/// Compute the keyed digest used to store and look up a participant token.
pub fn digest_participant_token(token: &str, pepper: &str) -> TokenDigest {
    let mut mac =
        HmacSha256::new_from_slice(pepper.as_bytes()).expect("HMAC accepts any key length");
    mac.update(token.as_bytes());
    let mut digest = [0u8; DIGEST_LENGTH];
    digest.copy_from_slice(&mac.finalize().into_bytes());
    digest
}
