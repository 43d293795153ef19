//! Room join codes.
//!
//! Issued codes are always 6 characters from `[A-Z0-9]`. Lookups are
//! case-insensitive and tolerate lengths up to 8 so longer codes can be
//! issued later without breaking old clients.

use rand::Rng;
use thiserror::Error;

pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const CODE_LENGTH: usize = 6;
const MAX_INPUT_LENGTH: usize = 8;

/// Attempts made against the store before giving up on a unique code.
pub const CODE_GENERATION_ATTEMPTS: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid code format")]
pub struct InvalidCodeFormat;

/// Uniform random sample over the code alphabet. Uniqueness is the caller's
/// concern (checked against the store, retried on collision).
pub fn generate() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Uppercase and validate a client-supplied code.
pub fn normalize(input: &str) -> Result<String, InvalidCodeFormat> {
    let trimmed = input.trim();
    if trimmed.len() < CODE_LENGTH || trimmed.len() > MAX_INPUT_LENGTH {
        return Err(InvalidCodeFormat);
    }
    let upper = trimmed.to_uppercase();
    if !upper.bytes().all(|b| CODE_ALPHABET.contains(&b)) {
        return Err(InvalidCodeFormat);
    }
    Ok(upper)
}
