//! Stored credential format.
//!
//! Credentials are stored as `sha256$<salt>$<digest>` where the salt is 16
//! random bytes and the digest is SHA-256 over salt followed by the password,
//! both base64 encoded. Rows written before hashing was introduced hold the
//! plaintext password; those still verify, with a warning.
//!
//! Accounts that only sign in through an external identity provider carry a
//! credential starting with `!`, which never verifies.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use rand::Rng;
use sha2::{Digest, Sha256};

const SCHEME: &str = "sha256";
const UNUSABLE_PREFIX: char = '!';

/// Hashes a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::rng().fill(&mut salt);
    format!(
        "{}${}${}",
        SCHEME,
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(digest(&salt, password))
    )
}

/// Credential for an account that can only be reached through `provider`.
pub fn unusable(provider: &str) -> String {
    format!("{}external:{}", UNUSABLE_PREFIX, provider)
}

/// Checks `password` against a stored credential.
pub fn verify(password: &str, stored: &str) -> bool {
    if stored.starts_with(UNUSABLE_PREFIX) {
        return false;
    }

    let mut parts = stored.splitn(3, '$');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(SCHEME), Some(salt), Some(expected)) => {
            let (Ok(salt), Ok(expected)) = (
                STANDARD_NO_PAD.decode(salt),
                STANDARD_NO_PAD.decode(expected),
            ) else {
                tracing::warn!("Malformed stored credential");
                return false;
            };
            constant_time_eq(&digest(&salt, password), &expected)
        }
        _ => {
            tracing::warn!("Verifying a plaintext stored credential; re-save the password to hash it");
            constant_time_eq(password.as_bytes(), stored.as_bytes())
        }
    }
}

/// Returns true if the stored credential is in the hashed format.
pub fn is_hashed(stored: &str) -> bool {
    stored.starts_with(&format!("{}$", SCHEME))
}

fn digest(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
