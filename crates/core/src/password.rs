//! Password hashing.
//!
//! Stored passwords are Argon2id PHC strings (`$argon2id$v=19$...`). The salt is
//! embedded in the digest, so verification needs nothing but the stored string.
//!
//! Credential documents written by the earlier web app hold bcrypt digests
//! (`$2a$`, `$2b$`, `$2y$`). Those still verify and are replaced with Argon2 on
//! the next successful login (see [`needs_rehash`]).

use crate::{YbocsError, YbocsResult};
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

/// Hashes a plaintext password with a fresh random salt.
///
/// # Errors
///
/// Returns [`YbocsError::PasswordHash`] if Argon2 rejects the input.
pub fn hash_password(plaintext: &str) -> YbocsResult<String> {
    let salt = SaltString::generate(&mut rand::rngs::OsRng);

    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| YbocsError::PasswordHash(e.to_string()))
}

const BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

fn is_bcrypt(digest: &str) -> bool {
    BCRYPT_PREFIXES.iter().any(|prefix| digest.starts_with(prefix))
}

/// True when `digest` is not an Argon2 PHC string and should be re-hashed.
pub fn needs_rehash(digest: &str) -> bool {
    !digest.starts_with("$argon2")
}

/// Checks a plaintext password against a stored digest.
///
/// Any malformed digest verifies as `false`.
pub fn verify_password(plaintext: &str, digest: &str) -> bool {
    if is_bcrypt(digest) {
        return match bcrypt::verify(plaintext, digest) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!("stored bcrypt digest is malformed: {}", e);
                false
            }
        };
    }

    let parsed = match PasswordHash::new(digest) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("stored password digest is malformed: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}
