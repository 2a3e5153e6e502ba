//! Password credential handling.
//!
//! Hashing and verification are Argon2 over PHC strings. Verification always
//! performs a full hash comparison of constant shape: when no stored hash
//! exists (unknown email, OAuth-only account) the comparison runs against a
//! process-constant dummy hash, so account existence cannot be inferred from
//! response latency. The "no such user" determination belongs to the caller.

mod validation;

use std::sync::LazyLock;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use thiserror::Error;

pub use validation::{validate_email, validate_password};

#[derive(Debug, Error, Clone)]
pub enum CredentialError {
    #[error("Hashing error: {0}")]
    Hashing(String),
}

/// PHC string verified in place of a missing hash to keep the timing shape
/// of the lookup-miss path identical to the lookup-hit path.
static DUMMY_HASH: LazyLock<String> = LazyLock::new(|| {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(b"dummy-password-for-timing-equalization", &salt)
        .map(|h| h.to_string())
        .expect("hashing a constant with a fresh salt cannot fail")
});

/// Hash a plaintext password into an Argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| CredentialError::Hashing(e.to_string()))
}

/// Verify a plaintext password against an optional stored hash.
///
/// Always runs a full Argon2 verification; returns `false` whenever
/// `stored_hash` is absent, regardless of the comparison outcome.
pub fn verify_password(password: &str, stored_hash: Option<&str>) -> bool {
    let (phc, present) = match stored_hash {
        Some(hash) => (hash, true),
        None => (DUMMY_HASH.as_str(), false),
    };

    let matches = match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => {
            // An unparseable stored hash still burns a verification so a
            // corrupt row does not become a timing oracle.
            let parsed = PasswordHash::new(DUMMY_HASH.as_str())
                .expect("dummy hash is a valid PHC string");
            let _ = Argon2::default().verify_password(password.as_bytes(), &parsed);
            false
        }
    };

    matches && present
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("Correct horse battery staple 1!").expect("hash");
        assert!(verify_password(
            "Correct horse battery staple 1!",
            Some(&hash)
        ));
        assert!(!verify_password("wrong password", Some(&hash)));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same password").expect("hash");
        let b = hash_password("same password").expect("hash");
        assert_ne!(a, b);
    }

    #[test]
    fn test_absent_hash_never_matches() {
        // Even the dummy hash's own preimage must not verify against None.
        assert!(!verify_password(
            "dummy-password-for-timing-equalization",
            None
        ));
        assert!(!verify_password("anything", None));
    }

    #[test]
    fn test_corrupt_hash_never_matches() {
        assert!(!verify_password("anything", Some("not-a-phc-string")));
    }
}
