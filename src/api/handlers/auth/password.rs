//! Password hashing helpers.

use anyhow::{Context, Result};

/// Hash a plaintext password with bcrypt at the library's default cost.
///
/// The hash is the only form that ever reaches the database or logs.
pub(super) fn hash_password(plain: &str) -> Result<String> {
    bcrypt::hash(plain, bcrypt::DEFAULT_COST).context("failed to hash password")
}

/// Verify a plaintext password against a stored bcrypt hash.
///
/// A malformed hash is reported as a mismatch, which keeps the login
/// response identical to the unknown-account case.
pub(super) fn verify_password(plain: &str, hash: &str) -> bool {
    bcrypt::verify(plain, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let hash = hash_password("correct horse").unwrap_or_default();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn hash_is_not_plaintext() {
        let hash = hash_password("hunter22").unwrap_or_default();
        assert_ne!(hash, "hunter22");
        assert!(hash.starts_with("$2"));
    }

    #[test]
    fn verify_rejects_malformed_hash() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash"));
    }
}
