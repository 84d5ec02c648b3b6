//! One-way password hashing.
//!
//! Argon2id with a per-call random salt. The cost profile is tunable so the
//! production work factor does not slow test suites to a crawl.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::{ExposeSecret, SecretString};
use tokio::task;

use super::error::ApiError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CostProfile {
    /// OWASP-recommended parameters (19 MiB, 2 iterations).
    Production,
    /// Cheap parameters for fast test environments.
    Minimal,
}

impl CostProfile {
    fn params(self) -> Params {
        let params = match self {
            Self::Production => Params::new(19_456, 2, 1, None),
            Self::Minimal => Params::new(1_024, 1, 1, None),
        };
        params.unwrap_or_default()
    }

    fn hasher(self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params())
    }
}

/// Hash a plaintext password with a fresh random salt.
pub fn hash(plaintext: &str, cost: CostProfile) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    cost.hasher()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ApiError::Internal(anyhow::anyhow!("failed to hash password: {err}")))
}

/// Verify a plaintext password against a stored hash.
///
/// A malformed stored hash verifies as `false` rather than erroring; the
/// parameters encoded in the hash drive the comparison cost.
#[must_use]
pub fn verify(plaintext: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

/// Hashing is CPU-bound, so async callers run it on the blocking pool.
pub async fn hash_blocking(plaintext: SecretString, cost: CostProfile) -> Result<String, ApiError> {
    task::spawn_blocking(move || hash(plaintext.expose_secret(), cost))
        .await
        .map_err(|err| ApiError::Internal(anyhow::anyhow!("password hashing task failed: {err}")))?
}

pub async fn verify_blocking(plaintext: SecretString, stored: String) -> Result<bool, ApiError> {
    task::spawn_blocking(move || verify(plaintext.expose_secret(), &stored))
        .await
        .map_err(|err| {
            ApiError::Internal(anyhow::anyhow!("password verification task failed: {err}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hashed = hash("correct horse battery staple", CostProfile::Minimal)
            .expect("hashing succeeds");
        assert!(verify("correct horse battery staple", &hashed));
        assert!(!verify("correct horse battery staples", &hashed));
    }

    #[test]
    fn each_hash_gets_its_own_salt() {
        let first = hash("hunter2", CostProfile::Minimal).expect("hashing succeeds");
        let second = hash("hunter2", CostProfile::Minimal).expect("hashing succeeds");
        assert_ne!(first, second);
        assert!(verify("hunter2", &first));
        assert!(verify("hunter2", &second));
    }

    #[test]
    fn malformed_hash_verifies_false() {
        assert!(!verify("hunter2", ""));
        assert!(!verify("hunter2", "not-a-phc-string"));
        assert!(!verify("hunter2", "$argon2id$v=19$truncated"));
    }

    #[test]
    fn hash_encodes_argon2id() {
        let hashed = hash("hunter2", CostProfile::Minimal).expect("hashing succeeds");
        assert!(hashed.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn blocking_wrappers_round_trip() {
        let hashed = hash_blocking(SecretString::from("hunter2"), CostProfile::Minimal)
            .await
            .expect("hashing succeeds");
        let ok = verify_blocking(SecretString::from("hunter2"), hashed)
            .await
            .expect("verification runs");
        assert!(ok);
    }
}
