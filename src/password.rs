//! Password hashing
//!
//! Argon2id with a fresh random salt per hash; the salt and parameters are
//! embedded in the PHC-format digest so verification needs nothing else.

use crate::config::AuthConfig;

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PasswordError {
    #[error("invalid argon2 parameters: {0}")]
    Params(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// One-way password hashing and verification
///
/// Clones share the verification counter.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
    verifications: Arc<AtomicU64>,
}

impl PasswordHasher {
    pub fn new(memory_cost: u32, time_cost: u32, parallelism: u32) -> Result<Self, PasswordError> {
        let params = Params::new(memory_cost, time_cost, parallelism, None)
            .map_err(|e| PasswordError::Params(e.to_string()))?;
        Ok(Self {
            params,
            verifications: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, PasswordError> {
        Self::new(
            config.argon2_memory_cost,
            config.argon2_time_cost,
            config.argon2_parallelism,
        )
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password using Argon2id
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::Hashing(e.to_string()))?
            .to_string();

        Ok(hash)
    }

    /// Verify a password against a stored digest.
    ///
    /// A mismatch is `false`, as is a digest that cannot be parsed.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        self.verifications.fetch_add(1, Ordering::Relaxed);

        let parsed_hash = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Stored password hash is unreadable: {}", e);
                return false;
            }
        };

        self.argon2()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// [`hash`](Self::hash) on the blocking pool, off the async workers
    pub async fn hash_async(&self, password: &str) -> Result<String, PasswordError> {
        let hasher = self.clone();
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| PasswordError::Hashing(e.to_string()))?
    }

    /// [`verify`](Self::verify) on the blocking pool, off the async workers
    pub async fn verify_async(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let hasher = self.clone();
        let password = password.to_owned();
        let hash = hash.to_owned();

        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| PasswordError::Hashing(e.to_string()))
    }

    /// Number of verifications run so far, successful or not
    pub fn verifications(&self) -> u64 {
        self.verifications.load(Ordering::Relaxed)
    }
}
