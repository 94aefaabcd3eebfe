//! Password hashing with Argon2id.
//!
//! Hashing and verification are CPU and memory heavy, so both run on the
//! blocking thread pool. Verifying without a stored hash still pays for one
//! Argon2 check against a throwaway hash, so a missing account costs the same
//! as a wrong password.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString, rand_core::OsRng,
    },
};
use thiserror::Error;

use crate::config::PasswordConfig;

/// Errors from the password verifier.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// Work factor rejected by Argon2.
    #[error("invalid argon2 parameters: {0}")]
    InvalidParams(String),

    /// Hashing failed.
    #[error("password hashing failed: {0}")]
    Hash(String),

    /// The blocking task panicked or was cancelled.
    #[error("password task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Password checked against the throwaway hash. Never matches a real login.
const DUMMY_PASSWORD: &str = "bazaar-no-such-account";

/// One-way salted password hashing with a tunable work factor.
#[derive(Debug, Clone)]
pub struct PasswordVerifier {
    params: Params,
    dummy_hash: String,
}

impl PasswordVerifier {
    /// Create a verifier with the configured Argon2id cost.
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::InvalidParams` if Argon2 rejects the cost
    /// (for example, memory below `8 * parallelism` KiB), or
    /// `PasswordError::Hash` if the throwaway hash cannot be built.
    pub fn new(config: &PasswordConfig) -> Result<Self, PasswordError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

        let salt = SaltString::generate(&mut OsRng);
        let dummy_hash = argon2_with(params.clone())
            .hash_password(DUMMY_PASSWORD.as_bytes(), &salt)
            .map_err(|e| PasswordError::Hash(e.to_string()))?
            .to_string();

        Ok(Self { params, dummy_hash })
    }

    fn argon2(&self) -> Argon2<'static> {
        argon2_with(self.params.clone())
    }

    /// Hash a password, returning a PHC string that embeds salt and cost.
    ///
    /// # Errors
    ///
    /// Returns `PasswordError` if hashing fails.
    pub async fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let argon2 = self.argon2();
        let plaintext = plaintext.to_owned();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(plaintext.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| PasswordError::Hash(e.to_string()))
        })
        .await?
    }

    /// Check a password against a stored hash.
    ///
    /// Returns `false` when there is no stored hash (federated-only account or
    /// no account at all), when the stored hash cannot be parsed, or on
    /// mismatch. The first two still run one verification against the
    /// throwaway hash. Verification uses the cost recorded in the hash, not
    /// this verifier's parameters.
    pub async fn verify(&self, plaintext: &str, stored_hash: Option<&str>) -> bool {
        let argon2 = self.argon2();
        let plaintext = plaintext.to_owned();
        let stored_hash = stored_hash.map(str::to_owned);
        let dummy_hash = self.dummy_hash.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            check(&argon2, &plaintext, stored_hash.as_deref(), &dummy_hash)
        })
        .await;

        outcome.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Password verification task failed");
            false
        })
    }
}

fn argon2_with(params: Params) -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

fn check(argon2: &Argon2<'_>, plaintext: &str, stored_hash: Option<&str>, dummy_hash: &str) -> bool {
    let parsed = stored_hash.and_then(|hash| {
        PasswordHash::new(hash)
            .inspect_err(|e| tracing::warn!(error = %e, "Stored password hash is malformed"))
            .ok()
    });

    if let Some(parsed) = parsed {
        return argon2.verify_password(plaintext.as_bytes(), &parsed).is_ok();
    }

    if let Ok(dummy) = PasswordHash::new(dummy_hash) {
        let _ = argon2.verify_password(plaintext.as_bytes(), &dummy);
    }
    false
}
