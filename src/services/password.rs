//! Password storage and verification.
//!
//! Only the Argon2id hash is ever kept. The plaintext lives on the stack of
//! [`Password::set`] / [`Password::compare`] and is dropped afterwards.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::fmt;
use thiserror::Error;
use tokio::task;

use crate::config::SecurityConfig;

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_PASSWORD_CHARS: usize = 72;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("{0}")]
    Validation(String),

    #[error("Password hashing failed: {0}")]
    Internal(String),
}

/// Fixed Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl HashParams {
    fn argon2(self) -> Result<Argon2<'static>, CredentialError> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| CredentialError::Internal(format!("invalid Argon2 params: {e}")))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for HashParams {
    fn default() -> Self {
        Self::from(&SecurityConfig::default())
    }
}

impl From<&SecurityConfig> for HashParams {
    fn from(config: &SecurityConfig) -> Self {
        Self {
            memory_kib: config.argon2_memory_cost_kib,
            iterations: config.argon2_time_cost,
            parallelism: config.argon2_parallelism,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Password {
    hash: String,
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Password").finish_non_exhaustive()
    }
}

impl Password {
    /// Wraps a hash loaded from storage.
    #[must_use]
    pub const fn from_hash(hash: String) -> Self {
        Self { hash }
    }

    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn validate(plaintext: &str) -> Result<(), CredentialError> {
        let chars = plaintext.chars().count();
        if !(MIN_PASSWORD_CHARS..=MAX_PASSWORD_CHARS).contains(&chars) {
            return Err(CredentialError::Validation(format!(
                "Password must be between {MIN_PASSWORD_CHARS} and {MAX_PASSWORD_CHARS} characters"
            )));
        }
        Ok(())
    }

    /// Validates and hashes `plaintext`.
    pub fn set(plaintext: &str, params: HashParams) -> Result<Self, CredentialError> {
        Self::validate(plaintext)?;

        let salt = SaltString::generate(&mut OsRng);
        let hash = params
            .argon2()?
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| CredentialError::Internal(e.to_string()))?;

        Ok(Self {
            hash: hash.to_string(),
        })
    }

    /// `Ok(false)` means the password is wrong. `Err` means the stored hash or
    /// the primitive is broken.
    pub fn compare(&self, plaintext: &str) -> Result<bool, CredentialError> {
        let parsed = PasswordHash::new(&self.hash)
            .map_err(|e| CredentialError::Internal(format!("invalid stored hash: {e}")))?;

        // Cost parameters come from the PHC string, not from `Argon2::default()`.
        match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(CredentialError::Internal(e.to_string())),
        }
    }

    /// [`Password::set`] on the blocking pool. Argon2 is CPU-bound.
    pub async fn set_async(plaintext: String, params: HashParams) -> Result<Self, CredentialError> {
        task::spawn_blocking(move || Self::set(&plaintext, params))
            .await
            .map_err(|e| CredentialError::Internal(format!("hashing task failed: {e}")))?
    }

    /// [`Password::compare`] on the blocking pool.
    pub async fn compare_async(&self, plaintext: String) -> Result<bool, CredentialError> {
        let this = self.clone();
        task::spawn_blocking(move || this.compare(&plaintext))
            .await
            .map_err(|e| CredentialError::Internal(format!("verification task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> HashParams {
        HashParams {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_set_then_compare_matches() {
        let password = Password::set("correct horse battery", cheap()).unwrap();
        assert!(password.compare("correct horse battery").unwrap());
    }

    #[test]
    fn test_wrong_password_is_false_not_error() {
        let password = Password::set("correct horse battery", cheap()).unwrap();
        assert!(!password.compare("correct horse battery!").unwrap());
        assert!(!password.compare("").unwrap());
    }

    #[test]
    fn test_hash_never_contains_plaintext() {
        let password = Password::set("pa55word-plaintext", cheap()).unwrap();
        assert!(!password.hash().contains("pa55word-plaintext"));
        assert!(password.hash().starts_with("$argon2id$"));
    }

    #[test]
    fn test_same_input_different_hashes() {
        let a = Password::set("same_password", cheap()).unwrap();
        let b = Password::set("same_password", cheap()).unwrap();
        assert_ne!(a.hash(), b.hash());
        assert!(a.compare("same_password").unwrap());
        assert!(b.compare("same_password").unwrap());
    }

    #[test]
    fn test_length_bounds() {
        assert!(matches!(
            Password::set("short", cheap()),
            Err(CredentialError::Validation(_))
        ));
        assert!(matches!(
            Password::set(&"a".repeat(73), cheap()),
            Err(CredentialError::Validation(_))
        ));
        assert!(Password::set(&"a".repeat(8), cheap()).is_ok());
        assert!(Password::set(&"a".repeat(72), cheap()).is_ok());
    }

    #[test]
    fn test_length_counts_characters() {
        // 8 characters, 16 bytes
        assert!(Password::validate("éééééééé").is_ok());
    }

    #[test]
    fn test_corrupt_hash_is_internal_error() {
        let password = Password::from_hash("not-a-phc-string".to_string());
        assert!(matches!(
            password.compare("whatever123"),
            Err(CredentialError::Internal(_))
        ));
    }

    #[test]
    fn test_debug_redacts_hash() {
        let password = Password::set("correct horse battery", cheap()).unwrap();
        assert!(!format!("{password:?}").contains("argon2"));
    }

    #[tokio::test]
    async fn test_async_round_trip() {
        let password = Password::set_async("async-password".to_string(), cheap())
            .await
            .unwrap();
        assert!(password.compare_async("async-password".to_string()).await.unwrap());
        assert!(!password.compare_async("other-password".to_string()).await.unwrap());
    }
}
