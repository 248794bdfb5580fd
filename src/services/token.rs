//! Opaque bearer tokens.
//!
//! A token is 16 bytes from the OS entropy source, handed to the client as
//! unpadded URL-safe base64. Storage only ever sees the SHA-256 of that text.

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, Utc};
use rand::{TryRngCore, rngs::OsRng};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const TOKEN_BYTES: usize = 16;

/// Length of the encoded plaintext (16 bytes in unpadded base64).
pub const PLAINTEXT_LEN: usize = 22;

pub type TokenHash = [u8; 32];

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Entropy source unavailable: {0}")]
    Randomness(String),

    #[error("Token lifetime out of range: {0}")]
    InvalidTtl(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Activation,
    Authentication,
}

impl Scope {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Activation => "activation",
            Self::Authentication => "authentication",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activation" => Ok(Self::Activation),
            "authentication" => Ok(Self::Authentication),
            other => Err(format!("unknown token scope: {other}")),
        }
    }
}

/// A freshly generated token. Holds the plaintext, so it must not outlive the
/// response that reveals it.
#[derive(Clone)]
pub struct Token {
    plaintext: String,
    pub hash: TokenHash,
    pub user_id: i32,
    pub expiry: DateTime<Utc>,
    pub scope: Scope,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("user_id", &self.user_id)
            .field("expiry", &self.expiry)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl Token {
    pub fn generate(
        user_id: i32,
        ttl: Duration,
        scope: Scope,
        now: DateTime<Utc>,
    ) -> Result<Self, TokenError> {
        if ttl <= Duration::zero() {
            return Err(TokenError::InvalidTtl(ttl));
        }
        let expiry = now
            .checked_add_signed(ttl)
            .ok_or(TokenError::InvalidTtl(ttl))?;

        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| TokenError::Randomness(e.to_string()))?;

        let plaintext = general_purpose::URL_SAFE_NO_PAD.encode(bytes);
        let hash = hash_plaintext(&plaintext);

        Ok(Self {
            plaintext,
            hash,
            user_id,
            expiry,
            scope,
        })
    }

    /// Consumes the token, giving up the plaintext exactly once.
    #[must_use]
    pub fn into_issued(self) -> IssuedToken {
        IssuedToken {
            token: self.plaintext,
            expiry: self.expiry,
            scope: self.scope,
        }
    }
}

/// What the caller gets back from issuance.
#[derive(Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expiry: DateTime<Utc>,
    #[serde(skip)]
    pub scope: Scope,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("expiry", &self.expiry)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[must_use]
pub fn hash_plaintext(plaintext: &str) -> TokenHash {
    Sha256::digest(plaintext.as_bytes()).into()
}

/// Cheap shape check so obviously malformed input never reaches storage.
#[must_use]
pub fn is_well_formed(plaintext: &str) -> bool {
    plaintext.len() == PLAINTEXT_LEN
        && plaintext
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
