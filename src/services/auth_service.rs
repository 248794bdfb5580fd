//! Domain service for accounts, tokens and permissions.
//!
//! Handles registration, activation, login, sign-out, bearer-token issuance
//! and resolution, and per-user permission grants.

use chrono::Duration;
use thiserror::Error;

use crate::models::user::User;
use crate::services::deadline::StorageFailure;
use crate::services::password::CredentialError;
use crate::services::permissions::{Permissions, UnknownPermission};
use crate::services::token::{IssuedToken, Scope, TokenError};

/// Errors specific to authentication and authorization.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    #[error("Edit conflict")]
    Conflict,

    #[error(transparent)]
    UnknownPermission(#[from] UnknownPermission),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account has not been activated")]
    NotActivated,

    #[error("A user with this email address already exists")]
    DuplicateEmail,

    #[error("Token generation failed: {0}")]
    Randomness(String),

    #[error("Storage unavailable: {0}")]
    Transient(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StorageFailure> for AuthError {
    fn from(err: StorageFailure) -> Self {
        Self::Transient(err.to_string())
    }
}

impl From<CredentialError> for AuthError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Validation(msg) => Self::Validation(msg),
            CredentialError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Randomness(msg) => Self::Randomness(msg),
            TokenError::InvalidTtl(_) => Self::Validation(err.to_string()),
        }
    }
}

/// A caller whose authentication token resolved to a live account.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
}

impl AuthenticatedUser {
    #[must_use]
    pub const fn id(&self) -> i32 {
        self.user.id
    }
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Generates and stores a token. The plaintext is only ever in the return value.
    async fn issue_token(
        &self,
        user_id: i32,
        ttl: Duration,
        scope: Scope,
    ) -> Result<IssuedToken, AuthError>;

    /// Finds the owner of an unexpired token with a matching scope.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotFound`] for unknown, expired, wrong-scope and
    /// malformed tokens alike.
    async fn resolve_token(&self, scope: Scope, plaintext: &str) -> Result<User, AuthError>;

    /// Deletes every token of `scope` for the user and returns how many went.
    async fn revoke_tokens(&self, user_id: i32, scope: Scope) -> Result<u64, AuthError>;

    /// Resolves a bearer token in the authentication scope.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthenticated`] when the token is missing or
    /// does not resolve. Storage failures stay [`AuthError::Transient`].
    async fn authenticate(&self, bearer: Option<&str>) -> Result<AuthenticatedUser, AuthError>;

    /// Idempotent.
    async fn grant_permission(&self, user_id: i32, code: &str) -> Result<(), AuthError>;

    async fn grant_permission_by_email(&self, email: &str, code: &str) -> Result<(), AuthError>;

    async fn permissions_for(&self, user_id: i32) -> Result<Permissions, AuthError>;

    /// Writes `user` if its version is still current and returns the stored result.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Conflict`] when another writer got there first.
    async fn update_user(&self, user: &User) -> Result<User, AuthError>;

    async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, AuthError>;

    async fn activate(&self, token: &str) -> Result<User, AuthError>;

    /// Exchanges credentials for an authentication token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown email and for
    /// a wrong password, without distinguishing them.
    async fn login(&self, email: &str, password: &str) -> Result<IssuedToken, AuthError>;

    async fn sign_out(&self, user_id: i32) -> Result<u64, AuthError>;
}
