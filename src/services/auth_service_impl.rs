//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::background::BackgroundTasks;
use crate::clock::Clock;
use crate::config::Config;
use crate::db::{Store, VersionedUpdate};
use crate::models::user::{NewUser, User};
use crate::services::auth_service::{AuthError, AuthService, AuthenticatedUser};
use crate::services::deadline::bounded;
use crate::services::mail::{Mailer, WelcomeMail};
use crate::services::password::{HashParams, Password};
use crate::services::permissions::{Permission, Permissions, UnknownPermission};
use crate::services::token::{self, IssuedToken, Scope, Token};
use crate::services::validation;

/// Tunables lifted out of [`Config`] once at startup.
#[derive(Debug, Clone, Copy)]
pub struct AuthSettings {
    pub hash_params: HashParams,
    pub activation_ttl: Duration,
    pub authentication_ttl: Duration,
    pub query_timeout: std::time::Duration,
}

impl From<&Config> for AuthSettings {
    fn from(config: &Config) -> Self {
        Self {
            hash_params: HashParams::from(&config.security),
            activation_ttl: config.security.activation_token_ttl(),
            authentication_ttl: config.security.authentication_token_ttl(),
            query_timeout: config.database.query_timeout(),
        }
    }
}

pub struct SeaOrmAuthService {
    store: Store,
    clock: Arc<dyn Clock>,
    mailer: Arc<dyn Mailer>,
    tasks: BackgroundTasks,
    settings: AuthSettings,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(
        store: Store,
        clock: Arc<dyn Clock>,
        mailer: Arc<dyn Mailer>,
        tasks: BackgroundTasks,
        settings: AuthSettings,
    ) -> Self {
        Self {
            store,
            clock,
            mailer,
            tasks,
            settings,
        }
    }

    fn timeout(&self) -> std::time::Duration {
        self.settings.query_timeout
    }

    async fn user_exists(&self, user_id: i32) -> Result<bool, AuthError> {
        let user = bounded(
            self.timeout(),
            "get_user_by_id",
            self.store.get_user_by_id(user_id),
        )
        .await?;
        Ok(user.is_some())
    }

    /// A versioned user write matched nothing: the row is gone or moved on.
    async fn stale_user(&self, user_id: i32) -> AuthError {
        match self.user_exists(user_id).await {
            Ok(false) => AuthError::NotFound,
            Ok(true) => {
                metrics::counter!("version_conflicts_total", "record" => "user").increment(1);
                AuthError::Conflict
            }
            Err(e) => e,
        }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn issue_token(
        &self,
        user_id: i32,
        ttl: Duration,
        scope: Scope,
    ) -> Result<IssuedToken, AuthError> {
        let token = Token::generate(user_id, ttl, scope, self.clock.now())?;

        bounded(self.timeout(), "insert_token", self.store.insert_token(&token)).await?;

        metrics::counter!("tokens_issued_total", "scope" => scope.as_str()).increment(1);
        debug!(user_id, %scope, "Token issued");

        Ok(token.into_issued())
    }

    async fn resolve_token(&self, scope: Scope, plaintext: &str) -> Result<User, AuthError> {
        if !token::is_well_formed(plaintext) {
            return Err(AuthError::NotFound);
        }

        let hash = token::hash_plaintext(plaintext);
        let now = self.clock.now();

        bounded(
            self.timeout(),
            "get_user_for_token",
            self.store.get_user_for_token(&hash, scope, now),
        )
        .await?
        .ok_or(AuthError::NotFound)
    }

    async fn revoke_tokens(&self, user_id: i32, scope: Scope) -> Result<u64, AuthError> {
        let removed = bounded(
            self.timeout(),
            "delete_tokens_for_user",
            self.store.delete_tokens_for_user(user_id, scope),
        )
        .await?;

        debug!(user_id, %scope, removed, "Tokens revoked");
        Ok(removed)
    }

    async fn authenticate(&self, bearer: Option<&str>) -> Result<AuthenticatedUser, AuthError> {
        let Some(bearer) = bearer else {
            return Err(AuthError::Unauthenticated);
        };

        match self.resolve_token(Scope::Authentication, bearer).await {
            Ok(user) => Ok(AuthenticatedUser { user }),
            Err(AuthError::NotFound) => {
                metrics::counter!("auth_failures_total", "reason" => "token").increment(1);
                Err(AuthError::Unauthenticated)
            }
            Err(e) => Err(e),
        }
    }

    async fn grant_permission(&self, user_id: i32, code: &str) -> Result<(), AuthError> {
        let permission: Permission = code.parse()?;

        if !self.user_exists(user_id).await? {
            return Err(AuthError::NotFound);
        }

        let known = bounded(
            self.timeout(),
            "add_permission_for_user",
            self.store.add_permission_for_user(user_id, permission.code()),
        )
        .await?;

        if !known {
            return Err(UnknownPermission(code.to_string()).into());
        }

        info!(user_id, permission = %permission, "Permission granted");
        Ok(())
    }

    async fn grant_permission_by_email(&self, email: &str, code: &str) -> Result<(), AuthError> {
        let user = bounded(
            self.timeout(),
            "get_user_by_email",
            self.store.get_user_by_email(email),
        )
        .await?
        .ok_or(AuthError::NotFound)?;

        self.grant_permission(user.id, code).await
    }

    async fn permissions_for(&self, user_id: i32) -> Result<Permissions, AuthError> {
        let codes = bounded(
            self.timeout(),
            "get_permissions_for_user",
            self.store.get_permissions_for_user(user_id),
        )
        .await?;

        Ok(codes.into_iter().collect())
    }

    async fn update_user(&self, user: &User) -> Result<User, AuthError> {
        match bounded(self.timeout(), "update_user", self.store.update_user(user)).await? {
            VersionedUpdate::Applied { version } => Ok(User {
                version,
                ..user.clone()
            }),
            VersionedUpdate::Stale => Err(self.stale_user(user.id).await),
        }
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, AuthError> {
        validation::validate_name(name).map_err(AuthError::Validation)?;
        validation::validate_email(email).map_err(AuthError::Validation)?;

        let password = Password::set_async(password.to_string(), self.settings.hash_params).await?;

        let new_user = NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password,
            activated: false,
        };

        let user = bounded(
            self.timeout(),
            "create_user",
            self.store.create_user(new_user, self.clock.now()),
        )
        .await?
        .ok_or(AuthError::DuplicateEmail)?;

        self.grant_permission(user.id, Permission::MoviesRead.code())
            .await?;

        let activation = self
            .issue_token(user.id, self.settings.activation_ttl, Scope::Activation)
            .await?;

        let mailer = self.mailer.clone();
        let mail = WelcomeMail {
            to_name: user.name.clone(),
            to_email: user.email.clone(),
            activation_token: activation.token,
            expires_at: activation.expiry,
            user_id: user.id,
        };
        self.tasks
            .spawn("welcome_mail", async move {
                mailer.send_welcome(mail).await?;
                Ok(())
            })
            .await;

        info!(user_id = user.id, "User registered");
        Ok(user)
    }

    async fn activate(&self, token: &str) -> Result<User, AuthError> {
        let mut user = match self.resolve_token(Scope::Activation, token).await {
            Ok(user) => user,
            Err(AuthError::NotFound) => {
                return Err(AuthError::Validation(
                    "invalid or expired activation token".to_string(),
                ));
            }
            Err(e) => return Err(e),
        };

        user.activated = true;
        match bounded(
            self.timeout(),
            "activate_user",
            self.store.activate_user(&user),
        )
        .await?
        {
            VersionedUpdate::Applied { version } => user.version = version,
            VersionedUpdate::Stale => return Err(self.stale_user(user.id).await),
        }

        info!(user_id = user.id, "User activated");
        Ok(user)
    }

    async fn login(&self, email: &str, password: &str) -> Result<IssuedToken, AuthError> {
        validation::validate_email(email).map_err(AuthError::Validation)?;
        Password::validate(password)?;

        // Housekeeping only; a failure here must not block the login.
        match bounded(
            self.timeout(),
            "purge_expired_tokens",
            self.store.purge_expired_tokens(self.clock.now()),
        )
        .await
        {
            Ok(purged) if purged > 0 => debug!(purged, "Expired tokens purged"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Expired token purge skipped"),
        }

        let Some(user) = bounded(
            self.timeout(),
            "get_user_by_email",
            self.store.get_user_by_email(email),
        )
        .await?
        else {
            metrics::counter!("auth_failures_total", "reason" => "credentials").increment(1);
            return Err(AuthError::InvalidCredentials);
        };

        if !user.password.compare_async(password.to_string()).await? {
            metrics::counter!("auth_failures_total", "reason" => "credentials").increment(1);
            return Err(AuthError::InvalidCredentials);
        }

        if !user.activated {
            return Err(AuthError::NotActivated);
        }

        let issued = self
            .issue_token(
                user.id,
                self.settings.authentication_ttl,
                Scope::Authentication,
            )
            .await?;

        info!(user_id = user.id, "User logged in");
        Ok(issued)
    }

    async fn sign_out(&self, user_id: i32) -> Result<u64, AuthError> {
        let removed = self.revoke_tokens(user_id, Scope::Authentication).await?;
        info!(user_id, removed, "User signed out");
        Ok(removed)
    }
}
