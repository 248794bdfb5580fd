//! Permission-gated access.
//!
//! A gated operation runs only after the caller is authenticated, activated
//! and holds the required permission. Nothing else leads into it.

use std::future::Future;
use std::sync::Arc;

use crate::services::auth_service::{AuthError, AuthService, AuthenticatedUser};
use crate::services::permissions::Permission;

#[derive(Clone)]
pub struct AccessGate {
    auth: Arc<dyn AuthService>,
}

impl AccessGate {
    #[must_use]
    pub fn new(auth: Arc<dyn AuthService>) -> Self {
        Self { auth }
    }

    /// Authenticates `bearer` and checks that the account may use `permission`.
    ///
    /// # Errors
    ///
    /// [`AuthError::Unauthenticated`] when the bearer does not resolve,
    /// [`AuthError::Forbidden`] when the account is inactive or lacks the
    /// permission.
    pub async fn require(
        &self,
        bearer: Option<&str>,
        permission: Permission,
    ) -> Result<AuthenticatedUser, AuthError> {
        let caller = self.auth.authenticate(bearer).await?;

        if !caller.user.activated {
            metrics::counter!("access_denied_total", "reason" => "inactive").increment(1);
            return Err(AuthError::Forbidden);
        }

        let permissions = self.auth.permissions_for(caller.id()).await?;
        if !permissions.includes(permission) {
            metrics::counter!("access_denied_total", "reason" => "permission").increment(1);
            tracing::debug!(user_id = caller.id(), %permission, "Permission missing");
            return Err(AuthError::Forbidden);
        }

        Ok(caller)
    }

    /// Runs `handler` with the caller, but only once [`AccessGate::require`] passes.
    pub async fn guard<F, Fut, T, E>(
        &self,
        bearer: Option<&str>,
        permission: Permission,
        handler: F,
    ) -> Result<T, E>
    where
        F: FnOnce(AuthenticatedUser) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<AuthError>,
    {
        let caller = self.require(bearer, permission).await?;
        handler(caller).await
    }
}
