use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use cookie::{Cookie, SameSite, time::Duration};
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::services::{AuthError, Permission};

/// Name of the cookie carrying the authentication token.
pub const TOKEN_COOKIE: &str = "token";

// ============================================================================
// Middleware
// ============================================================================

/// Resolves the bearer token and hands an `AuthenticatedUser` to the handler.
///
/// The token is taken from:
/// 1. `Authorization: Bearer <token>` header
/// 2. `token` cookie (set by login)
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let bearer = extract_bearer(request.headers());

    match state.auth.authenticate(bearer.as_deref()).await {
        Ok(caller) => {
            tracing::Span::current().record("user_id", caller.id());
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Err(e) => rejection(e).into_response(),
    }
}

/// Lets the request through only when the caller holds `permission`.
///
/// Goes through [`crate::services::AccessGate::require`] itself, so it does not
/// depend on [`authenticate`] being layered in front of it.
pub async fn require_permission(
    state: &AppState,
    permission: Permission,
    mut request: Request,
    next: Next,
) -> Response {
    let bearer = extract_bearer(request.headers());

    match state.access.require(bearer.as_deref(), permission).await {
        Ok(caller) => {
            tracing::Span::current().record("user_id", caller.id());
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Err(e) => rejection(e).into_response(),
    }
}

pub async fn require_movies_write(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    require_permission(&state, Permission::MoviesWrite, request, next).await
}

/// Collapses every auth failure into one of two generic answers; storage
/// trouble keeps its own status.
fn rejection(err: AuthError) -> ApiError {
    match err {
        AuthError::Forbidden | AuthError::NotActivated => ApiError::forbidden(),
        AuthError::Transient(msg) => ApiError::ServiceUnavailable(msg),
        AuthError::Internal(msg) | AuthError::Randomness(msg) => ApiError::InternalError(msg),
        _ => ApiError::Unauthenticated,
    }
}

/// Extract the bearer token from headers, header first, then cookie.
#[must_use]
pub fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        let token = auth_header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty());

        // A malformed Authorization header is not silently replaced by the cookie.
        return token.map(ToString::to_string);
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == TOKEN_COOKIE)
        .map(|cookie| cookie.value_trimmed().to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value carrying a fresh token.
#[must_use]
pub fn token_cookie(token: &str, max_age_seconds: i64, secure: bool) -> String {
    Cookie::build((TOKEN_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(max_age_seconds))
        .secure(secure)
        .build()
        .to_string()
}

/// `Set-Cookie` value that removes the token cookie.
#[must_use]
pub fn expired_token_cookie(secure: bool) -> String {
    token_cookie("", 0, secure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_from_authorization_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc123"),
        );
        assert_eq!(extract_bearer(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_bearer_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; token=xyz789; other=1"),
        );
        assert_eq!(extract_bearer(&headers).as_deref(), Some("xyz789"));
    }

    #[test]
    fn test_bearer_from_quoted_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("token=\"AAAAAAAAAAAAAAAAAAAAAA\""),
        );
        assert_eq!(
            extract_bearer(&headers).as_deref(),
            Some("AAAAAAAAAAAAAAAAAAAAAA")
        );
    }

    #[test]
    fn test_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer hdr"));
        headers.insert(header::COOKIE, HeaderValue::from_static("token=cookie"));
        assert_eq!(extract_bearer(&headers).as_deref(), Some("hdr"));
    }

    #[test]
    fn test_malformed_authorization_is_none() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        headers.insert(header::COOKIE, HeaderValue::from_static("token=cookie"));
        assert_eq!(extract_bearer(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer(&headers), None);
    }

    #[test]
    fn test_missing_everything_is_none() {
        assert_eq!(extract_bearer(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("token="));
        assert_eq!(extract_bearer(&headers), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = token_cookie("abc", 86400, true);
        assert!(cookie.starts_with("token=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(cookie.contains("Secure"));

        assert!(!expired_token_cookie(false).contains("Secure"));
        assert!(expired_token_cookie(false).contains("Max-Age=0"));
    }

    #[test]
    fn test_rejections_are_generic() {
        assert!(matches!(rejection(AuthError::NotFound), ApiError::Unauthenticated));
        assert!(matches!(
            rejection(AuthError::Unauthenticated),
            ApiError::Unauthenticated
        ));
        assert!(matches!(
            rejection(AuthError::Forbidden),
            ApiError::Forbidden(ref m) if m == "forbidden"
        ));
    }
}
