use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::services::{AuthError, MovieError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    BadRequest(String),

    ValidationError(String),

    Conflict(String),

    /// No usable bearer token. The body never says why.
    Unauthenticated,

    InvalidCredentials,

    Forbidden(String),

    ServiceUnavailable(String),

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            Self::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            Self::Conflict(msg) => write!(f, "Conflict: {msg}"),
            Self::Unauthenticated => write!(f, "Authentication required"),
            Self::InvalidCredentials => write!(f, "Invalid credentials"),
            Self::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            Self::ServiceUnavailable(msg) => write!(f, "Service unavailable: {msg}"),
            Self::InternalError(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::ValidationError(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "authentication required".to_string(),
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid authentication credentials".to_string(),
            ),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::ServiceUnavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "the server is temporarily unable to handle the request".to_string(),
                )
            }
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ApiResponse::<()>::error(error_message);
        let mut response = (status, Json(body)).into_response();

        if matches!(self, Self::Unauthenticated | Self::InvalidCredentials) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(msg) => Self::ValidationError(msg),
            AuthError::Unauthenticated => Self::Unauthenticated,
            AuthError::Forbidden => Self::forbidden(),
            AuthError::NotFound => Self::NotFound("the requested resource could not be found".to_string()),
            AuthError::Conflict => Self::edit_conflict(),
            AuthError::UnknownPermission(e) => Self::ValidationError(e.to_string()),
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::NotActivated => {
                Self::Forbidden("your user account must be activated first".to_string())
            }
            AuthError::DuplicateEmail => {
                Self::ValidationError("a user with this email address already exists".to_string())
            }
            AuthError::Transient(msg) => Self::ServiceUnavailable(msg),
            AuthError::Randomness(msg) | AuthError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<MovieError> for ApiError {
    fn from(err: MovieError) -> Self {
        match err {
            MovieError::Validation(msg) => Self::ValidationError(msg),
            MovieError::NotFound => Self::NotFound("the requested resource could not be found".to_string()),
            MovieError::Conflict => Self::edit_conflict(),
            MovieError::Transient(msg) => Self::ServiceUnavailable(msg),
        }
    }
}

impl ApiError {
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        Self::NotFound(format!("{resource} {id} not found"))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    #[must_use]
    pub fn forbidden() -> Self {
        Self::Forbidden("forbidden".to_string())
    }

    #[must_use]
    pub fn edit_conflict() -> Self {
        Self::Conflict(
            "unable to update the record due to an edit conflict, please try again".to_string(),
        )
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_status_codes() {
        let cases = [
            (AuthError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::Forbidden, StatusCode::FORBIDDEN),
            (AuthError::NotActivated, StatusCode::FORBIDDEN),
            (AuthError::Conflict, StatusCode::CONFLICT),
            (AuthError::NotFound, StatusCode::NOT_FOUND),
            (AuthError::DuplicateEmail, StatusCode::UNPROCESSABLE_ENTITY),
            (
                AuthError::Transient("timeout".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AuthError::Randomness("no entropy".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_unauthenticated_sets_challenge_header() {
        let response = ApiError::Unauthenticated.into_response();
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[test]
    fn test_movie_error_status_codes() {
        assert_eq!(
            ApiError::from(MovieError::Conflict).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(MovieError::Validation("bad".into()))
                .into_response()
                .status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
