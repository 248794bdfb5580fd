use axum::{
    Extension, Json,
    extract::State,
    http::{StatusCode, header},
    response::{AppendHeaders, IntoResponse},
};
use std::sync::Arc;

use super::auth::{expired_token_cookie, token_cookie};
use super::{
    ActivateRequest, ApiError, ApiResponse, AppState, LoginRequest, MessageResponse,
    RegisterRequest, UserDto,
};
use crate::services::{AuthenticatedUser, IssuedToken};

/// POST /v1/users
/// Register an account. The activation token goes out by mail.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserDto>>), ApiError> {
    let user = state
        .auth
        .register(&payload.name, &payload.email, &payload.password)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(UserDto::from(user))),
    ))
}

/// PUT|POST /v1/users/activate
pub async fn activate(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ActivateRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    if payload.token.is_empty() {
        return Err(ApiError::validation("token must be provided"));
    }

    let user = state.auth.activate(&payload.token).await?;
    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// POST /v1/users/authenticate
/// Exchange email and password for an authentication token, also set as a cookie.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let issued: IssuedToken = state.auth.login(&payload.email, &payload.password).await?;

    let max_age = (issued.expiry - state.clock.now()).num_seconds().max(0);
    let cookie = token_cookie(&issued.token, max_age, state.config.server.secure_cookies);

    Ok((
        StatusCode::CREATED,
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(ApiResponse::success(issued)),
    ))
}

/// POST /v1/users/sign-out
/// Revoke every authentication token of the caller.
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, ApiError> {
    state.auth.sign_out(caller.id()).await?;

    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            expired_token_cookie(state.config.server.secure_cookies),
        )]),
        Json(ApiResponse::success(MessageResponse::new("signed out"))),
    ))
}
