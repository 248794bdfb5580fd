use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState, MessageResponse, RatingRequest};
use crate::models::movie::{AverageRating, Rating};
use crate::services::AuthenticatedUser;

/// POST /v1/movies/{id}/ratings
pub async fn submit_rating(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(movie_id): Path<i32>,
    Json(payload): Json<RatingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Rating>>), ApiError> {
    let movie_id = validate_id(movie_id)?;
    let rating = state
        .movies
        .add_rating(caller.id(), movie_id, payload.rating)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(rating))))
}

/// GET /v1/movies/{id}/ratings
/// Average over all users. Public.
pub async fn average_rating(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i32>,
) -> Result<Json<ApiResponse<AverageRating>>, ApiError> {
    let movie_id = validate_id(movie_id)?;
    let average = state.movies.average_rating(movie_id).await?;
    Ok(Json(ApiResponse::success(average)))
}

/// GET /v1/movies/{id}/rating
/// The caller's own rating.
pub async fn get_own_rating(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(movie_id): Path<i32>,
) -> Result<Json<ApiResponse<Rating>>, ApiError> {
    let movie_id = validate_id(movie_id)?;
    let rating = state.movies.get_rating(caller.id(), movie_id).await?;
    Ok(Json(ApiResponse::success(rating)))
}

/// PUT /v1/movies/{id}/ratings
pub async fn update_rating(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(movie_id): Path<i32>,
    Json(payload): Json<RatingRequest>,
) -> Result<Json<ApiResponse<Rating>>, ApiError> {
    let movie_id = validate_id(movie_id)?;
    let rating = state
        .movies
        .update_rating(caller.id(), movie_id, payload.rating, payload.version)
        .await?;

    Ok(Json(ApiResponse::success(rating)))
}

/// DELETE /v1/movies/{id}/ratings
pub async fn delete_rating(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(movie_id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let movie_id = validate_id(movie_id)?;
    state.movies.delete_rating(caller.id(), movie_id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "rating deleted",
    ))))
}
