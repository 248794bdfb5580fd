use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::validation::{build_filters, validate_id};
use super::{ApiError, ApiResponse, AppState, ListMoviesQuery, MessageResponse, MovieListResponse};
use crate::models::movie::{Movie, MovieChanges, NewMovie};

/// GET /v1/movies
pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListMoviesQuery>,
) -> Result<Json<ApiResponse<MovieListResponse>>, ApiError> {
    let filters = build_filters(
        query.title,
        query.genres.as_deref(),
        query.page,
        query.page_size,
        query.sort.as_deref(),
    )?;

    let page = state.movies.list_movies(filters).await?;

    Ok(Json(ApiResponse::success(MovieListResponse {
        movies: page.movies,
        metadata: page.metadata,
    })))
}

/// POST /v1/movies
pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewMovie>,
) -> Result<(StatusCode, Json<ApiResponse<Movie>>), ApiError> {
    let movie = state.movies.create_movie(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(movie))))
}

/// GET /v1/movies/{id}
pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Movie>>, ApiError> {
    let id = validate_id(id)?;
    let movie = state.movies.get_movie(id).await?;
    Ok(Json(ApiResponse::success(movie)))
}

/// PATCH|PUT /v1/movies/{id}
/// Partial update. Sending `version` makes the write conditional on it.
pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(changes): Json<MovieChanges>,
) -> Result<Json<ApiResponse<Movie>>, ApiError> {
    let id = validate_id(id)?;
    let movie = state.movies.update_movie(id, changes).await?;
    Ok(Json(ApiResponse::success(movie)))
}

/// DELETE /v1/movies/{id}
pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_id(id)?;
    state.movies.delete_movie(id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "movie successfully deleted",
    ))))
}
