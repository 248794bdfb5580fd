//! Domain service for the movie catalogue and per-user ratings.

use serde::Serialize;
use thiserror::Error;

use crate::models::movie::{
    AverageRating, Metadata, Movie, MovieChanges, MovieFilters, NewMovie, Rating,
};
use crate::services::deadline::StorageFailure;

#[derive(Debug, Error)]
pub enum MovieError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found")]
    NotFound,

    #[error("Edit conflict")]
    Conflict,

    #[error("Storage unavailable: {0}")]
    Transient(String),
}

impl From<StorageFailure> for MovieError {
    fn from(err: StorageFailure) -> Self {
        Self::Transient(err.to_string())
    }
}

/// One page of a movie listing.
#[derive(Debug, Clone, Serialize)]
pub struct MoviePage {
    pub movies: Vec<Movie>,
    pub metadata: Metadata,
}

#[async_trait::async_trait]
pub trait MovieService: Send + Sync {
    async fn create_movie(&self, movie: NewMovie) -> Result<Movie, MovieError>;

    async fn get_movie(&self, id: i32) -> Result<Movie, MovieError>;

    /// Applies a partial update under optimistic concurrency.
    ///
    /// # Errors
    ///
    /// Returns [`MovieError::Conflict`] if `changes.version` is stale or a
    /// concurrent writer bumped the version between read and write.
    async fn update_movie(&self, id: i32, changes: MovieChanges) -> Result<Movie, MovieError>;

    async fn delete_movie(&self, id: i32) -> Result<(), MovieError>;

    async fn list_movies(&self, filters: MovieFilters) -> Result<MoviePage, MovieError>;

    /// # Errors
    ///
    /// Returns [`MovieError::Conflict`] if the user already rated the movie.
    async fn add_rating(&self, user_id: i32, movie_id: i32, rating: f64)
    -> Result<Rating, MovieError>;

    async fn get_rating(&self, user_id: i32, movie_id: i32) -> Result<Rating, MovieError>;

    async fn update_rating(
        &self,
        user_id: i32,
        movie_id: i32,
        rating: f64,
        expected_version: Option<i32>,
    ) -> Result<Rating, MovieError>;

    async fn delete_rating(&self, user_id: i32, movie_id: i32) -> Result<(), MovieError>;

    /// Mean and count over every rating of the movie, computed on read.
    /// A movie without ratings yields `(0.0, 0)`.
    async fn average_rating(&self, movie_id: i32) -> Result<AverageRating, MovieError>;
}
