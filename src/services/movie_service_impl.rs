//! `SeaORM` implementation of the `MovieService` trait.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::clock::Clock;
use crate::db::{Store, VersionedUpdate};
use crate::models::movie::{
    AverageRating, Metadata, Movie, MovieChanges, MovieFilters, NewMovie, Rating,
};
use crate::services::deadline::bounded;
use crate::services::movie_service::{MovieError, MovieService, MoviePage};
use crate::services::validation;

pub struct SeaOrmMovieService {
    store: Store,
    clock: Arc<dyn Clock>,
    query_timeout: Duration,
}

impl SeaOrmMovieService {
    #[must_use]
    pub fn new(store: Store, clock: Arc<dyn Clock>, query_timeout: Duration) -> Self {
        Self {
            store,
            clock,
            query_timeout,
        }
    }

    fn validate_fields(
        title: &str,
        year: i32,
        runtime: i32,
        genres: &[String],
    ) -> Result<(), MovieError> {
        validation::validate_title(title)
            .and_then(|()| validation::validate_year(year))
            .and_then(|()| validation::validate_runtime(runtime))
            .and_then(|()| validation::validate_genres(genres))
            .map_err(MovieError::Validation)
    }

    async fn fetch_movie(&self, id: i32) -> Result<Movie, MovieError> {
        bounded(self.query_timeout, "get_movie", self.store.get_movie(id))
            .await?
            .ok_or(MovieError::NotFound)
    }

    async fn ensure_movie_exists(&self, id: i32) -> Result<(), MovieError> {
        self.fetch_movie(id).await.map(|_| ())
    }
}

#[async_trait]
impl MovieService for SeaOrmMovieService {
    async fn create_movie(&self, movie: NewMovie) -> Result<Movie, MovieError> {
        Self::validate_fields(&movie.title, movie.year, movie.runtime, &movie.genres)?;

        let movie = bounded(
            self.query_timeout,
            "insert_movie",
            self.store.insert_movie(movie, self.clock.now()),
        )
        .await?;

        info!(movie_id = movie.id, "Movie created");
        Ok(movie)
    }

    async fn get_movie(&self, id: i32) -> Result<Movie, MovieError> {
        self.fetch_movie(id).await
    }

    async fn update_movie(&self, id: i32, changes: MovieChanges) -> Result<Movie, MovieError> {
        let mut movie = self.fetch_movie(id).await?;

        if let Some(expected) = changes.version
            && expected != movie.version
        {
            metrics::counter!("version_conflicts_total", "record" => "movie").increment(1);
            return Err(MovieError::Conflict);
        }

        changes.apply(&mut movie);
        Self::validate_fields(&movie.title, movie.year, movie.runtime, &movie.genres)?;

        match bounded(
            self.query_timeout,
            "update_movie",
            self.store.update_movie(&movie),
        )
        .await?
        {
            VersionedUpdate::Applied { version } => {
                movie.version = version;
                info!(movie_id = id, version, "Movie updated");
                Ok(movie)
            }
            VersionedUpdate::Stale => {
                metrics::counter!("version_conflicts_total", "record" => "movie").increment(1);
                Err(MovieError::Conflict)
            }
        }
    }

    async fn delete_movie(&self, id: i32) -> Result<(), MovieError> {
        let deleted = bounded(self.query_timeout, "delete_movie", self.store.delete_movie(id)).await?;
        if !deleted {
            return Err(MovieError::NotFound);
        }

        info!(movie_id = id, "Movie deleted");
        Ok(())
    }

    async fn list_movies(&self, filters: MovieFilters) -> Result<MoviePage, MovieError> {
        validation::validate_filters(&filters).map_err(MovieError::Validation)?;

        let (movies, total) = bounded(
            self.query_timeout,
            "list_movies",
            self.store.list_movies(&filters),
        )
        .await?;

        Ok(MoviePage {
            movies,
            metadata: Metadata::calculate(total, filters.page, filters.page_size),
        })
    }

    async fn add_rating(
        &self,
        user_id: i32,
        movie_id: i32,
        rating: f64,
    ) -> Result<Rating, MovieError> {
        validation::validate_rating(rating).map_err(MovieError::Validation)?;
        self.ensure_movie_exists(movie_id).await?;

        bounded(
            self.query_timeout,
            "insert_rating",
            self.store
                .insert_rating(user_id, movie_id, rating, self.clock.now()),
        )
        .await?
        .ok_or(MovieError::Conflict)
    }

    async fn get_rating(&self, user_id: i32, movie_id: i32) -> Result<Rating, MovieError> {
        bounded(
            self.query_timeout,
            "get_rating",
            self.store.get_rating(user_id, movie_id),
        )
        .await?
        .ok_or(MovieError::NotFound)
    }

    async fn update_rating(
        &self,
        user_id: i32,
        movie_id: i32,
        rating: f64,
        expected_version: Option<i32>,
    ) -> Result<Rating, MovieError> {
        validation::validate_rating(rating).map_err(MovieError::Validation)?;

        let mut current = self.get_rating(user_id, movie_id).await?;
        if let Some(expected) = expected_version
            && expected != current.version
        {
            metrics::counter!("version_conflicts_total", "record" => "rating").increment(1);
            return Err(MovieError::Conflict);
        }

        current.rating = rating;

        match bounded(
            self.query_timeout,
            "update_rating",
            self.store.update_rating(&current),
        )
        .await?
        {
            VersionedUpdate::Applied { version } => {
                current.version = version;
                Ok(current)
            }
            VersionedUpdate::Stale => {
                metrics::counter!("version_conflicts_total", "record" => "rating").increment(1);
                Err(MovieError::Conflict)
            }
        }
    }

    async fn delete_rating(&self, user_id: i32, movie_id: i32) -> Result<(), MovieError> {
        let deleted = bounded(
            self.query_timeout,
            "delete_rating",
            self.store.delete_rating(user_id, movie_id),
        )
        .await?;

        if deleted { Ok(()) } else { Err(MovieError::NotFound) }
    }

    async fn average_rating(&self, movie_id: i32) -> Result<AverageRating, MovieError> {
        self.ensure_movie_exists(movie_id).await?;

        Ok(bounded(
            self.query_timeout,
            "average_rating",
            self.store.average_rating(movie_id),
        )
        .await?)
    }
}
