use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, Statement, sea_query::Expr,
};

use super::is_unique_violation;
use crate::db::versioned::{VersionedUpdate, conditional_update};
use crate::entities::{prelude::*, ratings};
use crate::models::movie::{AverageRating, Rating};

pub struct RatingRepository {
    conn: DatabaseConnection,
}

impl RatingRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Returns `None` if this user already rated the movie.
    pub async fn insert(
        &self,
        user_id: i32,
        movie_id: i32,
        rating: f64,
        now: DateTime<Utc>,
    ) -> Result<Option<Rating>> {
        let active = ratings::ActiveModel {
            user_id: Set(user_id),
            movie_id: Set(movie_id),
            rating: Set(rating),
            created_at: Set(now),
            version: Set(1),
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(Some(Rating::from(model))),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e).context("Failed to insert rating"),
        }
    }

    pub async fn get(&self, user_id: i32, movie_id: i32) -> Result<Option<Rating>> {
        let rating = Ratings::find_by_id((user_id, movie_id))
            .one(&self.conn)
            .await
            .context("Failed to query rating")?;

        Ok(rating.map(Rating::from))
    }

    pub async fn update(&self, rating: &Rating) -> Result<VersionedUpdate> {
        let update = Ratings::update_many()
            .col_expr(ratings::Column::Rating, Expr::value(rating.rating))
            .filter(ratings::Column::UserId.eq(rating.user_id))
            .filter(ratings::Column::MovieId.eq(rating.movie_id));

        conditional_update(update, ratings::Column::Version, rating.version, &self.conn)
            .await
            .context("Failed to update rating")
    }

    pub async fn delete(&self, user_id: i32, movie_id: i32) -> Result<bool> {
        let result = Ratings::delete_by_id((user_id, movie_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete rating")?;

        Ok(result.rows_affected > 0)
    }

    /// Mean and count in one read. No rows yields `(0.0, 0)`.
    pub async fn average(&self, movie_id: i32) -> Result<AverageRating> {
        let backend = self.conn.get_database_backend();
        let row = self
            .conn
            .query_one(Statement::from_sql_and_values(
                backend,
                "SELECT COALESCE(AVG(rating), 0.0) AS average_rating, COUNT(*) AS rating_count \
                 FROM ratings WHERE movie_id = ?",
                [movie_id.into()],
            ))
            .await
            .context("Failed to aggregate ratings")?;

        let Some(row) = row else {
            return Ok(AverageRating {
                average_rating: 0.0,
                rating_count: 0,
            });
        };

        Ok(AverageRating {
            average_rating: row.try_get("", "average_rating")?,
            rating_count: row.try_get("", "rating_count")?,
        })
    }
}
