use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set, sea_query::Expr,
};

use crate::db::versioned::{VersionedUpdate, conditional_update};
use crate::entities::movies::{self, Genres};
use crate::entities::prelude::*;
use crate::models::movie::{Movie, MovieFilters, NewMovie, SortColumn};

pub struct MovieRepository {
    conn: DatabaseConnection,
}

impl MovieRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(&self, movie: NewMovie, now: DateTime<Utc>) -> Result<Movie> {
        let active = movies::ActiveModel {
            created_at: Set(now),
            title: Set(movie.title),
            year: Set(movie.year),
            runtime: Set(movie.runtime),
            genres: Set(Genres(movie.genres)),
            version: Set(1),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert movie")?;

        Ok(Movie::from(model))
    }

    pub async fn get(&self, id: i32) -> Result<Option<Movie>> {
        let movie = Movies::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query movie")?;

        Ok(movie.map(Movie::from))
    }

    pub async fn update(&self, movie: &Movie) -> Result<VersionedUpdate> {
        let genres = serde_json::to_value(&movie.genres).context("Failed to encode genres")?;

        let update = Movies::update_many()
            .col_expr(movies::Column::Title, Expr::value(movie.title.clone()))
            .col_expr(movies::Column::Year, Expr::value(movie.year))
            .col_expr(movies::Column::Runtime, Expr::value(movie.runtime))
            .col_expr(movies::Column::Genres, Expr::value(genres))
            .filter(movies::Column::Id.eq(movie.id));

        conditional_update(update, movies::Column::Version, movie.version, &self.conn)
            .await
            .context("Failed to update movie")
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = Movies::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete movie")?;

        Ok(result.rows_affected > 0)
    }

    /// One page of movies plus the total number of matches.
    pub async fn list(&self, filters: &MovieFilters) -> Result<(Vec<Movie>, u64)> {
        let query = Self::filtered(filters);

        let total = query
            .clone()
            .count(&self.conn)
            .await
            .context("Failed to count movies")?;

        let order = if filters.sort.descending {
            Order::Desc
        } else {
            Order::Asc
        };

        let rows = query
            .order_by(sort_column(filters.sort.column), order)
            .order_by_asc(movies::Column::Id)
            .limit(filters.page_size)
            .offset(filters.offset())
            .all(&self.conn)
            .await
            .context("Failed to list movies")?;

        Ok((rows.into_iter().map(Movie::from).collect(), total))
    }

    fn filtered(filters: &MovieFilters) -> Select<Movies> {
        let mut query = Movies::find();

        if let Some(title) = filters.title.as_deref().filter(|t| !t.is_empty()) {
            // Plain substring match; LIKE would treat `%` and `_` in user input as wildcards.
            query = query.filter(Expr::cust_with_values(
                "instr(lower(\"movies\".\"title\"), lower(?)) > 0",
                [title.to_string()],
            ));
        }

        for genre in &filters.genres {
            query = query.filter(Expr::cust_with_values(
                "EXISTS (SELECT 1 FROM json_each(\"movies\".\"genres\") WHERE json_each.value = ?)",
                [genre.clone()],
            ));
        }

        query
    }
}

const fn sort_column(column: SortColumn) -> movies::Column {
    match column {
        SortColumn::Id => movies::Column::Id,
        SortColumn::Title => movies::Column::Title,
        SortColumn::Year => movies::Column::Year,
        SortColumn::Runtime => movies::Column::Runtime,
    }
}
