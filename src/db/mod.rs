use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::models::movie::{AverageRating, Movie, MovieFilters, NewMovie, Rating};
use crate::models::user::{NewUser, User};
use crate::services::token::{Scope, Token, TokenHash};

pub mod migrator;
pub mod repositories;
pub mod versioned;

pub use versioned::VersionedUpdate;

/// Handle to the relational store. Cheap to clone; every clone shares the pool.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::with_pool_options(&config.url, config.max_connections, config.min_connections).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");
        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        // Each in-memory connection would otherwise get its own empty database.
        if in_memory {
            opt.max_connections(1).min_connections(1);
        } else {
            opt.idle_timeout(Duration::from_secs(300))
                .max_lifetime(Duration::from_secs(600));
        }

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn token_repo(&self) -> repositories::token::TokenRepository {
        repositories::token::TokenRepository::new(self.conn.clone())
    }

    fn permission_repo(&self) -> repositories::permission::PermissionRepository {
        repositories::permission::PermissionRepository::new(self.conn.clone())
    }

    fn movie_repo(&self) -> repositories::movie::MovieRepository {
        repositories::movie::MovieRepository::new(self.conn.clone())
    }

    fn rating_repo(&self) -> repositories::rating::RatingRepository {
        repositories::rating::RatingRepository::new(self.conn.clone())
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn create_user(&self, user: NewUser, now: DateTime<Utc>) -> Result<Option<User>> {
        self.user_repo().create(user, now).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn update_user(&self, user: &User) -> Result<VersionedUpdate> {
        self.user_repo().update(user).await
    }

    pub async fn activate_user(&self, user: &User) -> Result<VersionedUpdate> {
        self.user_repo().activate(user).await
    }

    // ========================================================================
    // Tokens
    // ========================================================================

    pub async fn insert_token(&self, token: &Token) -> Result<()> {
        self.token_repo().insert(token).await
    }

    pub async fn get_user_for_token(
        &self,
        hash: &TokenHash,
        scope: Scope,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        self.token_repo().find_user(hash, scope, now).await
    }

    pub async fn delete_tokens_for_user(&self, user_id: i32, scope: Scope) -> Result<u64> {
        self.token_repo().delete_all_for_user(user_id, scope).await
    }

    pub async fn purge_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64> {
        self.token_repo().purge_expired(now).await
    }

    // ========================================================================
    // Permissions
    // ========================================================================

    pub async fn get_permissions_for_user(&self, user_id: i32) -> Result<Vec<String>> {
        self.permission_repo().get_all_for_user(user_id).await
    }

    pub async fn add_permission_for_user(&self, user_id: i32, code: &str) -> Result<bool> {
        self.permission_repo().add_for_user(user_id, code).await
    }

    // ========================================================================
    // Movies
    // ========================================================================

    pub async fn insert_movie(&self, movie: NewMovie, now: DateTime<Utc>) -> Result<Movie> {
        self.movie_repo().insert(movie, now).await
    }

    pub async fn get_movie(&self, id: i32) -> Result<Option<Movie>> {
        self.movie_repo().get(id).await
    }

    pub async fn update_movie(&self, movie: &Movie) -> Result<VersionedUpdate> {
        self.movie_repo().update(movie).await
    }

    pub async fn delete_movie(&self, id: i32) -> Result<bool> {
        self.movie_repo().delete(id).await
    }

    pub async fn list_movies(&self, filters: &MovieFilters) -> Result<(Vec<Movie>, u64)> {
        self.movie_repo().list(filters).await
    }

    // ========================================================================
    // Ratings
    // ========================================================================

    pub async fn insert_rating(
        &self,
        user_id: i32,
        movie_id: i32,
        rating: f64,
        now: DateTime<Utc>,
    ) -> Result<Option<Rating>> {
        self.rating_repo()
            .insert(user_id, movie_id, rating, now)
            .await
    }

    pub async fn get_rating(&self, user_id: i32, movie_id: i32) -> Result<Option<Rating>> {
        self.rating_repo().get(user_id, movie_id).await
    }

    pub async fn update_rating(&self, rating: &Rating) -> Result<VersionedUpdate> {
        self.rating_repo().update(rating).await
    }

    pub async fn delete_rating(&self, user_id: i32, movie_id: i32) -> Result<bool> {
        self.rating_repo().delete(user_id, movie_id).await
    }

    pub async fn average_rating(&self, movie_id: i32) -> Result<AverageRating> {
        self.rating_repo().average(movie_id).await
    }
}
