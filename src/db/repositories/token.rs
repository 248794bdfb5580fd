use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::{prelude::*, tokens};
use crate::models::user::User;
use crate::services::token::{Scope, Token, TokenHash};

/// Persistence for bearer tokens. Only digests ever reach this layer.
pub struct TokenRepository {
    conn: DatabaseConnection,
}

impl TokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(&self, token: &Token) -> Result<()> {
        let active = tokens::ActiveModel {
            hash: Set(token.hash.to_vec()),
            user_id: Set(token.user_id),
            expiry: Set(token.expiry),
            scope: Set(token.scope.as_str().to_string()),
        };

        Tokens::insert(active)
            .exec_without_returning(&self.conn)
            .await
            .context("Failed to insert token")?;

        Ok(())
    }

    /// The owner of an unexpired token with this digest and scope.
    pub async fn find_user(
        &self,
        hash: &TokenHash,
        scope: Scope,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let user = Users::find()
            .inner_join(Tokens)
            .filter(tokens::Column::Hash.eq(hash.to_vec()))
            .filter(tokens::Column::Scope.eq(scope.as_str()))
            .filter(tokens::Column::Expiry.gt(now))
            .one(&self.conn)
            .await
            .context("Failed to query user for token")?;

        Ok(user.map(User::from))
    }

    /// Returns the number of tokens removed.
    pub async fn delete_all_for_user(&self, user_id: i32, scope: Scope) -> Result<u64> {
        let result = Tokens::delete_many()
            .filter(tokens::Column::UserId.eq(user_id))
            .filter(tokens::Column::Scope.eq(scope.as_str()))
            .exec(&self.conn)
            .await
            .context("Failed to delete tokens")?;

        Ok(result.rows_affected)
    }

    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = Tokens::delete_many()
            .filter(tokens::Column::Expiry.lte(now))
            .exec(&self.conn)
            .await
            .context("Failed to purge expired tokens")?;

        Ok(result.rows_affected)
    }
}
