use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait, sea_query::Expr,
};

use super::is_unique_violation;
use crate::db::versioned::{VersionedUpdate, conditional_update};
use crate::entities::{prelude::*, tokens, users};
use crate::models::user::{NewUser, User};
use crate::services::token::Scope;

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Inserts a user at version 1. Returns `None` if the email is taken.
    pub async fn create(&self, user: NewUser, now: DateTime<Utc>) -> Result<Option<User>> {
        let active = users::ActiveModel {
            created_at: Set(now),
            name: Set(user.name),
            email: Set(user.email),
            password_hash: Set(user.password.hash().to_string()),
            activated: Set(user.activated),
            version: Set(1),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(Some(User::from(model))),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e).context("Failed to insert user"),
        }
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = Users::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = Users::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    /// Writes every mutable field, predicated on `user.version`.
    pub async fn update(&self, user: &User) -> Result<VersionedUpdate> {
        let update = Users::update_many()
            .col_expr(users::Column::Name, Expr::value(user.name.clone()))
            .col_expr(users::Column::Email, Expr::value(user.email.clone()))
            .col_expr(
                users::Column::PasswordHash,
                Expr::value(user.password.hash().to_string()),
            )
            .col_expr(users::Column::Activated, Expr::value(user.activated))
            .filter(users::Column::Id.eq(user.id));

        conditional_update(update, users::Column::Version, user.version, &self.conn)
            .await
            .context("Failed to update user")
    }

    /// Sets `activated` and deletes the user's activation tokens in one
    /// transaction. A stale version writes nothing.
    pub async fn activate(&self, user: &User) -> Result<VersionedUpdate> {
        let txn = self
            .conn
            .begin()
            .await
            .context("Failed to begin activation")?;

        let update = Users::update_many()
            .col_expr(users::Column::Activated, Expr::value(true))
            .filter(users::Column::Id.eq(user.id));

        let outcome = conditional_update(update, users::Column::Version, user.version, &txn)
            .await
            .context("Failed to activate user")?;

        if outcome == VersionedUpdate::Stale {
            txn.rollback()
                .await
                .context("Failed to roll back activation")?;
            return Ok(outcome);
        }

        Tokens::delete_many()
            .filter(tokens::Column::UserId.eq(user.id))
            .filter(tokens::Column::Scope.eq(Scope::Activation.as_str()))
            .exec(&txn)
            .await
            .context("Failed to delete activation tokens")?;

        txn.commit().await.context("Failed to commit activation")?;
        Ok(outcome)
    }
}
