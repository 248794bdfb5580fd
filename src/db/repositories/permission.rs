use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, sea_query::OnConflict,
};

use crate::entities::{permissions, prelude::*, users_permissions};

pub struct PermissionRepository {
    conn: DatabaseConnection,
}

impl PermissionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_all_for_user(&self, user_id: i32) -> Result<Vec<String>> {
        let codes = Permissions::find()
            .inner_join(UsersPermissions)
            .filter(users_permissions::Column::UserId.eq(user_id))
            .all(&self.conn)
            .await
            .context("Failed to query permissions for user")?;

        Ok(codes.into_iter().map(|p| p.code).collect())
    }

    /// Grants `code` to the user. Granting twice is a no-op.
    ///
    /// Returns `false` if `code` is not a registered permission.
    pub async fn add_for_user(&self, user_id: i32, code: &str) -> Result<bool> {
        let Some(permission) = Permissions::find()
            .filter(permissions::Column::Code.eq(code))
            .one(&self.conn)
            .await
            .context("Failed to query permission by code")?
        else {
            return Ok(false);
        };

        let grant = users_permissions::ActiveModel {
            user_id: Set(user_id),
            permission_id: Set(permission.id),
        };

        UsersPermissions::insert(grant)
            .on_conflict(
                OnConflict::columns([
                    users_permissions::Column::UserId,
                    users_permissions::Column::PermissionId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await
            .context("Failed to grant permission")?;

        Ok(true)
    }
}
