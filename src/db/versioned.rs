//! Optimistic concurrency for versioned rows.
//!
//! Every mutable table carries an integer `version`. A write is expressed as an
//! `UPDATE .. WHERE <key> AND version = <expected>` that also bumps the version.
//! Zero matched rows means another writer got there first. There is no row
//! locking and no automatic retry.

use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, UpdateMany, sea_query::Expr,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionedUpdate {
    /// The write committed and the row now carries `version`.
    Applied { version: i32 },
    /// The stored version no longer matches the one the caller read.
    Stale,
}

/// Finishes `update` (which must already filter on the primary key) with the
/// version predicate and the version bump, then executes it.
pub async fn conditional_update<E, C>(
    update: UpdateMany<E>,
    version_column: E::Column,
    expected: i32,
    conn: &C,
) -> Result<VersionedUpdate, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let result = update
        .col_expr(version_column, Expr::col(version_column).add(1))
        .filter(version_column.eq(expected))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        Ok(VersionedUpdate::Stale)
    } else {
        Ok(VersionedUpdate::Applied {
            version: expected + 1,
        })
    }
}
