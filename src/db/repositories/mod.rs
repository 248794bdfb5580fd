pub mod movie;
pub mod permission;
pub mod rating;
pub mod token;
pub mod user;

use sea_orm::{DbErr, SqlErr};

/// True when `err` is a UNIQUE or PRIMARY KEY violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
