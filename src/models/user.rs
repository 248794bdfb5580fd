use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entities::users;
use crate::services::password::Password;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i32,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password: Password,
    pub activated: bool,
    #[serde(skip)]
    pub version: i32,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            created_at: model.created_at,
            name: model.name,
            email: model.email,
            password: Password::from_hash(model.password_hash),
            activated: model.activated,
            version: model.version,
        }
    }
}

/// Fields needed to insert a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: Password,
    pub activated: bool,
}
