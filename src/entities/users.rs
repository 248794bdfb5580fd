use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub created_at: DateTimeUtc,

    pub name: String,

    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash (PHC string)
    pub password_hash: String,

    pub activated: bool,

    /// Optimistic concurrency stamp, bumped on every write.
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tokens::Entity")]
    Tokens,
    #[sea_orm(has_many = "super::users_permissions::Entity")]
    UsersPermissions,
    #[sea_orm(has_many = "super::ratings::Entity")]
    Ratings,
}

impl Related<super::tokens::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tokens.def()
    }
}

impl Related<super::users_permissions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UsersPermissions.def()
    }
}

impl Related<super::ratings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ratings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
