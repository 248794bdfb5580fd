pub use super::movies::Entity as Movies;
pub use super::permissions::Entity as Permissions;
pub use super::ratings::Entity as Ratings;
pub use super::tokens::Entity as Tokens;
pub use super::users::Entity as Users;
pub use super::users_permissions::Entity as UsersPermissions;
