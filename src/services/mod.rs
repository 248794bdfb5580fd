pub mod access;
pub use access::AccessGate;

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, AuthenticatedUser};
pub use auth_service_impl::{AuthSettings, SeaOrmAuthService};

pub mod movie_service;
pub mod movie_service_impl;
pub use movie_service::{MovieError, MoviePage, MovieService};
pub use movie_service_impl::SeaOrmMovieService;

pub mod deadline;
pub mod mail;
pub use mail::{LettreMailer, Mailer, WelcomeMail};

pub mod password;
pub mod permissions;
pub mod token;
pub mod validation;

pub use password::{HashParams, Password};
pub use permissions::{Permission, Permissions};
pub use token::{IssuedToken, Scope};
