use serde::{Deserialize, Serialize};

use crate::models::movie::{Metadata, Movie};
use crate::models::user::User;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub activated: bool,
    pub created_at: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            activated: user.activated,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Movies
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListMoviesQuery {
    pub title: Option<String>,
    /// Comma-separated; every listed genre must be present.
    pub genres: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub sort: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MovieListResponse {
    pub movies: Vec<Movie>,
    pub metadata: Metadata,
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: f64,
    /// Only consulted on update.
    pub version: Option<i32>,
}
