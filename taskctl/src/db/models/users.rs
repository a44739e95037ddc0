//! Database models for users.

use crate::api::models::users::{Role, UserUpdate};
use crate::types::UserId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_verified: bool,
}

/// Database request for updating a user
///
/// `None` fields are left untouched by the update query.
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub photo: Option<String>,
    pub password_hash: Option<String>,
    pub is_verified: Option<bool>,
}

impl UserUpdateDBRequest {
    pub fn new(update: UserUpdate) -> Self {
        Self {
            name: update.name,
            bio: update.bio,
            photo: update.photo,
            password_hash: None, // Profile updates don't include password changes
            is_verified: None,
        }
    }
}

/// Database response for a user
#[derive(Debug, Clone, FromRow)]
pub struct UserDBResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_verified: bool,
    pub photo: String,
    pub bio: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
