//! API request/response models for users.

use crate::db::models::users::UserDBResponse;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

// Role enum for the authorization tiers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Creator,
}

// User request models
#[derive(Debug, Clone, Serialize, Deserialize, Default, ToSchema)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub photo: Option<String>,
}

/// Query parameters for listing users
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListUsersQuery {
    /// Number of users to skip
    pub skip: Option<i64>,
    /// Maximum number of users to return
    pub limit: Option<i64>,
}

// User response models
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[serde(rename = "_id")]
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub photo: String,
    pub bio: String,
    #[serde(rename = "isVerified")]
    pub is_verified: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            email: db.email,
            role: db.role,
            photo: db.photo,
            bio: db.bio,
            is_verified: db.is_verified,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Profile shape returned after an update. Same fields as [`UserResponse`]
/// minus the timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    #[serde(rename = "_id")]
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub photo: String,
    pub bio: String,
    #[serde(rename = "isVerified")]
    pub is_verified: bool,
}

impl From<UserDBResponse> for UserProfile {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            email: db.email,
            role: db.role,
            photo: db.photo,
            bio: db.bio,
            is_verified: db.is_verified,
        }
    }
}

/// The authenticated user attached to a request after session verification.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_verified: bool,
    pub photo: String,
    pub bio: String,
}

impl From<UserDBResponse> for CurrentUser {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            email: db.email,
            role: db.role,
            is_verified: db.is_verified,
            photo: db.photo,
            bio: db.bio,
        }
    }
}
