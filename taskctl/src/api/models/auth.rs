//! API request/response models for authentication flows.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::models::users::Role;
use crate::db::models::users::UserDBResponse;
use crate::types::UserId;

/// Request to register a new user.
///
/// Fields are optional so that missing values surface as a uniform
/// validation error instead of a deserialization failure.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Display name
    pub name: Option<String>,
    /// Email address (must be unique)
    pub email: Option<String>,
    /// Password (will be hashed)
    pub password: Option<String>,
}

/// Request to login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Email address
    pub email: Option<String>,
    /// Password
    pub password: Option<String>,
}

/// Request to initiate password reset
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    /// Email address to send reset link to
    pub email: Option<String>,
}

/// Request to confirm password reset with the emailed token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    /// New password
    pub password: Option<String>,
}

/// Request to change password (for authenticated users)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    /// Current password (for verification)
    #[serde(rename = "currentPassword")]
    pub current_password: Option<String>,
    /// New password
    #[serde(rename = "newPassword")]
    pub new_password: Option<String>,
}

/// Generic success response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// User payload returned after successful login or registration.
///
/// Carries the session token in the body as well as in the cookie, for
/// clients that prefer an Authorization header.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthUserResponse {
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
    pub token: String,
}

impl AuthUserResponse {
    pub fn new(user: UserDBResponse, token: String) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            photo: user.photo,
            bio: user.bio,
            is_verified: user.is_verified,
            token,
        }
    }
}

/// Response models that implement IntoResponse for cleaner handler code
use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

/// Structured response for successful registration
pub struct RegisterResponse {
    pub user: AuthUserResponse,
    pub cookie: String,
}

impl IntoResponse for RegisterResponse {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(header::SET_COOKIE, self.cookie.parse().unwrap());
        (StatusCode::CREATED, headers, Json(self.user)).into_response()
    }
}

/// Structured response for successful login
pub struct LoginResponse {
    pub user: AuthUserResponse,
    pub cookie: String,
}

impl IntoResponse for LoginResponse {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(header::SET_COOKIE, self.cookie.parse().unwrap());
        (StatusCode::OK, headers, Json(self.user)).into_response()
    }
}

/// Structured response for successful logout
pub struct LogoutResponse {
    pub body: MessageResponse,
    pub cookie: String,
}

impl IntoResponse for LogoutResponse {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(header::SET_COOKIE, self.cookie.parse().unwrap());
        (StatusCode::OK, headers, Json(self.body)).into_response()
    }
}
