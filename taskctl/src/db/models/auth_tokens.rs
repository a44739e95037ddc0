//! Database models for single-use auth tokens.
//!
//! Auth tokens back the email verification and password reset flows. Only a
//! SHA-256 digest of the token is stored; the plaintext is emailed to the user
//! and never persisted.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::{AuthTokenId, UserId};

/// Purpose of an auth token. A user holds at most one live token per purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "token_purpose", rename_all = "snake_case")]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
}

impl std::fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenPurpose::EmailVerification => write!(f, "email_verification"),
            TokenPurpose::PasswordReset => write!(f, "password_reset"),
        }
    }
}

/// Database entity model
#[derive(Debug, Clone, FromRow)]
pub struct AuthToken {
    pub id: AuthTokenId,
    pub user_id: UserId,
    pub purpose: TokenPurpose,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Request for creating an auth token
#[derive(Debug, Clone)]
pub struct AuthTokenCreateRequest {
    pub user_id: UserId,
    pub purpose: TokenPurpose,
    pub raw_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Request for updating an auth token (extend or shorten its lifetime)
#[derive(Debug, Clone)]
pub struct AuthTokenUpdateRequest {
    pub expires_at: Option<DateTime<Utc>>,
}

/// Response type (same as entity for now)
pub type AuthTokenResponse = AuthToken;

/// Filter for auth tokens
#[derive(Debug, Clone)]
pub struct AuthTokenFilter {
    pub user_id: Option<UserId>,
    pub purpose: Option<TokenPurpose>,
    pub skip: i64,
    pub limit: i64,
}
