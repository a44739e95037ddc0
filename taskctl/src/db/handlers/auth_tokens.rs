//! Database repository for single-use auth tokens.
//!
//! Tokens are stored as SHA-256 digests. Issuing a token for a (user, purpose)
//! pair replaces any previous one, so at most one token per purpose is ever
//! redeemable for a given user.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::PgConnection;
use tracing::instrument;

use crate::{
    auth::tokens,
    config::Config,
    db::{
        errors::Result,
        handlers::repository::Repository,
        models::auth_tokens::{
            AuthToken, AuthTokenCreateRequest, AuthTokenFilter, AuthTokenResponse, AuthTokenUpdateRequest, TokenPurpose,
        },
    },
    types::{AuthTokenId, UserId, abbrev_uuid},
};

pub struct AuthTokens<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for AuthTokens<'c> {
    type CreateRequest = AuthTokenCreateRequest;
    type UpdateRequest = AuthTokenUpdateRequest;
    type Response = AuthTokenResponse;
    type Id = AuthTokenId;
    type Filter = AuthTokenFilter;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), purpose = %request.purpose), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let token_hash = tokens::hash_token(&request.raw_token);

        // The upsert replaces any live token for the same (user, purpose) pair
        let token = sqlx::query_as::<_, AuthToken>(
            r#"
            INSERT INTO auth_tokens (user_id, purpose, token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, purpose) DO UPDATE
                SET token_hash = EXCLUDED.token_hash,
                    expires_at = EXCLUDED.expires_at,
                    created_at = NOW()
            RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(request.purpose)
        .bind(&token_hash)
        .bind(request.expires_at)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(token)
    }

    #[instrument(skip(self, id), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let token = sqlx::query_as::<_, AuthToken>("SELECT * FROM auth_tokens WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(token)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let tokens = sqlx::query_as::<_, AuthToken>("SELECT * FROM auth_tokens WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(tokens.into_iter().map(|t| (t.id, t)).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = String::from("SELECT * FROM auth_tokens WHERE 1=1");
        let mut conditions = Vec::new();

        if filter.user_id.is_some() {
            conditions.push(format!("user_id = ${}", conditions.len() + 1));
        }
        if filter.purpose.is_some() {
            conditions.push(format!("purpose = ${}", conditions.len() + 1));
        }

        if !conditions.is_empty() {
            query.push_str(" AND ");
            query.push_str(&conditions.join(" AND "));
        }

        query.push_str(&format!(" ORDER BY created_at DESC LIMIT {} OFFSET {}", filter.limit, filter.skip));

        let mut sql_query = sqlx::query_as::<_, AuthToken>(&query);

        if let Some(user_id) = filter.user_id {
            sql_query = sql_query.bind(user_id);
        }
        if let Some(purpose) = filter.purpose {
            sql_query = sql_query.bind(purpose);
        }

        let tokens = sql_query.fetch_all(&mut *self.db).await?;
        Ok(tokens)
    }

    #[instrument(skip(self, id), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, id, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let token = sqlx::query_as::<_, AuthToken>(
            r#"
            UPDATE auth_tokens
            SET expires_at = COALESCE($2, expires_at)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.expires_at)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(token)
    }
}

impl<'c> AuthTokens<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Issue a token for a user, replacing any outstanding one for the same purpose.
    ///
    /// Returns the plaintext token (to be emailed, never stored) alongside the
    /// persisted record.
    #[instrument(skip(self, config), fields(user_id = %abbrev_uuid(&user_id), purpose = %purpose), err)]
    pub async fn create_for_user(
        &mut self,
        user_id: UserId,
        purpose: TokenPurpose,
        config: &Config,
    ) -> Result<(String, AuthToken)> {
        let raw_token = tokens::generate_token(user_id);
        let duration = match purpose {
            TokenPurpose::EmailVerification => config.auth.native.verification_token_duration,
            TokenPurpose::PasswordReset => config.auth.native.password_reset_token_duration,
        };
        let expires_at = Utc::now() + chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::hours(1));

        let request = AuthTokenCreateRequest {
            user_id,
            purpose,
            raw_token: raw_token.clone(),
            expires_at,
        };

        let token = self.create(&request).await?;
        Ok((raw_token, token))
    }

    /// Find a live token matching the plaintext presented by a client.
    ///
    /// Returns `None` for unknown, purpose-mismatched, or expired tokens.
    #[instrument(skip(self, raw_token), fields(purpose = %purpose), err)]
    pub async fn find_valid(&mut self, raw_token: &str, purpose: TokenPurpose) -> Result<Option<AuthToken>> {
        let token_hash = tokens::hash_token(raw_token);

        let token = sqlx::query_as::<_, AuthToken>("SELECT * FROM auth_tokens WHERE token_hash = $1 AND purpose = $2")
            .bind(&token_hash)
            .bind(purpose)
            .fetch_optional(&mut *self.db)
            .await?;

        if let Some(token) = token {
            if Utc::now() > token.expires_at {
                return Ok(None);
            }
            Ok(Some(token))
        } else {
            Ok(None)
        }
    }

    /// Delete all tokens a user holds for a purpose
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), purpose = %purpose), err)]
    pub async fn invalidate_for_user(&mut self, user_id: UserId, purpose: TokenPurpose) -> Result<u64> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE user_id = $1 AND purpose = $2")
            .bind(user_id)
            .bind(purpose)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
