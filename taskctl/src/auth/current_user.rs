//! Extraction of the authenticated user from the session cookie.

use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::session,
    db::{errors::DbError, handlers::{Repository, Users}},
    errors::{Error, Result},
};
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use tracing::{debug, instrument, trace};

/// Pull the session token out of the Cookie header, if any.
///
/// An unreadable header is treated the same as an absent one.
pub(crate) fn session_cookie(headers: &HeaderMap, config: &crate::config::Config) -> Option<String> {
    let cookie_header = headers.get(axum::http::header::COOKIE)?;
    let cookie_str = cookie_header.to_str().ok()?;
    let cookie_name = &config.auth.native.session.cookie_name;

    for cookie in cookie_str.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=') {
            if name == cookie_name {
                return Some(value.to_string());
            }
        }
    }
    None
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    /// The identification step every protected route runs first.
    ///
    /// Each rejection is an unconditional early return:
    /// - no session cookie: 401
    /// - cookie present but the JWT does not verify: 401
    /// - JWT valid but the user row is gone: 404
    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        // Role gates run the extraction ahead of the handler and cache the result
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            trace!("Using user cached in request extensions");
            return Ok(user.clone());
        }

        let Some(token) = session_cookie(&parts.headers, &state.config) else {
            trace!("No session cookie found in request");
            return Err(Error::Unauthenticated { message: None });
        };

        let user_id = session::verify_session_token(&token, &state.config).map_err(|e| match e {
            Error::Unauthenticated { .. } => Error::Unauthenticated {
                message: Some("No autorizado, token fallido".to_string()),
            },
            other => other,
        })?;

        let mut conn = state.db.acquire().await.map_err(DbError::from)?;
        let mut users = Users::new(&mut conn);
        let user = users.get_by_id(user_id).await?.ok_or_else(|| Error::NotFound {
            message: "Usuario no encontrado".to_string(),
        })?;

        debug!("Authenticated user {} via session cookie", user.id);
        Ok(CurrentUser::from(user))
    }
}
