//! Route protection middleware.
//!
//! Gates compose in a fixed order: identification first, then the role or
//! verification check. Every rejection is an early return with the matching
//! status and message, so a request never reaches a handler half-authorized.

use crate::{
    AppState,
    api::models::users::{CurrentUser, Role},
    errors::Error,
};
use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::Response,
};
use tracing::trace;

/// Run the identification step and cache the resolved user in the request
/// extensions so downstream extractors skip the second database load.
async fn identify(state: &AppState, request: Request) -> Result<(Request, CurrentUser), Error> {
    let (mut parts, body) = request.into_parts();
    let user = CurrentUser::from_request_parts(&mut parts, state).await?;
    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(user.clone());
    Ok((request, user))
}

/// Implementation for require_admin_middleware. Since we only inspect the
/// request, we can return it from the implementation for the middleware to
/// forward.
pub(crate) async fn admin_gate(state: AppState, request: Request) -> Result<Request, Error> {
    let (request, user) = identify(&state, request).await?;

    if user.role != Role::Admin {
        trace!("User {} denied by admin gate", user.id);
        return Err(Error::Forbidden {
            message: "Solo los administradores pueden hacer esto.".to_string(),
        });
    }
    Ok(request)
}

pub(crate) async fn creator_gate(state: AppState, request: Request) -> Result<Request, Error> {
    let (request, user) = identify(&state, request).await?;

    if user.role != Role::Creator && user.role != Role::Admin {
        trace!("User {} denied by creator gate", user.id);
        return Err(Error::Forbidden {
            message: "Solo los creadores pueden hacer esto.".to_string(),
        });
    }
    Ok(request)
}

pub(crate) async fn verified_gate(state: AppState, request: Request) -> Result<Request, Error> {
    let (request, user) = identify(&state, request).await?;

    if !user.is_verified {
        trace!("User {} denied by verified gate", user.id);
        return Err(Error::Forbidden {
            message: "Por favor verifique su dirección de email".to_string(),
        });
    }
    Ok(request)
}

/// Middleware allowing only admins through
pub async fn require_admin(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, Error> {
    let request = admin_gate(state, request).await?;
    Ok(next.run(request).await)
}

/// Middleware allowing creators and admins through
pub async fn require_creator(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, Error> {
    let request = creator_gate(state, request).await?;
    Ok(next.run(request).await)
}

/// Middleware allowing only email-verified users through
pub async fn require_verified(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, Error> {
    let request = verified_gate(state, request).await?;
    Ok(next.run(request).await)
}
