use axum::{extract::State, Json};

use crate::{
    api::models::users::{CurrentUser, UserProfile, UserResponse, UserUpdate},
    db::{
        errors::DbError,
        handlers::{Repository, Users},
        models::users::UserUpdateDBRequest,
    },
    errors::Error,
    AppState,
};

/// Get the logged-in user's profile
#[utoipa::path(
    get,
    path = "/user",
    tag = "users",
    responses(
        (status = 200, description = "Profile of the logged-in user", body = UserResponse),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "Account no longer exists"),
    ),
    security(("session_token" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_user(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<UserResponse>, Error> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    // The extractor carries no timestamps, so serve the full row
    let user = user_repo.get_by_id(current_user.id).await?.ok_or_else(|| Error::NotFound {
        message: "Usuario no encontrado".to_string(),
    })?;

    Ok(Json(UserResponse::from(user)))
}

/// Update the logged-in user's profile
///
/// Only `name`, `bio`, and `photo` can be changed here; absent fields keep
/// their stored value.
#[utoipa::path(
    patch,
    path = "/user",
    request_body = UserUpdate,
    tag = "users",
    responses(
        (status = 200, description = "Updated profile", body = UserProfile),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "Account no longer exists"),
    ),
    security(("session_token" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<UserUpdate>,
) -> Result<Json<UserProfile>, Error> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    let update_request = UserUpdateDBRequest::new(request);
    let updated = user_repo.update(current_user.id, &update_request).await.map_err(|e| match e {
        DbError::NotFound => Error::NotFound {
            message: "Usuario no encontrado".to_string(),
        },
        other => Error::Database(other),
    })?;

    Ok(Json(UserProfile::from(updated)))
}
