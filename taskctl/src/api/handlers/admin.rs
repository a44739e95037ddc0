use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    api::models::{
        auth::MessageResponse,
        users::{ListUsersQuery, UserResponse},
    },
    db::handlers::{users::UserFilter, Repository, Users},
    errors::Error,
    types::UserId,
    AppState,
};

/// List all user accounts
#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "admin",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "All user accounts", body = [UserResponse]),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Caller is not an admin"),
    ),
    security(("session_token" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(State(state): State<AppState>, Query(query): Query<ListUsersQuery>) -> Result<Json<Vec<UserResponse>>, Error> {
    let skip = query.skip.unwrap_or(0);
    let limit = query.limit.unwrap_or(100).min(1000);

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    let users = user_repo.list(&UserFilter::new(skip, limit)).await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Delete a user account
#[utoipa::path(
    delete,
    path = "/admin/users/{user_id}",
    tag = "admin",
    params(("user_id" = String, Path, description = "User ID (UUID)")),
    responses(
        (status = 200, description = "Account deleted", body = MessageResponse),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No account with that ID"),
    ),
    security(("session_token" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_user(State(state): State<AppState>, Path(user_id): Path<UserId>) -> Result<Json<MessageResponse>, Error> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    let deleted = user_repo.delete(user_id).await?;
    if !deleted {
        return Err(Error::NotFound {
            message: "Usuario no encontrado".to_string(),
        });
    }

    Ok(Json(MessageResponse {
        message: "Usuario eliminado exitosamente".to_string(),
    }))
}
