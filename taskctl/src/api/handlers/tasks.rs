use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    api::models::{
        auth::MessageResponse,
        tasks::{TaskCreate, TaskListResponse, TaskResponse, TaskUpdate},
        users::CurrentUser,
    },
    db::{
        handlers::{tasks::TaskFilter, Repository, Tasks},
        models::tasks::{TaskCreateDBRequest, TaskDBResponse, TaskUpdateDBRequest},
    },
    errors::Error,
    types::TaskId,
    AppState,
};

/// Fetch a task and confirm the caller owns it.
///
/// A task belonging to someone else answers 401, matching the session
/// failure, not 403; only the admin surface distinguishes roles.
async fn owned_task(state: &AppState, current_user: &CurrentUser, task_id: TaskId) -> Result<TaskDBResponse, Error> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut task_repo = Tasks::new(&mut pool_conn);

    let task = task_repo.get_by_id(task_id).await?.ok_or_else(|| Error::NotFound {
        message: "Tarea no encontrada".to_string(),
    })?;

    if task.user_id != current_user.id {
        return Err(Error::Unauthenticated {
            message: Some("No autorizado".to_string()),
        });
    }

    Ok(task)
}

/// Create a task for the logged-in user
#[utoipa::path(
    post,
    path = "/tasks",
    request_body = TaskCreate,
    tag = "tasks",
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "Missing title or description"),
        (status = 401, description = "Not logged in"),
    ),
    security(("session_token" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_task(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<TaskCreate>,
) -> Result<(StatusCode, Json<TaskResponse>), Error> {
    if request.title.as_deref().map_or(true, |title| title.trim().is_empty()) {
        return Err(Error::BadRequest {
            message: "El título es obligatorio".to_string(),
        });
    }
    if request.description.as_deref().map_or(true, |description| description.trim().is_empty()) {
        return Err(Error::BadRequest {
            message: "Se requiere descripción".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut task_repo = Tasks::new(&mut pool_conn);

    let create_request = TaskCreateDBRequest::new(current_user.id, request);
    let task = task_repo.create(&create_request).await?;

    Ok((StatusCode::CREATED, Json(TaskResponse::from(task))))
}

/// List the logged-in user's tasks
#[utoipa::path(
    get,
    path = "/tasks",
    tag = "tasks",
    responses(
        (status = 200, description = "The caller's tasks", body = TaskListResponse),
        (status = 401, description = "Not logged in"),
    ),
    security(("session_token" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_tasks(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<TaskListResponse>, Error> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut task_repo = Tasks::new(&mut pool_conn);

    let tasks = task_repo.list(&TaskFilter::for_user(current_user.id, 0, 1000)).await?;
    let tasks = tasks.into_iter().map(TaskResponse::from).collect();

    Ok(Json(TaskListResponse::new(tasks)))
}

/// Get one of the logged-in user's tasks
#[utoipa::path(
    get,
    path = "/tasks/{task_id}",
    tag = "tasks",
    params(("task_id" = String, Path, description = "Task ID (UUID)")),
    responses(
        (status = 200, description = "The task", body = TaskResponse),
        (status = 401, description = "Not logged in, or the task belongs to someone else"),
        (status = 404, description = "No task with that ID"),
    ),
    security(("session_token" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_task(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(task_id): Path<TaskId>,
) -> Result<Json<TaskResponse>, Error> {
    let task = owned_task(&state, &current_user, task_id).await?;
    Ok(Json(TaskResponse::from(task)))
}

/// Update one of the logged-in user's tasks
#[utoipa::path(
    patch,
    path = "/tasks/{task_id}",
    request_body = TaskUpdate,
    tag = "tasks",
    params(("task_id" = String, Path, description = "Task ID (UUID)")),
    responses(
        (status = 200, description = "Updated task", body = TaskResponse),
        (status = 401, description = "Not logged in, or the task belongs to someone else"),
        (status = 404, description = "No task with that ID"),
    ),
    security(("session_token" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_task(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(task_id): Path<TaskId>,
    Json(request): Json<TaskUpdate>,
) -> Result<Json<TaskResponse>, Error> {
    let task = owned_task(&state, &current_user, task_id).await?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut task_repo = Tasks::new(&mut pool_conn);

    let update_request = TaskUpdateDBRequest::new(request);
    let updated = task_repo.update(task.id, &update_request).await?;

    Ok(Json(TaskResponse::from(updated)))
}

/// Delete one of the logged-in user's tasks
#[utoipa::path(
    delete,
    path = "/tasks/{task_id}",
    tag = "tasks",
    params(("task_id" = String, Path, description = "Task ID (UUID)")),
    responses(
        (status = 200, description = "Task deleted", body = MessageResponse),
        (status = 401, description = "Not logged in, or the task belongs to someone else"),
        (status = 404, description = "No task with that ID"),
    ),
    security(("session_token" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_task(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(task_id): Path<TaskId>,
) -> Result<Json<MessageResponse>, Error> {
    let task = owned_task(&state, &current_user, task_id).await?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut task_repo = Tasks::new(&mut pool_conn);
    task_repo.delete(task.id).await?;

    Ok(Json(MessageResponse {
        message: "Tarea eliminada exitosamente".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session;
    use crate::test_utils::{create_test_app_state, create_test_config, create_test_user};
    use axum::routing::{delete, get, patch, post};
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use sqlx::PgPool;
    use uuid::Uuid;

    fn task_router(state: AppState) -> axum::Router {
        axum::Router::new()
            .route("/tasks", post(create_task))
            .route("/tasks", get(get_tasks))
            .route("/tasks/{task_id}", get(get_task))
            .route("/tasks/{task_id}", patch(update_task))
            .route("/tasks/{task_id}", delete(delete_task))
            .with_state(state)
    }

    async fn session_for(pool: &PgPool, config: &crate::config::Config) -> (crate::db::models::users::UserDBResponse, String) {
        let user = create_test_user(pool, crate::api::models::users::Role::User).await;
        let token = session::create_session_token(user.id, config).unwrap();
        (user, token)
    }

    #[test_log::test(sqlx::test)]
    async fn test_create_task(pool: PgPool) {
        let config = create_test_config();
        let state = create_test_app_state(pool.clone(), config.clone());
        let server = TestServer::new(task_router(state)).unwrap();
        let (_user, token) = session_for(&pool, &config).await;

        let response = server
            .post("/tasks")
            .add_header(axum::http::header::COOKIE, format!("token={token}"))
            .json(&json!({"title": "Comprar pan", "description": "Antes de las nueve", "priority": "alta"}))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["title"], "Comprar pan");
        assert_eq!(body["priority"], "alta");
        assert_eq!(body["status"], "active");
        assert_eq!(body["completed"], false);
        assert!(body.get("dueDate").is_some());
    }

    #[test_log::test(sqlx::test)]
    async fn test_create_task_validation(pool: PgPool) {
        let config = create_test_config();
        let state = create_test_app_state(pool.clone(), config.clone());
        let server = TestServer::new(task_router(state)).unwrap();
        let (_user, token) = session_for(&pool, &config).await;

        let response = server
            .post("/tasks")
            .add_header(axum::http::header::COOKIE, format!("token={token}"))
            .json(&json!({"title": "   ", "description": "algo"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "El título es obligatorio");

        let response = server
            .post("/tasks")
            .add_header(axum::http::header::COOKIE, format!("token={token}"))
            .json(&json!({"title": "Comprar pan"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "Se requiere descripción");
    }

    #[test_log::test(sqlx::test)]
    async fn test_get_tasks_scoped_to_owner(pool: PgPool) {
        let config = create_test_config();
        let state = create_test_app_state(pool.clone(), config.clone());
        let server = TestServer::new(task_router(state)).unwrap();

        let (_ana, ana_token) = session_for(&pool, &config).await;
        let (_ben, ben_token) = session_for(&pool, &config).await;

        for title in ["una", "dos"] {
            server
                .post("/tasks")
                .add_header(axum::http::header::COOKIE, format!("token={ana_token}"))
                .json(&json!({"title": title, "description": "d"}))
                .await
                .assert_status(StatusCode::CREATED);
        }
        server
            .post("/tasks")
            .add_header(axum::http::header::COOKIE, format!("token={ben_token}"))
            .json(&json!({"title": "ajena", "description": "d"}))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .get("/tasks")
            .add_header(axum::http::header::COOKIE, format!("token={ana_token}"))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["length"], 2);
        assert_eq!(body["tasks"].as_array().unwrap().len(), 2);
    }

    #[test_log::test(sqlx::test)]
    async fn test_task_ownership_checks(pool: PgPool) {
        let config = create_test_config();
        let state = create_test_app_state(pool.clone(), config.clone());
        let server = TestServer::new(task_router(state)).unwrap();

        let (_ana, ana_token) = session_for(&pool, &config).await;
        let (_ben, ben_token) = session_for(&pool, &config).await;

        let created: Value = server
            .post("/tasks")
            .add_header(axum::http::header::COOKIE, format!("token={ana_token}"))
            .json(&json!({"title": "privada", "description": "d"}))
            .await
            .json();
        let task_id = created["_id"].as_str().unwrap().to_string();

        // Someone else's task answers 401, not 404
        for request in [
            server.get(&format!("/tasks/{task_id}")),
            server.patch(&format!("/tasks/{task_id}")).json(&json!({"title": "x"})),
            server.delete(&format!("/tasks/{task_id}")),
        ] {
            let response = request
                .add_header(axum::http::header::COOKIE, format!("token={ben_token}"))
                .await;
            response.assert_status_unauthorized();
            let body: Value = response.json();
            assert_eq!(body["message"], "No autorizado");
        }

        // Unknown IDs are a plain 404
        let response = server
            .get(&format!("/tasks/{}", Uuid::new_v4()))
            .add_header(axum::http::header::COOKIE, format!("token={ana_token}"))
            .await;
        response.assert_status_not_found();
        let body: Value = response.json();
        assert_eq!(body["message"], "Tarea no encontrada");
    }

    #[test_log::test(sqlx::test)]
    async fn test_update_and_delete_task(pool: PgPool) {
        let config = create_test_config();
        let state = create_test_app_state(pool.clone(), config.clone());
        let server = TestServer::new(task_router(state)).unwrap();
        let (_user, token) = session_for(&pool, &config).await;

        let created: Value = server
            .post("/tasks")
            .add_header(axum::http::header::COOKIE, format!("token={token}"))
            .json(&json!({"title": "borrador", "description": "d"}))
            .await
            .json();
        let task_id = created["_id"].as_str().unwrap().to_string();

        let response = server
            .patch(&format!("/tasks/{task_id}"))
            .add_header(axum::http::header::COOKIE, format!("token={token}"))
            .json(&json!({"completed": true, "priority": "media"}))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["completed"], true);
        assert_eq!(body["priority"], "media");
        // Fields absent from the patch keep their values
        assert_eq!(body["title"], "borrador");

        let response = server
            .delete(&format!("/tasks/{task_id}"))
            .add_header(axum::http::header::COOKIE, format!("token={token}"))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["message"], "Tarea eliminada exitosamente");

        let response = server
            .get(&format!("/tasks/{task_id}"))
            .add_header(axum::http::header::COOKIE, format!("token={token}"))
            .await;
        response.assert_status_not_found();
    }
}
