//! Database repository for tasks.

use std::collections::HashMap;

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::tasks::{TaskCreateDBRequest, TaskDBResponse, TaskUpdateDBRequest},
};
use crate::types::{TaskId, UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing tasks
#[derive(Debug, Clone)]
pub struct TaskFilter {
    pub user_id: Option<UserId>,
    pub completed: Option<bool>,
    pub skip: i64,
    pub limit: i64,
}

impl TaskFilter {
    pub fn for_user(user_id: UserId, skip: i64, limit: i64) -> Self {
        Self {
            user_id: Some(user_id),
            completed: None,
            skip,
            limit,
        }
    }
}

pub struct Tasks<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Tasks<'c> {
    type CreateRequest = TaskCreateDBRequest;
    type UpdateRequest = TaskUpdateDBRequest;
    type Response = TaskDBResponse;
    type Id = TaskId;
    type Filter = TaskFilter;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), title = %request.title), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let task_id = Uuid::new_v4();

        // Unset optional fields fall back to the column defaults
        let task = sqlx::query_as::<_, TaskDBResponse>(
            r#"
            INSERT INTO tasks (id, user_id, title, description, due_date, priority, status)
            VALUES (
                $1, $2, $3,
                COALESCE($4, 'No hay descripción'),
                $5,
                COALESCE($6, 'baja'::task_priority),
                COALESCE($7, 'active'::task_status)
            )
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(request.user_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.due_date)
        .bind(request.priority)
        .bind(request.status)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(task)
    }

    #[instrument(skip(self), fields(task_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let task = sqlx::query_as::<_, TaskDBResponse>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(task)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let tasks = sqlx::query_as::<_, TaskDBResponse>("SELECT * FROM tasks WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(tasks.into_iter().map(|t| (t.id, t)).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = String::from("SELECT * FROM tasks WHERE 1=1");
        let mut conditions = Vec::new();

        if filter.user_id.is_some() {
            conditions.push(format!("user_id = ${}", conditions.len() + 1));
        }
        if filter.completed.is_some() {
            conditions.push(format!("completed = ${}", conditions.len() + 1));
        }

        if !conditions.is_empty() {
            query.push_str(" AND ");
            query.push_str(&conditions.join(" AND "));
        }

        query.push_str(&format!(" ORDER BY created_at DESC LIMIT {} OFFSET {}", filter.limit, filter.skip));

        let mut sql_query = sqlx::query_as::<_, TaskDBResponse>(&query);

        if let Some(user_id) = filter.user_id {
            sql_query = sql_query.bind(user_id);
        }
        if let Some(completed) = filter.completed {
            sql_query = sql_query.bind(completed);
        }

        let tasks = sql_query.fetch_all(&mut *self.db).await?;
        Ok(tasks)
    }

    #[instrument(skip(self), fields(task_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(task_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        // Atomic update with conditional field updates
        let task = sqlx::query_as::<_, TaskDBResponse>(
            r#"
            UPDATE tasks SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                due_date = COALESCE($4, due_date),
                priority = COALESCE($5, priority),
                status = COALESCE($6, status),
                completed = COALESCE($7, completed),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.due_date)
        .bind(request.priority)
        .bind(request.status)
        .bind(request.completed)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(task)
    }
}

impl<'c> Tasks<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[cfg(test)]
mod tests {
    use super::super::repository::Repository;
    use super::*;
    use crate::api::models::tasks::{TaskPriority, TaskStatus};
    use crate::api::models::users::Role;
    use crate::db::handlers::Users;
    use crate::db::models::users::UserCreateDBRequest;
    use sqlx::PgPool;

    async fn seed_user(conn: &mut PgConnection, email: &str) -> UserId {
        let mut repo = Users::new(conn);
        let user = repo
            .create(&UserCreateDBRequest {
                name: "taskowner".to_string(),
                email: email.to_string(),
                password_hash: "$2b$10$fakehashfakehashfakehasha".to_string(),
                role: Role::User,
                is_verified: true,
            })
            .await
            .unwrap();
        user.id
    }

    fn create_request(user_id: UserId, title: &str) -> TaskCreateDBRequest {
        TaskCreateDBRequest {
            user_id,
            title: title.to_string(),
            description: None,
            due_date: None,
            priority: None,
            status: None,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_task_applies_defaults(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user_id = seed_user(&mut conn, "defaults@example.com").await;

        let mut repo = Tasks::new(&mut conn);
        let task = repo.create(&create_request(user_id, "Comprar pan")).await.unwrap();

        assert_eq!(task.title, "Comprar pan");
        assert_eq!(task.description, "No hay descripción");
        assert_eq!(task.priority, TaskPriority::Baja);
        assert_eq!(task.status, TaskStatus::Active);
        assert!(!task.completed);
        assert!(task.due_date.is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_title_keeps_completed_flag(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user_id = seed_user(&mut conn, "keepflag@example.com").await;

        let mut repo = Tasks::new(&mut conn);
        let task = repo.create(&create_request(user_id, "Original")).await.unwrap();

        let done = repo
            .update(
                task.id,
                &TaskUpdateDBRequest {
                    completed: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(done.completed);

        // A title-only update must not reset the flag
        let renamed = repo
            .update(
                task.id,
                &TaskUpdateDBRequest {
                    title: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.title, "Renamed");
        assert!(renamed.completed);

        // And an explicit false is honored
        let reopened = repo
            .update(
                task.id,
                &TaskUpdateDBRequest {
                    completed: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!reopened.completed);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_is_scoped_to_user(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = seed_user(&mut conn, "owner@example.com").await;
        let other = seed_user(&mut conn, "other@example.com").await;

        let mut repo = Tasks::new(&mut conn);
        repo.create(&create_request(owner, "Mine")).await.unwrap();
        repo.create(&create_request(owner, "Also mine")).await.unwrap();
        repo.create(&create_request(other, "Not mine")).await.unwrap();

        let tasks = repo.list(&TaskFilter::for_user(owner, 0, 100)).await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t.user_id == owner));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_filters_completed(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user_id = seed_user(&mut conn, "completed@example.com").await;

        let mut repo = Tasks::new(&mut conn);
        let open = repo.create(&create_request(user_id, "Open")).await.unwrap();
        let done = repo.create(&create_request(user_id, "Done")).await.unwrap();
        repo.update(
            done.id,
            &TaskUpdateDBRequest {
                completed: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let filter = TaskFilter {
            user_id: Some(user_id),
            completed: Some(false),
            skip: 0,
            limit: 100,
        };
        let open_tasks = repo.list(&filter).await.unwrap();
        assert_eq!(open_tasks.len(), 1);
        assert_eq!(open_tasks[0].id, open.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_deleting_user_cascades_to_tasks(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user_id = seed_user(&mut conn, "cascade@example.com").await;

        let mut repo = Tasks::new(&mut conn);
        let task = repo.create(&create_request(user_id, "Orphan soon")).await.unwrap();

        let mut users = Users::new(&mut conn);
        assert!(users.delete(user_id).await.unwrap());

        let mut repo = Tasks::new(&mut conn);
        assert!(repo.get_by_id(task.id).await.unwrap().is_none());
    }
}
