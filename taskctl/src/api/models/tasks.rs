//! API request/response models for tasks.

use crate::db::models::tasks::TaskDBResponse;
use crate::types::{TaskId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Urgency levels a task can be filed under
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Baja,
    Media,
    Alta,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Inactive,
}

// Task request models
#[derive(Debug, Clone, Serialize, Deserialize, Default, ToSchema)]
pub struct TaskCreate {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "dueDate")]
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, ToSchema)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "dueDate")]
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub completed: Option<bool>,
}

// Task response models
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskResponse {
    #[serde(rename = "_id")]
    #[schema(value_type = String, format = "uuid")]
    pub id: TaskId,
    /// Owner of the task
    #[serde(rename = "user")]
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    #[serde(rename = "dueDate")]
    pub due_date: Option<DateTime<Utc>>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub completed: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<TaskDBResponse> for TaskResponse {
    fn from(db: TaskDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            title: db.title,
            description: db.description,
            due_date: db.due_date,
            priority: db.priority,
            status: db.status,
            completed: db.completed,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Listing response, shaped as `{ "length": N, "tasks": [...] }`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskListResponse {
    pub length: usize,
    pub tasks: Vec<TaskResponse>,
}

impl TaskListResponse {
    pub fn new(tasks: Vec<TaskResponse>) -> Self {
        Self { length: tasks.len(), tasks }
    }
}
