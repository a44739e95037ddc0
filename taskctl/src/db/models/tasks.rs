//! Database models for tasks.

use crate::api::models::tasks::{TaskCreate, TaskPriority, TaskStatus, TaskUpdate};
use crate::types::{TaskId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for creating a new task
#[derive(Debug, Clone)]
pub struct TaskCreateDBRequest {
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
}

impl TaskCreateDBRequest {
    pub fn new(user_id: UserId, create: TaskCreate) -> Self {
        Self {
            user_id,
            // Title presence is validated at the API layer
            title: create.title.unwrap_or_default(),
            description: create.description,
            due_date: create.due_date,
            priority: create.priority,
            status: create.status,
        }
    }
}

/// Database request for updating a task
///
/// `None` fields are left untouched by the update query.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdateDBRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub completed: Option<bool>,
}

impl TaskUpdateDBRequest {
    pub fn new(update: TaskUpdate) -> Self {
        Self {
            title: update.title,
            description: update.description,
            due_date: update.due_date,
            priority: update.priority,
            status: update.status,
            completed: update.completed,
        }
    }
}

/// Database response for a task
#[derive(Debug, Clone, FromRow)]
pub struct TaskDBResponse {
    pub id: TaskId,
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
