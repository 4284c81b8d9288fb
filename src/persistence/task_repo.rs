//! Task repository for `SQLite` persistence.

use std::sync::Arc;

use crate::models::task::{TaskPriority, TaskRecord, TaskStatus};
use crate::{AppError, Result};

use super::db::Database;
use super::parse_ts;

/// Repository for follow-up tasks.
#[derive(Clone)]
pub struct TaskRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    client_id: Option<String>,
    title: String,
    description: Option<String>,
    priority: String,
    due_at: String,
    status: String,
    created_at: String,
}

impl TaskRow {
    fn into_task(self) -> Result<TaskRecord> {
        let priority = TaskPriority::parse(&self.priority)
            .ok_or_else(|| AppError::Db(format!("invalid task priority: {}", self.priority)))?;
        let status = TaskStatus::parse(&self.status)
            .ok_or_else(|| AppError::Db(format!("invalid task status: {}", self.status)))?;

        Ok(TaskRecord {
            id: self.id,
            client_id: self.client_id,
            title: self.title,
            description: self.description,
            priority,
            due_at: parse_ts("due_at", &self.due_at)?,
            status,
            created_at: parse_ts("created_at", &self.created_at)?,
        })
    }
}

impl TaskRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new task.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails.
    pub async fn insert(&self, task: &TaskRecord) -> Result<TaskRecord> {
        sqlx::query(
            "INSERT INTO task (id, client_id, title, description, priority, due_at, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&task.id)
        .bind(&task.client_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.priority.as_str())
        .bind(task.due_at.to_rfc3339())
        .bind(task.status.as_str())
        .bind(task.created_at.to_rfc3339())
        .execute(self.db.as_ref())
        .await?;

        Ok(task.clone())
    }

    /// Tasks linked to a client, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_for_client(&self, client_id: &str) -> Result<Vec<TaskRecord>> {
        let rows: Vec<TaskRow> = sqlx::query_as(
            "SELECT id, client_id, title, description, priority, due_at, status, created_at
             FROM task WHERE client_id = ?1 ORDER BY created_at ASC",
        )
        .bind(client_id)
        .fetch_all(self.db.as_ref())
        .await?;
        rows.into_iter().map(TaskRow::into_task).collect()
    }

    /// Total stored tasks.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM task")
            .fetch_one(self.db.as_ref())
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
