//! Import job repository for `SQLite` persistence.
//!
//! A job moves `pending -> processing -> completed`. Each transition is a
//! conditional UPDATE on the current status, so a job can only be started
//! once and completed once, even with concurrent callers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::import_job::{ImportJob, ImportStatus, RowError};
use crate::{AppError, Result};

use super::db::Database;
use super::{parse_opt_ts, parse_ts};

/// Repository for import jobs and their staged rows.
#[derive(Clone)]
pub struct ImportJobRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct ImportJobRow {
    id: String,
    filename: String,
    total_rows: i64,
    processed_count: i64,
    created_count: i64,
    updated_count: i64,
    skipped_count: i64,
    error_count: i64,
    errors: String,
    status: String,
    created_at: String,
    started_at: Option<String>,
    completed_at: Option<String>,
}

fn to_count(column: &str, raw: i64) -> Result<usize> {
    usize::try_from(raw).map_err(|_| AppError::Db(format!("negative {column}: {raw}")))
}

fn to_column(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

impl ImportJobRow {
    fn into_job(self) -> Result<ImportJob> {
        let status = ImportStatus::parse(&self.status)
            .ok_or_else(|| AppError::Db(format!("invalid import status: {}", self.status)))?;
        let errors: Vec<RowError> = serde_json::from_str(&self.errors)
            .map_err(|e| AppError::Db(format!("invalid row errors: {e}")))?;

        Ok(ImportJob {
            id: self.id,
            filename: self.filename,
            total_rows: to_count("total_rows", self.total_rows)?,
            processed_count: to_count("processed_count", self.processed_count)?,
            created_count: to_count("created_count", self.created_count)?,
            updated_count: to_count("updated_count", self.updated_count)?,
            skipped_count: to_count("skipped_count", self.skipped_count)?,
            error_count: to_count("error_count", self.error_count)?,
            errors,
            status,
            created_at: parse_ts("created_at", &self.created_at)?,
            started_at: parse_opt_ts("started_at", self.started_at.as_deref())?,
            completed_at: parse_opt_ts("completed_at", self.completed_at.as_deref())?,
        })
    }
}

fn errors_json(errors: &[RowError]) -> Result<String> {
    serde_json::to_string(errors).map_err(|e| AppError::Db(format!("cannot encode row errors: {e}")))
}

impl ImportJobRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a pending job together with the rows it will process.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the staged rows cannot be encoded or the
    /// insert fails.
    pub async fn create<T: Serialize>(&self, job: &ImportJob, staged: &T) -> Result<ImportJob> {
        let staged = serde_json::to_string(staged)
            .map_err(|e| AppError::Db(format!("cannot encode staged rows: {e}")))?;

        sqlx::query(
            "INSERT INTO import_job (id, filename, total_rows, processed_count, created_count,
             updated_count, skipped_count, error_count, errors, status, staged_table, created_at)
             VALUES (?1, ?2, ?3, 0, 0, 0, 0, 0, ?4, ?5, ?6, ?7)",
        )
        .bind(&job.id)
        .bind(&job.filename)
        .bind(to_column(job.total_rows))
        .bind(errors_json(&job.errors)?)
        .bind(job.status.as_str())
        .bind(&staged)
        .bind(job.created_at.to_rfc3339())
        .execute(self.db.as_ref())
        .await?;

        Ok(job.clone())
    }

    /// Retrieve a job by identifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the job does not exist.
    pub async fn get(&self, id: &str) -> Result<ImportJob> {
        let row: Option<ImportJobRow> = sqlx::query_as(
            "SELECT id, filename, total_rows, processed_count, created_count, updated_count,
             skipped_count, error_count, errors, status, created_at, started_at, completed_at
             FROM import_job WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(self.db.as_ref())
        .await?;

        row.ok_or_else(|| AppError::NotFound(format!("import job {id}")))?
            .into_job()
    }

    /// Load the rows staged at upload time.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the job does not exist, or
    /// `AppError::AlreadyExists` if the job already ran and its rows were
    /// released.
    pub async fn load_staged<T: DeserializeOwned>(&self, id: &str) -> Result<T> {
        let staged: Option<Option<String>> =
            sqlx::query_scalar("SELECT staged_table FROM import_job WHERE id = ?1")
                .bind(id)
                .fetch_optional(self.db.as_ref())
                .await?;

        match staged {
            None => Err(AppError::NotFound(format!("import job {id}"))),
            Some(None) => Err(AppError::AlreadyExists(format!(
                "import job {id} has already been executed"
            ))),
            Some(Some(raw)) => serde_json::from_str(&raw)
                .map_err(|e| AppError::Db(format!("invalid staged rows: {e}"))),
        }
    }

    /// Move a job from `pending` to `processing`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the job does not exist, or
    /// `AppError::AlreadyExists` if it has already left `pending`.
    pub async fn begin_processing(&self, id: &str, started_at: DateTime<Utc>) -> Result<ImportJob> {
        let result = sqlx::query(
            "UPDATE import_job SET status = 'processing', started_at = ?1
             WHERE id = ?2 AND status = 'pending'",
        )
        .bind(started_at.to_rfc3339())
        .bind(id)
        .execute(self.db.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            let job = self.get(id).await?;
            return Err(AppError::AlreadyExists(format!(
                "import job {id} is already {}",
                job.status.as_str()
            )));
        }
        self.get(id).await
    }

    /// Write intermediate counters while a job is processing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn flush_progress(&self, job: &ImportJob) -> Result<()> {
        sqlx::query(
            "UPDATE import_job SET processed_count = ?1, created_count = ?2, updated_count = ?3,
             skipped_count = ?4, error_count = ?5, errors = ?6
             WHERE id = ?7 AND status = 'processing'",
        )
        .bind(to_column(job.processed_count))
        .bind(to_column(job.created_count))
        .bind(to_column(job.updated_count))
        .bind(to_column(job.skipped_count))
        .bind(to_column(job.error_count))
        .bind(errors_json(&job.errors)?)
        .bind(&job.id)
        .execute(self.db.as_ref())
        .await?;
        Ok(())
    }

    /// Write final counters, mark the job `completed`, and release the
    /// staged rows.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the job was not `processing` or the update
    /// fails.
    pub async fn complete(&self, job: &ImportJob, completed_at: DateTime<Utc>) -> Result<ImportJob> {
        let result = sqlx::query(
            "UPDATE import_job SET processed_count = ?1, created_count = ?2, updated_count = ?3,
             skipped_count = ?4, error_count = ?5, errors = ?6, status = 'completed',
             completed_at = ?7, staged_table = NULL
             WHERE id = ?8 AND status = 'processing'",
        )
        .bind(to_column(job.processed_count))
        .bind(to_column(job.created_count))
        .bind(to_column(job.updated_count))
        .bind(to_column(job.skipped_count))
        .bind(to_column(job.error_count))
        .bind(errors_json(&job.errors)?)
        .bind(completed_at.to_rfc3339())
        .bind(&job.id)
        .execute(self.db.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Db(format!(
                "import job {} was not processing at completion",
                job.id
            )));
        }
        self.get(&job.id).await
    }
}
