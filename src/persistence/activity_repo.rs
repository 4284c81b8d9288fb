//! Activity log repository for `SQLite` persistence.
//!
//! Activities are append-only: the repository exposes insert and read
//! operations and nothing that mutates an existing row.

use std::sync::Arc;

use crate::models::activity::{ActivityKind, ActivityRecord, CallAnalysis, Direction, Utterance};
use crate::{AppError, Result};

use super::db::Database;
use super::parse_ts;

/// Repository for activity records.
#[derive(Clone)]
pub struct ActivityRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: String,
    client_id: String,
    kind: String,
    direction: String,
    description: String,
    external_ref: Option<String>,
    analysis: Option<String>,
    transcript: String,
    recording_url: Option<String>,
    created_at: String,
}

impl ActivityRow {
    fn into_activity(self) -> Result<ActivityRecord> {
        let kind = ActivityKind::parse(&self.kind)
            .ok_or_else(|| AppError::Db(format!("invalid activity kind: {}", self.kind)))?;
        let direction = Direction::parse(&self.direction)
            .ok_or_else(|| AppError::Db(format!("invalid direction: {}", self.direction)))?;
        let analysis: Option<CallAnalysis> = self
            .analysis
            .as_deref()
            .map(serde_json::from_str::<CallAnalysis>)
            .transpose()
            .map_err(|e| AppError::Db(format!("invalid analysis: {e}")))?;
        let transcript: Vec<Utterance> = serde_json::from_str(&self.transcript)
            .map_err(|e| AppError::Db(format!("invalid transcript: {e}")))?;

        Ok(ActivityRecord {
            id: self.id,
            client_id: self.client_id,
            kind,
            direction,
            description: self.description,
            external_ref: self.external_ref,
            analysis,
            transcript,
            recording_url: self.recording_url,
            created_at: parse_ts("created_at", &self.created_at)?,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, client_id, kind, direction, description, external_ref,
     analysis, transcript, recording_url, created_at FROM activity";

impl ActivityRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new activity.
    ///
    /// # Errors
    ///
    /// Returns `AppError::AlreadyExists` if another activity already carries
    /// the same external reference, or `AppError::Db` if the insert fails.
    pub async fn insert(&self, activity: &ActivityRecord) -> Result<ActivityRecord> {
        let analysis = activity
            .analysis
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AppError::Db(format!("cannot encode analysis: {e}")))?;
        let transcript = serde_json::to_string(&activity.transcript)
            .map_err(|e| AppError::Db(format!("cannot encode transcript: {e}")))?;

        sqlx::query(
            "INSERT INTO activity (id, client_id, kind, direction, description, external_ref,
             analysis, transcript, recording_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&activity.id)
        .bind(&activity.client_id)
        .bind(activity.kind.as_str())
        .bind(activity.direction.as_str())
        .bind(&activity.description)
        .bind(&activity.external_ref)
        .bind(&analysis)
        .bind(&transcript)
        .bind(&activity.recording_url)
        .bind(activity.created_at.to_rfc3339())
        .execute(self.db.as_ref())
        .await?;

        Ok(activity.clone())
    }

    /// Whether an activity already references this external event.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn exists_for_external_ref(&self, external_ref: &str) -> Result<bool> {
        let hit: Option<i64> = sqlx::query_scalar("SELECT 1 FROM activity WHERE external_ref = ?1")
            .bind(external_ref)
            .fetch_optional(self.db.as_ref())
            .await?;
        Ok(hit.is_some())
    }

    /// All activities for a client, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_for_client(&self, client_id: &str) -> Result<Vec<ActivityRecord>> {
        let query = format!("{SELECT_COLUMNS} WHERE client_id = ?1 ORDER BY created_at ASC");
        let rows: Vec<ActivityRow> = sqlx::query_as(&query)
            .bind(client_id)
            .fetch_all(self.db.as_ref())
            .await?;
        rows.into_iter().map(ActivityRow::into_activity).collect()
    }

    /// Activities carrying the given external reference (zero or one).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_by_external_ref(&self, external_ref: &str) -> Result<Vec<ActivityRecord>> {
        let query = format!("{SELECT_COLUMNS} WHERE external_ref = ?1");
        let rows: Vec<ActivityRow> = sqlx::query_as(&query)
            .bind(external_ref)
            .fetch_all(self.db.as_ref())
            .await?;
        rows.into_iter().map(ActivityRow::into_activity).collect()
    }

    /// Total stored activities.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activity")
            .fetch_one(self.db.as_ref())
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
