//! Advisor roster repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::AdvisorSeed;
use crate::models::advisor::Advisor;
use crate::Result;

use super::db::Database;

/// Repository for advisors.
#[derive(Clone)]
pub struct AdvisorRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct AdvisorRow {
    id: String,
    name: String,
    email: String,
    active: i64,
}

impl From<AdvisorRow> for Advisor {
    fn from(row: AdvisorRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            active: row.active != 0,
        }
    }
}

impl AdvisorRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert or refresh an advisor keyed by id.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the write fails.
    pub async fn upsert(&self, advisor: &Advisor) -> Result<()> {
        sqlx::query(
            "INSERT INTO advisor (id, name, email, active) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, email = excluded.email,
             active = excluded.active",
        )
        .bind(&advisor.id)
        .bind(&advisor.name)
        .bind(&advisor.email)
        .bind(i64::from(advisor.active))
        .execute(self.db.as_ref())
        .await?;
        Ok(())
    }

    /// Upsert every configured advisor.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if any write fails.
    pub async fn seed(&self, seeds: &[AdvisorSeed]) -> Result<usize> {
        for seed in seeds {
            self.upsert(&Advisor::from(seed)).await?;
        }
        Ok(seeds.len())
    }

    /// Retrieve an advisor by id.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Advisor>> {
        let row: Option<AdvisorRow> =
            sqlx::query_as("SELECT id, name, email, active FROM advisor WHERE id = ?1")
                .bind(id)
                .fetch_optional(self.db.as_ref())
                .await?;
        Ok(row.map(Advisor::from))
    }

    /// First active advisor, by name, with no live appointment overlapping
    /// `[starts_at, ends_at)`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn first_available(
        &self,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<Option<Advisor>> {
        let row: Option<AdvisorRow> = sqlx::query_as(
            "SELECT a.id, a.name, a.email, a.active FROM advisor a
             WHERE a.active = 1 AND NOT EXISTS (
                 SELECT 1 FROM appointment p
                 WHERE p.advisor_id = a.id AND p.status != 'cancelled'
                   AND p.starts_at < ?2 AND p.ends_at > ?1
             )
             ORDER BY a.name ASC, a.id ASC LIMIT 1",
        )
        .bind(starts_at.to_rfc3339())
        .bind(ends_at.to_rfc3339())
        .fetch_optional(self.db.as_ref())
        .await?;
        Ok(row.map(Advisor::from))
    }
}
