//! Appointment repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::appointment::{Appointment, AppointmentStatus};
use crate::{AppError, Result};

use super::db::Database;
use super::parse_ts;

/// Repository for appointments.
#[derive(Clone)]
pub struct AppointmentRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct AppointmentRow {
    id: String,
    client_id: String,
    advisor_id: Option<String>,
    title: String,
    starts_at: String,
    ends_at: String,
    status: String,
    created_at: String,
    updated_at: String,
}

impl AppointmentRow {
    fn into_appointment(self) -> Result<Appointment> {
        let status = AppointmentStatus::parse(&self.status)
            .ok_or_else(|| AppError::Db(format!("invalid appointment status: {}", self.status)))?;
        Ok(Appointment {
            id: self.id,
            client_id: self.client_id,
            advisor_id: self.advisor_id,
            title: self.title,
            starts_at: parse_ts("starts_at", &self.starts_at)?,
            ends_at: parse_ts("ends_at", &self.ends_at)?,
            status,
            created_at: parse_ts("created_at", &self.created_at)?,
            updated_at: parse_ts("updated_at", &self.updated_at)?,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, client_id, advisor_id, title, starts_at, ends_at,
     status, created_at, updated_at FROM appointment";

impl AppointmentRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new appointment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails.
    pub async fn insert(&self, appointment: &Appointment) -> Result<Appointment> {
        sqlx::query(
            "INSERT INTO appointment (id, client_id, advisor_id, title, starts_at, ends_at,
             status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&appointment.id)
        .bind(&appointment.client_id)
        .bind(&appointment.advisor_id)
        .bind(&appointment.title)
        .bind(appointment.starts_at.to_rfc3339())
        .bind(appointment.ends_at.to_rfc3339())
        .bind(appointment.status.as_str())
        .bind(appointment.created_at.to_rfc3339())
        .bind(appointment.updated_at.to_rfc3339())
        .execute(self.db.as_ref())
        .await?;

        Ok(appointment.clone())
    }

    /// Retrieve an appointment by identifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Appointment>> {
        let query = format!("{SELECT_COLUMNS} WHERE id = ?1");
        let row: Option<AppointmentRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(self.db.as_ref())
            .await?;
        row.map(AppointmentRow::into_appointment).transpose()
    }

    /// Earliest live appointment for a client starting in `[from, until)`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn find_for_client_between(
        &self,
        client_id: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Option<Appointment>> {
        let query = format!(
            "{SELECT_COLUMNS} WHERE client_id = ?1 AND status != 'cancelled'
             AND starts_at >= ?2 AND starts_at < ?3
             ORDER BY starts_at ASC LIMIT 1"
        );
        let row: Option<AppointmentRow> = sqlx::query_as(&query)
            .bind(client_id)
            .bind(from.to_rfc3339())
            .bind(until.to_rfc3339())
            .fetch_optional(self.db.as_ref())
            .await?;
        row.map(AppointmentRow::into_appointment).transpose()
    }

    /// All appointments for a client, earliest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_for_client(&self, client_id: &str) -> Result<Vec<Appointment>> {
        let query = format!("{SELECT_COLUMNS} WHERE client_id = ?1 ORDER BY starts_at ASC");
        let rows: Vec<AppointmentRow> = sqlx::query_as(&query)
            .bind(client_id)
            .fetch_all(self.db.as_ref())
            .await?;
        rows.into_iter().map(AppointmentRow::into_appointment).collect()
    }

    /// Move an appointment and mark it rescheduled.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the appointment does not exist.
    pub async fn reschedule(
        &self,
        id: &str,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<Appointment> {
        let result = sqlx::query(
            "UPDATE appointment SET starts_at = ?1, ends_at = ?2, status = ?3, updated_at = ?4
             WHERE id = ?5",
        )
        .bind(starts_at.to_rfc3339())
        .bind(ends_at.to_rfc3339())
        .bind(AppointmentStatus::Rescheduled.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(self.db.as_ref())
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("appointment {id}")));
        }
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("appointment {id}")))
    }
}
