//! Notification repository for `SQLite` persistence.

use std::sync::Arc;

use crate::models::notification::NotificationRecord;
use crate::Result;

use super::db::Database;
use super::parse_ts;

/// Repository for advisor notifications.
#[derive(Clone)]
pub struct NotificationRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: String,
    recipient_id: String,
    kind: String,
    title: String,
    message: String,
    link: Option<String>,
    is_read: i64,
    created_at: String,
}

impl NotificationRow {
    fn into_notification(self) -> Result<NotificationRecord> {
        Ok(NotificationRecord {
            id: self.id,
            recipient_id: self.recipient_id,
            kind: self.kind,
            title: self.title,
            message: self.message,
            link: self.link,
            read: self.is_read != 0,
            created_at: parse_ts("created_at", &self.created_at)?,
        })
    }
}

impl NotificationRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new notification.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails.
    pub async fn insert(&self, notification: &NotificationRecord) -> Result<NotificationRecord> {
        sqlx::query(
            "INSERT INTO notification (id, recipient_id, kind, title, message, link, is_read, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&notification.id)
        .bind(&notification.recipient_id)
        .bind(&notification.kind)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.link)
        .bind(i64::from(notification.read))
        .bind(notification.created_at.to_rfc3339())
        .execute(self.db.as_ref())
        .await?;

        Ok(notification.clone())
    }

    /// Notifications addressed to one recipient, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_for_recipient(&self, recipient_id: &str) -> Result<Vec<NotificationRecord>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            "SELECT id, recipient_id, kind, title, message, link, is_read, created_at
             FROM notification WHERE recipient_id = ?1 ORDER BY created_at DESC",
        )
        .bind(recipient_id)
        .fetch_all(self.db.as_ref())
        .await?;
        rows.into_iter().map(NotificationRow::into_notification).collect()
    }
}
