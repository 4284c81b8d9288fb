//! Per-recipient notification model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An alert addressed to one advisor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationRecord {
    /// Unique record identifier.
    pub id: String,
    /// Advisor who receives the alert.
    pub recipient_id: String,
    /// Alert category (`call_completed`, `appointment_booked`, ...).
    pub kind: String,
    /// Headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// In-app link target.
    pub link: Option<String>,
    /// Whether the recipient has read it.
    pub read: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    /// Construct a new unread notification.
    #[must_use]
    pub fn new(
        recipient_id: String,
        kind: &str,
        title: String,
        message: String,
        link: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            recipient_id,
            kind: kind.to_owned(),
            title,
            message,
            link,
            read: false,
            created_at: Utc::now(),
        }
    }
}
