//! Appointment model and rescheduling arithmetic.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Appointment lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Booked at its original time.
    Scheduled,
    /// Moved at least once.
    Rescheduled,
    /// Called off.
    Cancelled,
}

impl AppointmentStatus {
    /// Storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Rescheduled => "rescheduled",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse the storage representation.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "scheduled" => Some(Self::Scheduled),
            "rescheduled" => Some(Self::Rescheduled),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// A meeting between a client and an advisor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Appointment {
    /// Unique record identifier.
    pub id: String,
    /// Client attending.
    pub client_id: String,
    /// Advisor hosting, if assigned.
    pub advisor_id: Option<String>,
    /// Calendar title.
    pub title: String,
    /// Start time.
    pub starts_at: DateTime<Utc>,
    /// End time.
    pub ends_at: DateTime<Utc>,
    /// Lifecycle status.
    pub status: AppointmentStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Construct a new scheduled appointment.
    #[must_use]
    pub fn new(
        client_id: String,
        advisor_id: Option<String>,
        title: String,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            client_id,
            advisor_id,
            title,
            starts_at,
            ends_at,
            status: AppointmentStatus::Scheduled,
            created_at: now,
            updated_at: now,
        }
    }

    /// Start and end moved to `new_date`, keeping the duration.
    ///
    /// The start keeps its original time-of-day unless `new_time` is given.
    #[must_use]
    pub fn shifted_to(
        &self,
        new_date: NaiveDate,
        new_time: Option<NaiveTime>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        let duration = self.ends_at - self.starts_at;
        let time = new_time.unwrap_or_else(|| self.starts_at.time());
        let starts_at = new_date.and_time(time).and_utc();
        (starts_at, starts_at + duration)
    }
}
