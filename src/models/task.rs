//! Follow-up task model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Task urgency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    /// Whenever convenient.
    Low,
    /// Normal follow-up.
    Medium,
    /// Needs attention today.
    High,
}

impl TaskPriority {
    /// Storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parse the storage representation.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Task completion state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Open.
    Pending,
    /// Marked done by a user.
    Completed,
}

impl TaskStatus {
    /// Storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }

    /// Parse the storage representation.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// A follow-up action item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRecord {
    /// Unique record identifier.
    pub id: String,
    /// Linked client, if any.
    pub client_id: Option<String>,
    /// Short title.
    pub title: String,
    /// Longer context.
    pub description: Option<String>,
    /// Urgency.
    pub priority: TaskPriority,
    /// Due timestamp.
    pub due_at: DateTime<Utc>,
    /// Completion state.
    pub status: TaskStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl TaskRecord {
    /// Construct a new pending task.
    #[must_use]
    pub fn new(
        client_id: Option<String>,
        title: String,
        description: Option<String>,
        priority: TaskPriority,
        due_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            client_id,
            title,
            description,
            priority,
            due_at,
            status: TaskStatus::Pending,
            created_at: Utc::now(),
        }
    }
}
