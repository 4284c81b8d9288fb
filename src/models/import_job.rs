//! Batch import job record and its public status view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status for an import job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    /// File parsed and staged; not yet executed.
    Pending,
    /// Rows are being processed.
    Processing,
    /// Every row has been processed. Terminal.
    Completed,
}

impl ImportStatus {
    /// Storage and wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
        }
    }

    /// Parse the storage representation.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// A failed row, numbered as the user sees it in their spreadsheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowError {
    /// 1-based row number including the header row.
    pub row: usize,
    /// Human-readable failure.
    pub message: String,
}

/// One batch-import execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportJob {
    /// Unique record identifier.
    pub id: String,
    /// Uploaded file name.
    pub filename: String,
    /// Data rows in the file.
    pub total_rows: usize,
    /// Rows processed so far.
    pub processed_count: usize,
    /// Rows that created a client.
    pub created_count: usize,
    /// Rows that updated an existing client.
    pub updated_count: usize,
    /// Rows skipped as duplicates.
    pub skipped_count: usize,
    /// Rows that failed.
    pub error_count: usize,
    /// Per-row failures.
    pub errors: Vec<RowError>,
    /// Lifecycle status.
    pub status: ImportStatus,
    /// Upload timestamp.
    pub created_at: DateTime<Utc>,
    /// When processing began.
    pub started_at: Option<DateTime<Utc>>,
    /// When processing finished.
    pub completed_at: Option<DateTime<Utc>>,
}

impl ImportJob {
    /// Construct a new pending job for an uploaded file.
    #[must_use]
    pub fn new(filename: String, total_rows: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            filename,
            total_rows,
            processed_count: 0,
            created_count: 0,
            updated_count: 0,
            skipped_count: 0,
            error_count: 0,
            errors: Vec::new(),
            status: ImportStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Rows that created or updated a client.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.created_count + self.updated_count
    }

    /// Public status view.
    #[must_use]
    pub fn status_view(&self) -> ImportJobStatus {
        ImportJobStatus {
            id: self.id.clone(),
            filename: self.filename.clone(),
            total_records: self.total_rows,
            status: self.status,
            processed_count: self.processed_count,
            success_count: self.success_count(),
            created_count: self.created_count,
            updated_count: self.updated_count,
            error_count: self.error_count,
            skipped_count: self.skipped_count,
            errors: self.errors.clone(),
            completed_at: self.completed_at,
        }
    }
}

/// Wire shape returned to the UI when polling a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportJobStatus {
    /// Job identifier.
    pub id: String,
    /// Uploaded file name.
    pub filename: String,
    /// Data rows in the file.
    pub total_records: usize,
    /// Lifecycle status.
    pub status: ImportStatus,
    /// Rows processed so far.
    pub processed_count: usize,
    /// Created plus updated rows.
    pub success_count: usize,
    /// Rows that created a client.
    pub created_count: usize,
    /// Rows that updated an existing client.
    pub updated_count: usize,
    /// Rows that failed.
    pub error_count: usize,
    /// Rows skipped as duplicates.
    pub skipped_count: usize,
    /// Per-row failures.
    pub errors: Vec<RowError>,
    /// When processing finished.
    pub completed_at: Option<DateTime<Utc>>,
}
