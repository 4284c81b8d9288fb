//! Global configuration parsing and validation.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::{AppError, Result};

/// Environment variable that overrides `[database].path`.
pub const DB_PATH_ENV: &str = "CRM_INGEST_DB_PATH";

/// `SQLite` connection settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to the database file.
    pub path: PathBuf,
    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection before failing.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
}

fn default_max_connections() -> u32 {
    8
}

fn default_acquire_timeout() -> u64 {
    30
}

/// Batch import tuning.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ImportConfig {
    /// Rows returned by an upload preview.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
    /// Rows processed between progress writes to the job record.
    #[serde(default = "default_progress_flush_every")]
    pub progress_flush_every: usize,
    /// Largest accepted file, in data rows.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
    /// Attempts at generating a fresh client code after a uniqueness conflict.
    #[serde(default = "default_code_retry_limit")]
    pub code_retry_limit: u32,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            preview_rows: default_preview_rows(),
            progress_flush_every: default_progress_flush_every(),
            max_rows: default_max_rows(),
            code_retry_limit: default_code_retry_limit(),
        }
    }
}

fn default_preview_rows() -> usize {
    5
}

fn default_progress_flush_every() -> usize {
    25
}

fn default_max_rows() -> usize {
    10_000
}

fn default_code_retry_limit() -> u32 {
    3
}

/// Webhook ingestion tuning.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct IngestConfig {
    /// Days until a follow-up task created from a call is due.
    #[serde(default = "default_follow_up_due_days")]
    pub follow_up_due_days: i64,
    /// Hours until a callback task created from a left message is due.
    #[serde(default = "default_callback_due_hours")]
    pub callback_due_hours: i64,
    /// Appointment length when the payload supplies no end time.
    #[serde(default = "default_appointment_minutes")]
    pub default_appointment_minutes: i64,
    /// Longest appointment a webhook may book.
    #[serde(default = "default_max_appointment_minutes")]
    pub max_appointment_minutes: i64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            follow_up_due_days: default_follow_up_due_days(),
            callback_due_hours: default_callback_due_hours(),
            default_appointment_minutes: default_appointment_minutes(),
            max_appointment_minutes: default_max_appointment_minutes(),
        }
    }
}

fn default_follow_up_due_days() -> i64 {
    1
}

fn default_callback_due_hours() -> i64 {
    24
}

fn default_appointment_minutes() -> i64 {
    60
}

fn default_max_appointment_minutes() -> i64 {
    24 * 60
}

/// Advisor roster entry seeded into the database at startup.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AdvisorSeed {
    /// Stable advisor identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Whether the advisor takes new appointments.
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

fn default_http_port() -> u16 {
    8080
}

fn default_http_host() -> String {
    "127.0.0.1".into()
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Database settings.
    pub database: DatabaseConfig,
    /// Interface the HTTP server binds to.
    #[serde(default = "default_http_host")]
    pub http_host: String,
    /// HTTP port for the import and webhook endpoints.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Batch import settings.
    #[serde(default)]
    pub import: ImportConfig,
    /// Webhook ingestion settings.
    #[serde(default)]
    pub ingest: IngestConfig,
    /// Advisor roster.
    #[serde(default)]
    pub advisors: Vec<AdvisorSeed>,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply the `CRM_INGEST_DB_PATH` override when it is set and non-empty.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = env::var(DB_PATH_ENV) {
            if !path.trim().is_empty() {
                info!(path = %path, "database path overridden from environment");
                self.database.path = PathBuf::from(path);
            }
        }
    }

    /// Path to the `SQLite` database file.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.database.path
    }

    fn validate(&mut self) -> Result<()> {
        if self.database.max_connections == 0 {
            return Err(AppError::Config(
                "database.max_connections must be greater than zero".into(),
            ));
        }
        if self.import.progress_flush_every == 0 {
            return Err(AppError::Config(
                "import.progress_flush_every must be greater than zero".into(),
            ));
        }
        if self.import.max_rows == 0 {
            return Err(AppError::Config(
                "import.max_rows must be greater than zero".into(),
            ));
        }
        if self.ingest.follow_up_due_days < 1 {
            return Err(AppError::Config(
                "ingest.follow_up_due_days must be at least one".into(),
            ));
        }
        if self.ingest.callback_due_hours < 1 || self.ingest.default_appointment_minutes < 1 {
            return Err(AppError::Config(
                "ingest durations must be positive".into(),
            ));
        }
        if self.ingest.default_appointment_minutes > self.ingest.max_appointment_minutes {
            return Err(AppError::Config(
                "ingest.default_appointment_minutes exceeds ingest.max_appointment_minutes".into(),
            ));
        }

        if self.http_host.parse::<std::net::IpAddr>().is_err() {
            return Err(AppError::Config(format!(
                "http_host is not an IP address: {}",
                self.http_host
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for advisor in &self.advisors {
            if !seen.insert(advisor.id.as_str()) {
                return Err(AppError::Config(format!(
                    "duplicate advisor id: {}",
                    advisor.id
                )));
            }
        }

        Ok(())
    }
}
