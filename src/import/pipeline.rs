//! Batch import execution.
//!
//! Upload and execution are separate steps: [`ImportPipeline::stage`]
//! parses the file and stores the rows on a `pending` job, and
//! [`ImportPipeline::execute`] runs them once the caller has supplied a
//! column mapping and a duplicate strategy. Rows are processed one after
//! another; a failing row is recorded on the job and never stops the batch.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, info_span, warn, Instrument};

use crate::config::ImportConfig;
use crate::dispatch::{SideEffectDispatcher, SideEffectPlan};
use crate::identity::{IdentityCandidates, IdentityResolver};
use crate::models::activity::{ActivityKind, ActivityRecord, Direction};
use crate::models::client::{validate_client_code, ClientRecord, IncomingClient};
use crate::models::import_job::{ImportJob, RowError};
use crate::persistence::client_repo::ClientRepo;
use crate::persistence::db::Database;
use crate::persistence::import_job_repo::ImportJobRepo;
use crate::policy::{ClientAction, ConflictPolicy, DuplicateStrategy};
use crate::{AppError, Result};

use super::mapping::{map_row, validate_mapping, ColumnMapping, ResolvedMapping};
use super::parse::{parse_table, preview, ParsedTable, TablePreview};

/// What happened to one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowOutcome {
    Created,
    Updated,
    Skipped,
}

/// Runs uploaded tables through resolution, policy, and storage.
#[derive(Clone)]
pub struct ImportPipeline {
    clients: ClientRepo,
    jobs: ImportJobRepo,
    resolver: IdentityResolver,
    dispatcher: SideEffectDispatcher,
    config: ImportConfig,
}

impl ImportPipeline {
    /// Create a pipeline over the shared pool.
    #[must_use]
    pub fn new(db: &Arc<Database>, config: ImportConfig) -> Self {
        let clients = ClientRepo::new(Arc::clone(db));
        Self {
            resolver: IdentityResolver::new(clients.clone()),
            clients,
            jobs: ImportJobRepo::new(Arc::clone(db)),
            dispatcher: SideEffectDispatcher::new(db),
            config,
        }
    }

    /// Parse an uploaded file and stage it on a new `pending` job.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Import` if the file cannot be parsed,
    /// `AppError::Validation` if it is empty or exceeds the row limit, or
    /// `AppError::Db` if the job cannot be stored.
    pub async fn stage(&self, filename: &str, bytes: &[u8]) -> Result<(ImportJob, TablePreview)> {
        let table = parse_table(filename, bytes)?;
        if table.is_empty() {
            return Err(AppError::Validation(format!("{filename}: no data rows")));
        }
        if table.len() > self.config.max_rows {
            return Err(AppError::Validation(format!(
                "{filename}: {} rows exceeds the limit of {}",
                table.len(),
                self.config.max_rows
            )));
        }

        let job = self
            .jobs
            .create(&ImportJob::new(filename.to_owned(), table.len()), &table)
            .await?;
        info!(job_id = %job.id, filename, rows = table.len(), "import staged");
        Ok((job, preview(&table, self.config.preview_rows)))
    }

    /// Current state of a job.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the job does not exist.
    pub async fn status(&self, job_id: &str) -> Result<ImportJob> {
        self.jobs.get(job_id).await
    }

    /// Process every staged row of a job and mark it completed.
    ///
    /// The mapping is validated before the job leaves `pending`, so a bad
    /// mapping can be corrected and resubmitted.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a mapping that names missing
    /// columns, `AppError::NotFound` for an unknown job,
    /// `AppError::AlreadyExists` for a job that already ran, or
    /// `AppError::Db` if the job record cannot be updated.
    pub async fn execute(
        &self,
        job_id: &str,
        mapping: &[ColumnMapping],
        strategy: DuplicateStrategy,
    ) -> Result<ImportJob> {
        let span = info_span!("import_execute", job_id = %job_id, strategy = strategy.as_str());
        self.run(job_id, mapping, strategy).instrument(span).await
    }

    async fn run(
        &self,
        job_id: &str,
        mapping: &[ColumnMapping],
        strategy: DuplicateStrategy,
    ) -> Result<ImportJob> {
        let table: ParsedTable = self.jobs.load_staged(job_id).await?;
        let resolved = validate_mapping(&table, mapping)?;
        let mut job = self.jobs.begin_processing(job_id, Utc::now()).await?;

        for (index, row) in table.rows.iter().enumerate() {
            let row_number = table.row_number(index);
            match self.process_row(&job, &resolved, row, strategy).await {
                Ok(RowOutcome::Created) => job.created_count += 1,
                Ok(RowOutcome::Updated) => job.updated_count += 1,
                Ok(RowOutcome::Skipped) => job.skipped_count += 1,
                Err(err) => {
                    warn!(row = row_number, %err, "import row failed");
                    job.error_count += 1;
                    job.errors.push(RowError {
                        row: row_number,
                        message: err.to_string(),
                    });
                }
            }
            job.processed_count += 1;

            if job.processed_count % self.config.progress_flush_every == 0 {
                if let Err(err) = self.jobs.flush_progress(&job).await {
                    warn!(%err, "failed to flush import progress");
                }
            }
        }

        let job = self.jobs.complete(&job, Utc::now()).await?;
        info!(
            created = job.created_count,
            updated = job.updated_count,
            skipped = job.skipped_count,
            errors = job.error_count,
            "import completed"
        );
        Ok(job)
    }

    async fn process_row(
        &self,
        job: &ImportJob,
        mapping: &ResolvedMapping,
        row: &[String],
        strategy: DuplicateStrategy,
    ) -> Result<RowOutcome> {
        let incoming = map_row(mapping, row)?;
        if let Some(code) = incoming.client_code.as_deref() {
            validate_client_code(code)?;
        }

        let candidates = IdentityCandidates {
            name: Some(incoming.name.clone()),
            emails: incoming.emails.clone(),
            phones: incoming.phones.clone(),
        };
        let existing = self.resolver.resolve(&candidates).await?;

        match ConflictPolicy::decide(existing.as_ref(), strategy, &incoming) {
            ClientAction::CreateNew(incoming) => {
                let client = self.create_client(&incoming).await?;
                let activity = ActivityRecord::new(
                    client.id.clone(),
                    ActivityKind::Import,
                    Direction::Inbound,
                    &format!("Imported from {}", job.filename),
                    None,
                );
                let report = self
                    .dispatcher
                    .dispatch(SideEffectPlan::activity_only(activity))
                    .await;
                if report.has_failures() {
                    warn!(client_id = %client.id, "import activity not recorded");
                }
                Ok(RowOutcome::Created)
            }
            ClientAction::UpdateFields { client_id, patch } => {
                self.clients.apply_patch(&client_id, &patch).await?;
                Ok(RowOutcome::Updated)
            }
            ClientAction::NoOp => Ok(RowOutcome::Skipped),
        }
    }

    async fn create_client(&self, incoming: &IncomingClient) -> Result<ClientRecord> {
        match incoming.client_code.clone() {
            Some(code) => {
                let record = ClientRecord::from_incoming(code, incoming);
                self.clients.create(&record).await
            }
            None => {
                let record = ClientRecord::from_incoming(String::new(), incoming);
                self.clients
                    .create_with_next_code(record, self.config.code_retry_limit)
                    .await
            }
        }
    }
}
