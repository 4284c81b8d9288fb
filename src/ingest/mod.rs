//! Webhook ingestion: end-of-call reports and workflow-automation actions.
//!
//! Every event runs resolve, mutate, then dispatch side effects. Only a
//! failure of the primary mutation is returned as an error; anything the
//! caller sent that cannot be applied becomes an [`IngestOutcome`].

pub mod actions;
pub mod call;
pub mod recording;
pub mod workflow;

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, info_span, warn, Instrument};

use crate::config::IngestConfig;
use crate::dispatch::{SideEffectDispatcher, SideEffectPlan, SideEffectReport};
use crate::identity::{IdentityCandidates, IdentityResolver};
use crate::models::activity::{ActivityKind, ActivityRecord};
use crate::models::client::{ClientRecord, IncomingClient};
use crate::models::event::{CallReport, WorkflowRequest};
use crate::models::notification::NotificationRecord;
use crate::models::task::{TaskPriority, TaskRecord};
use crate::persistence::activity_repo::ActivityRepo;
use crate::persistence::advisor_repo::AdvisorRepo;
use crate::persistence::appointment_repo::AppointmentRepo;
use crate::persistence::client_repo::ClientRepo;
use crate::persistence::db::Database;
use crate::Result;

pub use recording::{locate_recording, RecordingSource, RECORDING_SOURCES};
pub use workflow::WorkflowAction;

/// Report type the voice platform uses for finished calls.
pub const END_OF_CALL_REPORT: &str = "end-of-call-report";

/// How an event was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new client or appointment was created.
    Created,
    /// An existing client or appointment was changed or logged against.
    Updated,
    /// The event had already been ingested.
    Duplicate,
    /// The event refers to something that does not exist.
    NotFound(String),
    /// The event cannot be applied.
    Rejected(String),
}

impl IngestOutcome {
    /// Wire label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Duplicate => "duplicate",
            Self::NotFound(_) => "not_found",
            Self::Rejected(_) => "rejected",
        }
    }

    /// Explanation for `NotFound` and `Rejected`.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::NotFound(reason) | Self::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Result of ingesting one event.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// How the event was handled.
    pub outcome: IngestOutcome,
    /// Client the event was applied to.
    pub client_id: Option<String>,
    /// Side-effect outcomes, when effects were attempted.
    pub effects: Option<SideEffectReport>,
}

impl IngestReport {
    fn without_effects(outcome: IngestOutcome) -> Self {
        Self {
            outcome,
            client_id: None,
            effects: None,
        }
    }

    /// Event could not be applied.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::without_effects(IngestOutcome::Rejected(reason.into()))
    }

    /// Event refers to a missing record.
    #[must_use]
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::without_effects(IngestOutcome::NotFound(reason.into()))
    }

    /// Event was already ingested.
    #[must_use]
    pub fn duplicate() -> Self {
        Self::without_effects(IngestOutcome::Duplicate)
    }

    /// Mutation applied and effects dispatched. An activity the store had
    /// already seen turns the outcome into `Duplicate`.
    #[must_use]
    pub fn applied(outcome: IngestOutcome, client_id: String, effects: SideEffectReport) -> Self {
        let outcome = if effects.duplicate {
            IngestOutcome::Duplicate
        } else {
            outcome
        };
        Self {
            outcome,
            client_id: Some(client_id),
            effects: Some(effects),
        }
    }
}

/// Applies inbound webhook events to the client store.
#[derive(Clone)]
pub struct Ingestor {
    clients: ClientRepo,
    activities: ActivityRepo,
    appointments: AppointmentRepo,
    advisors: AdvisorRepo,
    resolver: IdentityResolver,
    dispatcher: SideEffectDispatcher,
    config: IngestConfig,
    code_retry_limit: u32,
}

impl Ingestor {
    /// Create an ingestor over the shared pool.
    #[must_use]
    pub fn new(db: &Arc<Database>, config: IngestConfig, code_retry_limit: u32) -> Self {
        let clients = ClientRepo::new(Arc::clone(db));
        Self {
            resolver: IdentityResolver::new(clients.clone()),
            clients,
            activities: ActivityRepo::new(Arc::clone(db)),
            appointments: AppointmentRepo::new(Arc::clone(db)),
            advisors: AdvisorRepo::new(Arc::clone(db)),
            dispatcher: SideEffectDispatcher::new(db),
            config,
            code_retry_limit,
        }
    }

    /// Ingest an end-of-call report.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if resolving or creating the client fails.
    pub async fn ingest_call(&self, report: CallReport) -> Result<IngestReport> {
        let call_id = call::call_id(&report).map(str::to_owned);
        let span = info_span!("ingest_call", call_id = call_id.as_deref().unwrap_or(""));
        self.handle_call(&report, call_id).instrument(span).await
    }

    async fn handle_call(&self, report: &CallReport, call_id: Option<String>) -> Result<IngestReport> {
        if let Some(kind) = report.report_type.as_deref() {
            if !kind.eq_ignore_ascii_case(END_OF_CALL_REPORT) {
                return Ok(IngestReport::rejected(format!("ignored report type {kind}")));
            }
        }
        // Without a call id there is nothing to deduplicate on; the call is
        // still logged.
        match call_id.as_deref() {
            Some(id) if self.activities.exists_for_external_ref(id).await? => {
                info!("call already ingested");
                return Ok(IngestReport::duplicate());
            }
            Some(_) => {}
            None => warn!("call report has no call id, ingesting without deduplication"),
        }
        let Some(number) = call::caller_number(report) else {
            return Ok(IngestReport::rejected("call report has no caller number"));
        };

        let incoming = IncomingClient {
            name: number.to_owned(),
            phones: vec![number.to_owned()],
            ..IncomingClient::default()
        };
        let (client, created) = self
            .resolve_or_create(&IdentityCandidates::from_phone(number), &incoming)
            .await?;

        let now = Utc::now();
        let analysis = call::analysis(report);
        let description = call::describe(report, number);
        let summary = analysis.as_ref().and_then(|a| a.summary.clone());

        let activity = ActivityRecord::new(
            client.id.clone(),
            ActivityKind::Call,
            call::direction(report),
            &description,
            call_id,
        )
        .with_transcript(call::transcript(report))
        .with_recording(locate_recording(report))
        .with_analysis(analysis.clone());

        let mut plan = SideEffectPlan::activity_only(activity)
            .with_notification(advisor_notice(
                &client,
                "call",
                format!("Call from {}", client.name),
                summary.clone().unwrap_or(description),
            ))
            .touching(now);
        if let Some(next_action) = analysis.as_ref().and_then(|a| a.next_action.as_deref()) {
            plan = plan.with_task(TaskRecord::new(
                Some(client.id.clone()),
                call::follow_up_title(next_action),
                summary,
                TaskPriority::Medium,
                now + Duration::days(self.config.follow_up_due_days),
            ));
        }

        let effects = self.dispatcher.dispatch(plan).await;
        if effects.duplicate && created {
            // A concurrent delivery of the same call won the activity insert;
            // the lead created for this delivery has nothing attached to it.
            self.discard_lead(&client.id).await;
            return Ok(IngestReport::duplicate());
        }
        let outcome = if created {
            IngestOutcome::Created
        } else {
            IngestOutcome::Updated
        };
        Ok(IngestReport::applied(outcome, client.id, effects))
    }

    async fn discard_lead(&self, client_id: &str) {
        match self.clients.delete(client_id).await {
            Ok(()) => info!(client_id, "discarded lead from duplicate delivery"),
            Err(err) => warn!(client_id, %err, "failed to discard lead from duplicate delivery"),
        }
    }

    /// Ingest a workflow-automation request.
    ///
    /// Unknown actions and payloads that fail validation are reported as
    /// `Rejected`, not as errors.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the primary mutation fails.
    pub async fn ingest_workflow(&self, request: &WorkflowRequest) -> Result<IngestReport> {
        let action = match WorkflowAction::from_request(request) {
            Ok(action) => action,
            Err(err) if err.is_validation() => return Ok(IngestReport::rejected(err.to_string())),
            Err(err) => return Err(err),
        };
        let span = info_span!("ingest_workflow", action = action.name());
        match self.apply_action(action).instrument(span).await {
            Err(err) if err.is_validation() => Ok(IngestReport::rejected(err.to_string())),
            other => other,
        }
    }

    async fn resolve_or_create(
        &self,
        candidates: &IdentityCandidates,
        incoming: &IncomingClient,
    ) -> Result<(ClientRecord, bool)> {
        if let Some(client) = self.resolver.resolve(candidates).await? {
            return Ok((client, false));
        }
        let client = self.create_lead(incoming).await?;
        Ok((client, true))
    }

    async fn create_lead(&self, incoming: &IncomingClient) -> Result<ClientRecord> {
        let record = ClientRecord::from_incoming(String::new(), incoming);
        let client = self
            .clients
            .create_with_next_code(record, self.code_retry_limit)
            .await?;
        info!(client_id = %client.id, code = %client.client_code, "lead created");
        Ok(client)
    }
}

/// Notification for the client's assigned advisor, if there is one.
fn advisor_notice(
    client: &ClientRecord,
    kind: &str,
    title: String,
    message: String,
) -> Option<NotificationRecord> {
    client.assigned_advisor_id.as_ref().map(|advisor| {
        NotificationRecord::new(
            advisor.clone(),
            kind,
            title,
            message,
            Some(format!("/clients/{}", client.id)),
        )
    })
}
