//! Handlers for each [`WorkflowAction`] variant.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tracing::{info, warn};

use crate::dispatch::SideEffectPlan;
use crate::identity::IdentityCandidates;
use crate::models::activity::{ActivityKind, ActivityRecord, Direction};
use crate::models::advisor::Advisor;
use crate::models::appointment::Appointment;
use crate::models::client::{validate_client_code, ClientPatch, ClientRecord, PipelineStage};
use crate::models::notification::NotificationRecord;
use crate::models::task::{TaskPriority, TaskRecord};
use crate::policy::{ClientAction, ConflictPolicy, DuplicateStrategy};
use crate::{AppError, Result};

use super::workflow::{
    parse_date, parse_time, present, AppointmentData, LeadData, MessageData, RescheduleData,
    TagList, TransferData, UpdateClientData, WorkflowAction,
};
use super::{advisor_notice, IngestOutcome, IngestReport, Ingestor};

/// Start hour used when an appointment request carries no time.
const DEFAULT_START_HOUR: u32 = 9;

fn stamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn with_notes(description: String, notes: Option<&str>) -> String {
    match present(notes) {
        Some(notes) => format!("{description}: {notes}"),
        None => description,
    }
}

impl Ingestor {
    pub(super) async fn apply_action(&self, action: WorkflowAction) -> Result<IngestReport> {
        match action {
            WorkflowAction::CreateLead(data) => self.create_lead_action(data).await,
            WorkflowAction::UpdateClient(data) => self.update_client_action(data).await,
            WorkflowAction::CreateAppointment(data) => self.create_appointment_action(data).await,
            WorkflowAction::RescheduleAppointment(data) => self.reschedule_action(data).await,
            WorkflowAction::LogMessage(data) => self.log_message_action(data).await,
            WorkflowAction::LogTransfer(data) => self.log_transfer_action(data).await,
        }
    }

    async fn create_lead_action(&self, data: LeadData) -> Result<IngestReport> {
        let contact = &data.contact;
        if !contact.has_identifier() && contact.display_name().is_none() {
            return Ok(IngestReport::rejected("lead has no name, email, or phone"));
        }
        let mut incoming = contact.to_incoming();
        incoming.tags = data.tags.clone().map(TagList::into_vec).unwrap_or_default();

        let existing = if contact.has_identifier() {
            self.resolver.resolve(&contact.candidates()).await?
        } else {
            None
        };

        let (client, outcome) =
            match ConflictPolicy::decide(existing.as_ref(), DuplicateStrategy::Update, &incoming) {
                ClientAction::CreateNew(incoming) => {
                    (self.create_lead(&incoming).await?, IngestOutcome::Created)
                }
                ClientAction::UpdateFields { client_id, patch } => (
                    self.clients.apply_patch(&client_id, &patch).await?,
                    IngestOutcome::Updated,
                ),
                ClientAction::NoOp => return Ok(IngestReport::duplicate()),
            };

        let description = match present(data.source.as_deref()) {
            Some(source) => format!("Lead captured from {source}"),
            None => "Lead captured by automation".to_owned(),
        };
        let activity = ActivityRecord::new(
            client.id.clone(),
            ActivityKind::Note,
            Direction::Inbound,
            &with_notes(description, data.notes.as_deref()),
            None,
        );
        let effects = self
            .dispatcher
            .dispatch(SideEffectPlan::activity_only(activity).touching(Utc::now()))
            .await;
        Ok(IngestReport::applied(outcome, client.id, effects))
    }

    async fn update_client_action(&self, data: UpdateClientData) -> Result<IngestReport> {
        let patch = data.to_patch()?;

        let mut client = None;
        if let Some(code) = present(data.client_code.as_deref()) {
            validate_client_code(code)?;
            client = self.clients.find_by_code(code).await?;
        }
        if client.is_none() && data.contact.has_identifier() {
            client = self.resolver.resolve(&data.contact.candidates()).await?;
        }
        let Some(client) = client else {
            return Ok(IngestReport::not_found("no client matches the update"));
        };

        let updated = self.clients.apply_patch(&client.id, &patch).await?;
        let activity = ActivityRecord::new(
            updated.id.clone(),
            ActivityKind::Note,
            Direction::Inbound,
            &with_notes("Client updated by automation".to_owned(), data.notes.as_deref()),
            None,
        );
        let effects = self
            .dispatcher
            .dispatch(SideEffectPlan::activity_only(activity))
            .await;
        Ok(IngestReport::applied(IngestOutcome::Updated, updated.id, effects))
    }

    async fn create_appointment_action(&self, data: AppointmentData) -> Result<IngestReport> {
        let contact = &data.contact;
        let Some(date) = present(data.date.as_deref()) else {
            return Ok(IngestReport::rejected("appointment has no date"));
        };
        if !contact.has_identifier() {
            return Ok(IngestReport::rejected("appointment has no attendee email or phone"));
        }
        let date = parse_date(date)?;
        let time = match present(data.time.as_deref()) {
            Some(raw) => parse_time(raw)?,
            None => NaiveTime::from_hms_opt(DEFAULT_START_HOUR, 0, 0).unwrap_or(NaiveTime::MIN),
        };
        let minutes = data
            .duration_minutes
            .filter(|m| *m > 0)
            .unwrap_or(self.config.default_appointment_minutes);
        if minutes > self.config.max_appointment_minutes {
            return Ok(IngestReport::rejected(format!(
                "appointment duration of {minutes} minutes exceeds {}",
                self.config.max_appointment_minutes
            )));
        }
        let starts_at = date.and_time(time).and_utc();
        let ends_at = Duration::try_minutes(minutes)
            .and_then(|length| starts_at.checked_add_signed(length))
            .ok_or_else(|| AppError::Validation("appointment end is out of range".into()))?;

        let (client, _) = self
            .resolve_or_create(&contact.candidates(), &contact.to_incoming())
            .await?;
        let advisor = self
            .pick_advisor(present(data.advisor_id.as_deref()), starts_at, ends_at)
            .await?;

        let title = present(data.title.as_deref())
            .map_or_else(|| format!("Meeting with {}", client.name), str::to_owned);
        let appointment = self
            .appointments
            .insert(&Appointment::new(
                client.id.clone(),
                advisor.as_ref().map(|a| a.id.clone()),
                title,
                starts_at,
                ends_at,
            ))
            .await?;
        info!(appointment_id = %appointment.id, advisor = ?appointment.advisor_id, "appointment booked");

        self.after_booking(&client, advisor.as_ref()).await;

        let description = with_notes(
            format!("Appointment booked for {}", stamp(starts_at)),
            data.notes.as_deref(),
        );
        let activity = ActivityRecord::new(
            client.id.clone(),
            ActivityKind::Appointment,
            Direction::Inbound,
            &description,
            None,
        );
        let notice = advisor.map(|advisor| {
            NotificationRecord::new(
                advisor.id,
                "appointment",
                "New appointment".to_owned(),
                format!("{} on {}", client.name, stamp(starts_at)),
                Some(format!("/appointments/{}", appointment.id)),
            )
        });
        let effects = self
            .dispatcher
            .dispatch(
                SideEffectPlan::activity_only(activity)
                    .with_notification(notice)
                    .touching(Utc::now()),
            )
            .await;
        Ok(IngestReport::applied(IngestOutcome::Created, client.id, effects))
    }

    /// The requested advisor when known, else the first free one.
    async fn pick_advisor(
        &self,
        requested: Option<&str>,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<Option<Advisor>> {
        if let Some(id) = requested {
            match self.advisors.find_by_id(id).await? {
                Some(advisor) => return Ok(Some(advisor)),
                None => warn!(advisor_id = id, "requested advisor unknown, auto-assigning"),
            }
        }
        let advisor = self.advisors.first_available(starts_at, ends_at).await?;
        if advisor.is_none() {
            warn!("no advisor available for the requested slot");
        }
        Ok(advisor)
    }

    /// Assign the advisor and advance the pipeline stage; best-effort.
    async fn after_booking(&self, client: &ClientRecord, advisor: Option<&Advisor>) {
        if let (None, Some(advisor)) = (&client.assigned_advisor_id, advisor) {
            if let Err(err) = self.clients.assign_advisor(&client.id, &advisor.id).await {
                warn!(%err, "failed to assign advisor");
            }
        }
        if client.stage < PipelineStage::MeetingScheduled {
            let patch = ClientPatch {
                stage: Some(PipelineStage::MeetingScheduled),
                ..ClientPatch::default()
            };
            if let Err(err) = self.clients.apply_patch(&client.id, &patch).await {
                warn!(%err, "failed to advance pipeline stage");
            }
        }
    }

    async fn reschedule_action(&self, data: RescheduleData) -> Result<IngestReport> {
        let Some(new_date) = present(data.new_date.as_deref()) else {
            return Ok(IngestReport::rejected("reschedule has no new date"));
        };
        let new_date = parse_date(new_date)?;
        let new_time = present(data.new_time.as_deref()).map(parse_time).transpose()?;

        let mut appointment = None;
        if let Some(id) = present(data.event_id.as_deref()) {
            appointment = self.appointments.find_by_id(id).await?;
        }
        if appointment.is_none() {
            appointment = self.find_by_email_and_day(&data).await?;
        }
        let Some(appointment) = appointment else {
            return Ok(IngestReport::not_found("no appointment matches the reschedule"));
        };

        let (starts_at, ends_at) = appointment.shifted_to(new_date, new_time);
        let moved = self
            .appointments
            .reschedule(&appointment.id, starts_at, ends_at)
            .await?;
        info!(appointment_id = %moved.id, "appointment rescheduled");

        let activity = ActivityRecord::new(
            moved.client_id.clone(),
            ActivityKind::Appointment,
            Direction::Inbound,
            &format!(
                "Appointment moved from {} to {}",
                stamp(appointment.starts_at),
                stamp(moved.starts_at)
            ),
            None,
        );
        let notice = moved.advisor_id.clone().map(|advisor| {
            NotificationRecord::new(
                advisor,
                "appointment",
                "Appointment rescheduled".to_owned(),
                format!("{} moved to {}", moved.title, stamp(moved.starts_at)),
                Some(format!("/appointments/{}", moved.id)),
            )
        });
        let effects = self
            .dispatcher
            .dispatch(SideEffectPlan::activity_only(activity).with_notification(notice))
            .await;
        Ok(IngestReport::applied(IngestOutcome::Updated, moved.client_id, effects))
    }

    async fn find_by_email_and_day(&self, data: &RescheduleData) -> Result<Option<Appointment>> {
        let (Some(email), Some(original)) = (
            present(data.email.as_deref()),
            present(data.original_date.as_deref()),
        ) else {
            return Ok(None);
        };
        let day = parse_date(original)?;
        let candidates = IdentityCandidates::from_parts(None, Some(email), None);
        let Some(client) = self.resolver.resolve(&candidates).await? else {
            return Ok(None);
        };
        let from = day.and_time(NaiveTime::MIN).and_utc();
        self.appointments
            .find_for_client_between(&client.id, from, from + Duration::days(1))
            .await
    }

    async fn log_message_action(&self, data: MessageData) -> Result<IngestReport> {
        let contact = &data.contact;
        if !contact.has_identifier() {
            return Ok(IngestReport::rejected("message has no phone or email"));
        }
        let (client, created) = self
            .resolve_or_create(&contact.candidates(), &contact.to_incoming())
            .await?;

        let now = Utc::now();
        let text = present(data.message.as_deref()).unwrap_or("(no message)");
        let details = match present(data.reason.as_deref()) {
            Some(reason) => format!("{reason}: {text}"),
            None => text.to_owned(),
        };

        let activity = ActivityRecord::new(
            client.id.clone(),
            ActivityKind::Message,
            Direction::Inbound,
            &format!("Message from {}: {details}", client.name),
            None,
        );
        let task = TaskRecord::new(
            Some(client.id.clone()),
            format!("Callback: {}", client.name),
            Some(details.clone()),
            TaskPriority::High,
            now + Duration::hours(self.config.callback_due_hours),
        );
        let plan = SideEffectPlan::activity_only(activity)
            .with_task(task)
            .with_notification(advisor_notice(
                &client,
                "message",
                format!("Message from {}", client.name),
                details,
            ))
            .touching(now);
        let effects = self.dispatcher.dispatch(plan).await;

        let outcome = if created {
            IngestOutcome::Created
        } else {
            IngestOutcome::Updated
        };
        Ok(IngestReport::applied(outcome, client.id, effects))
    }

    async fn log_transfer_action(&self, data: TransferData) -> Result<IngestReport> {
        let Some(phone) = present(data.phone.as_deref()) else {
            return Ok(IngestReport::rejected("transfer has no phone"));
        };
        let Some(client) = self.resolver.resolve(&IdentityCandidates::from_phone(phone)).await? else {
            return Ok(IngestReport::not_found(format!("no client with phone {phone}")));
        };

        let target = present(data.advisor.as_deref()).unwrap_or("an advisor");
        let description = if data.success.unwrap_or(true) {
            format!("Call transferred to {target}")
        } else {
            format!("Transfer to {target} failed")
        };
        let activity = ActivityRecord::new(
            client.id.clone(),
            ActivityKind::Transfer,
            Direction::Inbound,
            &with_notes(description, data.notes.as_deref()),
            None,
        );
        let effects = self
            .dispatcher
            .dispatch(SideEffectPlan::activity_only(activity).touching(Utc::now()))
            .await;
        Ok(IngestReport::applied(IngestOutcome::Updated, client.id, effects))
    }
}
