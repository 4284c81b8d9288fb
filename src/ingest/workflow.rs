//! Workflow-automation actions.
//!
//! The automation platform posts `{action, entity, data}`. Only the pairs
//! listed in [`WorkflowAction::from_request`] are understood; each one
//! carries its own typed payload.

use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::models::client::{ClientPatch, ClientStatus, IncomingClient, PipelineStage};
use crate::models::event::WorkflowRequest;
use crate::{AppError, Result};

use crate::identity::IdentityCandidates;

/// Tags sent either as one delimited string or as a list.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum TagList {
    /// `"a; b, c"`
    Delimited(String),
    /// `["a", "b"]`
    List(Vec<String>),
}

impl TagList {
    /// Trimmed, non-empty tags.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        let items = match self {
            Self::Delimited(raw) => raw.split([';', ',']).map(str::to_owned).collect(),
            Self::List(items) => items,
        };
        items
            .into_iter()
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// Contact fields shared by several payloads.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContactData {
    /// Full name.
    pub name: Option<String>,
    /// Given name.
    #[serde(alias = "firstName")]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(alias = "lastName")]
    pub last_name: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
}

impl ContactData {
    /// Explicit name, else first and last joined.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = present(self.name.as_deref()) {
            return Some(name.to_owned());
        }
        let joined = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .filter_map(present)
            .collect::<Vec<_>>()
            .join(" ");
        (!joined.is_empty()).then_some(joined)
    }

    /// Trimmed, non-empty email.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        present(self.email.as_deref())
    }

    /// Trimmed, non-empty phone.
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        present(self.phone.as_deref())
    }

    /// Whether the payload carries anything to match on.
    #[must_use]
    pub fn has_identifier(&self) -> bool {
        self.email().is_some() || self.phone().is_some()
    }

    /// Resolver candidates.
    #[must_use]
    pub fn candidates(&self) -> IdentityCandidates {
        IdentityCandidates::from_parts(self.display_name().as_deref(), self.email(), self.phone())
    }

    /// Incoming client built from the contact fields. The name falls back
    /// to the email, then the phone. Status is left unset so that an
    /// upsert never demotes an existing client; new records default to
    /// `Lead`.
    #[must_use]
    pub fn to_incoming(&self) -> IncomingClient {
        let name = self
            .display_name()
            .or_else(|| self.email().map(str::to_owned))
            .or_else(|| self.phone().map(str::to_owned))
            .unwrap_or_default();
        IncomingClient {
            name,
            emails: self.email().map(str::to_owned).into_iter().collect(),
            phones: self.phone().map(str::to_owned).into_iter().collect(),
            ..IncomingClient::default()
        }
    }
}

/// `create / lead`
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct LeadData {
    /// Who the lead is.
    #[serde(flatten)]
    pub contact: ContactData,
    /// Where the lead came from.
    pub source: Option<String>,
    /// Free-text notes.
    pub notes: Option<String>,
    /// Tags to attach.
    pub tags: Option<TagList>,
}

/// `update / client`
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct UpdateClientData {
    /// Client code, tried before email and phone.
    #[serde(alias = "clientCode", alias = "client_id", alias = "clientId")]
    pub client_code: Option<String>,
    /// Identity and new name.
    #[serde(flatten)]
    pub contact: ContactData,
    /// Additional email to attach.
    #[serde(alias = "secondaryEmail")]
    pub secondary_email: Option<String>,
    /// Additional phone to attach.
    #[serde(alias = "secondaryPhone")]
    pub secondary_phone: Option<String>,
    /// New lifecycle status label.
    pub status: Option<String>,
    /// New pipeline stage label.
    pub stage: Option<String>,
    /// Tags to attach.
    pub tags: Option<TagList>,
    /// Free-text notes.
    pub notes: Option<String>,
}

impl UpdateClientData {
    /// Patch carrying every non-empty field.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an unknown status or stage label.
    pub fn to_patch(&self) -> Result<ClientPatch> {
        let status = present(self.status.as_deref())
            .map(|raw| {
                ClientStatus::parse(raw)
                    .ok_or_else(|| AppError::Validation(format!("unknown status {raw:?}")))
            })
            .transpose()?;
        let stage = present(self.stage.as_deref())
            .map(|raw| {
                PipelineStage::parse(raw)
                    .ok_or_else(|| AppError::Validation(format!("unknown stage {raw:?}")))
            })
            .transpose()?;

        Ok(ClientPatch {
            name: self.contact.display_name(),
            status,
            stage,
            tags: self.tags.clone().map(TagList::into_vec).unwrap_or_default(),
            add_emails: [self.contact.email(), present(self.secondary_email.as_deref())]
                .into_iter()
                .flatten()
                .map(str::to_owned)
                .collect(),
            add_phones: [self.contact.phone(), present(self.secondary_phone.as_deref())]
                .into_iter()
                .flatten()
                .map(str::to_owned)
                .collect(),
        })
    }
}

/// `create / appointment`
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct AppointmentData {
    /// Who is attending.
    #[serde(flatten)]
    pub contact: ContactData,
    /// Day of the meeting.
    pub date: Option<String>,
    /// Start time; the business default applies when absent.
    pub time: Option<String>,
    /// Length in minutes.
    #[serde(alias = "durationMinutes", alias = "duration")]
    pub duration_minutes: Option<i64>,
    /// Requested advisor.
    #[serde(alias = "advisorId")]
    pub advisor_id: Option<String>,
    /// Calendar title.
    pub title: Option<String>,
    /// Free-text notes.
    pub notes: Option<String>,
}

/// `reschedule / appointment`
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RescheduleData {
    /// Appointment identifier, tried first.
    #[serde(alias = "eventId", alias = "appointment_id", alias = "appointmentId")]
    pub event_id: Option<String>,
    /// Client email, used with `original_date`.
    pub email: Option<String>,
    /// Day the appointment was on.
    #[serde(alias = "originalDate")]
    pub original_date: Option<String>,
    /// Day to move it to.
    #[serde(alias = "newDate")]
    pub new_date: Option<String>,
    /// New start time, if it changes.
    #[serde(alias = "newTime")]
    pub new_time: Option<String>,
}

/// `log / message`
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct MessageData {
    /// Who left the message.
    #[serde(flatten)]
    pub contact: ContactData,
    /// What they said.
    pub message: Option<String>,
    /// Why they called.
    pub reason: Option<String>,
}

/// `log / transfer`
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TransferData {
    /// Caller number.
    pub phone: Option<String>,
    /// Who the call was transferred to.
    #[serde(alias = "transferredTo", alias = "transferred_to", alias = "target")]
    pub advisor: Option<String>,
    /// Whether the transfer connected.
    pub success: Option<bool>,
    /// Free-text notes.
    pub notes: Option<String>,
}

/// A recognised automation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowAction {
    /// Create or refresh a lead.
    CreateLead(LeadData),
    /// Update an existing client.
    UpdateClient(UpdateClientData),
    /// Book an appointment.
    CreateAppointment(AppointmentData),
    /// Move an existing appointment.
    RescheduleAppointment(RescheduleData),
    /// Record a message left for callback.
    LogMessage(MessageData),
    /// Record a live transfer attempt.
    LogTransfer(TransferData),
}

impl WorkflowAction {
    /// Build the action for an `(action, entity)` pair.
    ///
    /// Matching ignores case and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an unknown pair or a payload
    /// that does not fit the action.
    pub fn from_request(request: &WorkflowRequest) -> Result<Self> {
        let action = request.action.trim().to_ascii_lowercase();
        let entity = request.entity.trim().to_ascii_lowercase();
        let data = match &request.data {
            Value::Null => Value::Object(Map::new()),
            other => other.clone(),
        };

        Ok(match (action.as_str(), entity.as_str()) {
            ("create", "lead") => Self::CreateLead(serde_json::from_value(data)?),
            ("update", "client") => Self::UpdateClient(serde_json::from_value(data)?),
            ("create", "appointment") => Self::CreateAppointment(serde_json::from_value(data)?),
            ("reschedule", "appointment") => {
                Self::RescheduleAppointment(serde_json::from_value(data)?)
            }
            ("log", "message") => Self::LogMessage(serde_json::from_value(data)?),
            ("log", "transfer") => Self::LogTransfer(serde_json::from_value(data)?),
            _ => {
                return Err(AppError::Validation(format!(
                    "unsupported workflow action {:?} on {:?}",
                    request.action, request.entity
                )))
            }
        })
    }

    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateLead(_) => "create_lead",
            Self::UpdateClient(_) => "update_client",
            Self::CreateAppointment(_) => "create_appointment",
            Self::RescheduleAppointment(_) => "reschedule_appointment",
            Self::LogMessage(_) => "log_message",
            Self::LogTransfer(_) => "log_transfer",
        }
    }
}

/// Trimmed value, or `None` if blank.
pub(crate) fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Parse `YYYY-MM-DD`, `MM/DD/YYYY`, or the date part of an RFC 3339
/// timestamp.
///
/// # Errors
///
/// Returns `AppError::Validation` if no format matches.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| AppError::Validation(format!("unrecognised date {raw:?}")))
}

/// Parse `HH:MM`, `HH:MM:SS`, or a 12-hour `H:MM AM` time.
///
/// # Errors
///
/// Returns `AppError::Validation` if no format matches.
pub fn parse_time(raw: &str) -> Result<NaiveTime> {
    let raw = raw.trim();
    let upper = raw.to_ascii_uppercase();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .or_else(|_| NaiveTime::parse_from_str(&upper, "%I:%M %p"))
        .or_else(|_| NaiveTime::parse_from_str(&upper, "%I:%M%p"))
        .map_err(|_| AppError::Validation(format!("unrecognised time {raw:?}")))
}
