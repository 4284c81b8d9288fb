//! Client record model, contact identifiers, and client-code rules.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::normalize::{normalize_email, normalize_phone};
use crate::{AppError, Result};

/// Prefix shared by every human-facing client code.
pub const CLIENT_CODE_PREFIX: &str = "CL-";

#[allow(clippy::expect_used)]
static VALID_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^CL-\d{4,}$").expect("client code pattern compiles"));

#[allow(clippy::expect_used)]
static NUMBERED_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^CL-(\d+)$").expect("numbered code pattern compiles"));

/// Lifecycle status for a client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    /// Captured contact, not yet qualified.
    Lead,
    /// Qualified and in conversation.
    Prospect,
    /// Engaged client.
    Active,
}

impl ClientStatus {
    /// Storage and wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lead => "lead",
            Self::Prospect => "prospect",
            Self::Active => "active",
        }
    }

    /// Parse a case-insensitive status label.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lead" => Some(Self::Lead),
            "prospect" => Some(Self::Prospect),
            "active" | "client" => Some(Self::Active),
            _ => None,
        }
    }
}

/// Ordered pipeline stage. Later variants compare greater.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Newly captured.
    NewLead,
    /// First contact made.
    Contacted,
    /// Discovery meeting on the calendar.
    MeetingScheduled,
    /// Proposal delivered.
    ProposalSent,
    /// Paperwork and account opening.
    Onboarding,
    /// Signed client.
    Won,
}

impl PipelineStage {
    /// Storage and wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewLead => "new_lead",
            Self::Contacted => "contacted",
            Self::MeetingScheduled => "meeting_scheduled",
            Self::ProposalSent => "proposal_sent",
            Self::Onboarding => "onboarding",
            Self::Won => "won",
        }
    }

    /// Parse a stage label, accepting spaces, hyphens, or underscores.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let key: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();
        match key.as_str() {
            "new_lead" | "new" => Some(Self::NewLead),
            "contacted" => Some(Self::Contacted),
            "meeting_scheduled" => Some(Self::MeetingScheduled),
            "proposal_sent" => Some(Self::ProposalSent),
            "onboarding" => Some(Self::Onboarding),
            "won" => Some(Self::Won),
            _ => None,
        }
    }
}

/// A phone number or email address attached to a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactPoint {
    /// Value as supplied, kept for display.
    pub value: String,
    /// Canonical form used for equality comparison.
    pub canonical: String,
    /// Whether this is the primary entry of its set.
    pub primary: bool,
}

impl ContactPoint {
    /// Build a phone contact point.
    #[must_use]
    pub fn phone(value: &str, primary: bool) -> Self {
        Self {
            value: value.trim().to_owned(),
            canonical: normalize_phone(value),
            primary,
        }
    }

    /// Build an email contact point.
    #[must_use]
    pub fn email(value: &str, primary: bool) -> Self {
        Self {
            value: value.trim().to_owned(),
            canonical: normalize_email(value),
            primary,
        }
    }
}

/// Fields supplied by an import row or an inbound event for a client.
///
/// Emails and phones are ordered: the first entry is the one that becomes
/// primary when a new record is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncomingClient {
    /// Explicit human-facing code, when the source carries one.
    pub client_code: Option<String>,
    /// Display name.
    pub name: String,
    /// Requested lifecycle status.
    pub status: Option<ClientStatus>,
    /// Requested pipeline stage.
    pub stage: Option<PipelineStage>,
    /// Email addresses, primary candidate first.
    pub emails: Vec<String>,
    /// Phone numbers, primary candidate first.
    pub phones: Vec<String>,
    /// Free-form tags.
    pub tags: Vec<String>,
}

impl IncomingClient {
    /// Non-empty emails in order.
    pub fn present_emails(&self) -> impl Iterator<Item = &str> {
        self.emails
            .iter()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
    }

    /// Non-empty phones in order.
    pub fn present_phones(&self) -> impl Iterator<Item = &str> {
        self.phones
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
    }
}

/// A person or household tracked by the business.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientRecord {
    /// Internal storage identity.
    pub id: String,
    /// Human-facing `CL-####` code.
    pub client_code: String,
    /// Display name.
    pub name: String,
    /// Lifecycle status.
    pub status: ClientStatus,
    /// Pipeline stage.
    pub stage: PipelineStage,
    /// Phone numbers; at most one primary.
    pub phones: Vec<ContactPoint>,
    /// Email addresses; at most one primary.
    pub emails: Vec<ContactPoint>,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Advisor responsible for this client.
    pub assigned_advisor_id: Option<String>,
    /// Most recent inbound or outbound contact.
    pub last_contact_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl ClientRecord {
    /// Build a new record from incoming fields with the given code.
    ///
    /// The first non-empty email and phone become primary; later entries
    /// whose canonical form repeats an earlier one are dropped.
    #[must_use]
    pub fn from_incoming(client_code: String, incoming: &IncomingClient) -> Self {
        let now = Utc::now();
        let mut record = Self {
            id: Uuid::new_v4().to_string(),
            client_code,
            name: incoming.name.trim().to_owned(),
            status: incoming.status.unwrap_or(ClientStatus::Lead),
            stage: incoming.stage.unwrap_or(PipelineStage::NewLead),
            phones: Vec::new(),
            emails: Vec::new(),
            tags: Vec::new(),
            assigned_advisor_id: None,
            last_contact_at: None,
            created_at: now,
            updated_at: now,
        };
        for email in incoming.present_emails() {
            record.add_email(email);
        }
        for phone in incoming.present_phones() {
            record.add_phone(phone);
        }
        merge_tags(&mut record.tags, &incoming.tags);
        record
    }

    /// The primary email, if any.
    #[must_use]
    pub fn primary_email(&self) -> Option<&ContactPoint> {
        self.emails.iter().find(|e| e.primary)
    }

    /// The primary phone, if any.
    #[must_use]
    pub fn primary_phone(&self) -> Option<&ContactPoint> {
        self.phones.iter().find(|p| p.primary)
    }

    /// Whether an email with this canonical form is on file.
    #[must_use]
    pub fn has_email(&self, canonical: &str) -> bool {
        self.emails.iter().any(|e| e.canonical == canonical)
    }

    /// Whether a phone with this canonical form is on file.
    #[must_use]
    pub fn has_phone(&self, canonical: &str) -> bool {
        self.phones.iter().any(|p| p.canonical == canonical)
    }

    /// Append an email unless its canonical form is empty or already present.
    /// Becomes primary only when the set was empty.
    pub fn add_email(&mut self, raw: &str) -> Option<&ContactPoint> {
        let point = ContactPoint::email(raw, self.emails.is_empty());
        if point.canonical.is_empty() || self.has_email(&point.canonical) {
            return None;
        }
        self.emails.push(point);
        self.emails.last()
    }

    /// Append a phone unless its canonical form is empty or already present.
    /// Becomes primary only when the set was empty.
    pub fn add_phone(&mut self, raw: &str) -> Option<&ContactPoint> {
        let point = ContactPoint::phone(raw, self.phones.is_empty());
        if point.canonical.is_empty() || self.has_phone(&point.canonical) {
            return None;
        }
        self.phones.push(point);
        self.phones.last()
    }
}

/// Field changes applied to an existing client.
///
/// Contact additions are additive only: existing entries, including the
/// primary ones, are never replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientPatch {
    /// New display name.
    pub name: Option<String>,
    /// New lifecycle status.
    pub status: Option<ClientStatus>,
    /// New pipeline stage.
    pub stage: Option<PipelineStage>,
    /// Tags to append.
    pub tags: Vec<String>,
    /// Emails to append.
    pub add_emails: Vec<String>,
    /// Phones to append.
    pub add_phones: Vec<String>,
}

/// Contact points created by applying a patch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddedContacts {
    /// Newly attached emails.
    pub emails: Vec<ContactPoint>,
    /// Newly attached phones.
    pub phones: Vec<ContactPoint>,
}

impl ClientPatch {
    /// Whether applying the patch would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.status.is_none()
            && self.stage.is_none()
            && self.tags.is_empty()
            && self.add_emails.is_empty()
            && self.add_phones.is_empty()
    }

    /// Apply the patch in memory, returning the contacts it attached.
    pub fn apply_to(&self, record: &mut ClientRecord) -> AddedContacts {
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            name.clone_into(&mut record.name);
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(stage) = self.stage {
            record.stage = stage;
        }
        merge_tags(&mut record.tags, &self.tags);

        let mut added = AddedContacts::default();
        for email in &self.add_emails {
            if let Some(point) = record.add_email(email) {
                added.emails.push(point.clone());
            }
        }
        for phone in &self.add_phones {
            if let Some(point) = record.add_phone(phone) {
                added.phones.push(point.clone());
            }
        }
        record.updated_at = Utc::now();
        added
    }
}

/// Append tags not already present (case-insensitive), preserving order.
pub fn merge_tags(existing: &mut Vec<String>, incoming: &[String]) {
    for tag in incoming {
        let tag = tag.trim();
        if tag.is_empty() || existing.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            continue;
        }
        existing.push(tag.to_owned());
    }
}

/// Validate a human-facing client code (`CL-` followed by at least four digits).
///
/// # Errors
///
/// Returns `AppError::Validation` if the code does not match the pattern.
pub fn validate_client_code(code: &str) -> Result<()> {
    if VALID_CODE.is_match(code) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "invalid client code {code:?}: expected CL- followed by at least 4 digits"
        )))
    }
}

/// Numeric suffix of a `CL-<digits>` code, if it has that shape.
#[must_use]
pub fn code_number(code: &str) -> Option<u64> {
    NUMBERED_CODE
        .captures(code)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Format a code number as `CL-` plus at least four zero-padded digits.
#[must_use]
pub fn format_client_code(number: u64) -> String {
    format!("{CLIENT_CODE_PREFIX}{number:04}")
}

/// Next code after the highest numbered code in `existing`.
///
/// Gaps are never reused: after `CL-0001` and `CL-0003` the next code is
/// `CL-0004`.
///
/// # Errors
///
/// Returns `AppError::Validation` if the highest code is already the
/// largest representable number.
pub fn next_client_code<'a>(existing: impl IntoIterator<Item = &'a str>) -> Result<String> {
    let highest = existing.into_iter().filter_map(code_number).max().unwrap_or(0);
    highest
        .checked_add(1)
        .map(format_client_code)
        .ok_or_else(|| AppError::Validation(format!("client code space exhausted after CL-{highest}")))
}
