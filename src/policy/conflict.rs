//! Duplicate-handling policy for incoming client data.
//!
//! Given the resolver's verdict and a caller-selected strategy, decides
//! what should happen to the stored client. The decision is pure: the
//! caller performs the resulting storage mutation.

use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span};

use crate::identity::normalize::{normalize_email, normalize_phone};
use crate::models::client::{ClientPatch, ClientRecord, IncomingClient};

/// What to do when an incoming record matches an existing client.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateStrategy {
    /// Leave the existing client untouched.
    #[default]
    Skip,
    /// Merge the incoming fields into the existing client.
    Update,
    /// Create a separate client regardless of the match.
    CreateNew,
}

impl DuplicateStrategy {
    /// Wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Update => "update",
            Self::CreateNew => "create_new",
        }
    }

    /// Parse a strategy label; `create-new` is accepted for `create_new`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "skip" => Some(Self::Skip),
            "update" => Some(Self::Update),
            "create_new" => Some(Self::CreateNew),
            _ => None,
        }
    }
}

/// Storage mutation chosen for one incoming record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Insert a new client built from the incoming fields.
    CreateNew(IncomingClient),
    /// Apply a patch to an existing client.
    UpdateFields {
        /// Client to update.
        client_id: String,
        /// Changes to apply.
        patch: ClientPatch,
    },
    /// Do nothing.
    NoOp,
}

/// Maps `(existing match, strategy, incoming)` to a [`ClientAction`].
pub struct ConflictPolicy;

impl ConflictPolicy {
    /// Decide the action for an incoming record.
    ///
    /// Without a match every strategy creates. With a match, `Skip` does
    /// nothing, `CreateNew` creates anyway, and `Update` builds a patch that
    /// only carries name, status, and contact identifiers not already on
    /// file. Empty incoming fields are never written.
    #[must_use]
    pub fn decide(
        existing: Option<&ClientRecord>,
        strategy: DuplicateStrategy,
        incoming: &IncomingClient,
    ) -> ClientAction {
        let _span = debug_span!("conflict_decide", strategy = strategy.as_str()).entered();

        let Some(existing) = existing else {
            return ClientAction::CreateNew(incoming.clone());
        };

        match strategy {
            DuplicateStrategy::Skip => {
                debug!(client_id = %existing.id, "duplicate skipped");
                ClientAction::NoOp
            }
            DuplicateStrategy::CreateNew => ClientAction::CreateNew(incoming.clone()),
            DuplicateStrategy::Update => ClientAction::UpdateFields {
                client_id: existing.id.clone(),
                patch: Self::update_patch(existing, incoming),
            },
        }
    }

    fn update_patch(existing: &ClientRecord, incoming: &IncomingClient) -> ClientPatch {
        let name = Some(incoming.name.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_owned);

        let mut add_emails: Vec<String> = Vec::new();
        for email in incoming.present_emails() {
            let canonical = normalize_email(email);
            let seen = add_emails.iter().any(|e| normalize_email(e) == canonical);
            if !canonical.is_empty() && !existing.has_email(&canonical) && !seen {
                add_emails.push(email.to_owned());
            }
        }

        let mut add_phones: Vec<String> = Vec::new();
        for phone in incoming.present_phones() {
            let canonical = normalize_phone(phone);
            let seen = add_phones.iter().any(|p| normalize_phone(p) == canonical);
            if !canonical.is_empty() && !existing.has_phone(&canonical) && !seen {
                add_phones.push(phone.to_owned());
            }
        }

        ClientPatch {
            name,
            status: incoming.status,
            stage: None,
            tags: Vec::new(),
            add_emails,
            add_phones,
        }
    }
}
