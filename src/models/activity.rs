//! Activity log entries attached to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Activity classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// Voice call.
    Call,
    /// Message left for the advisor.
    Message,
    /// Live call transfer attempt.
    Transfer,
    /// Appointment booked or moved.
    Appointment,
    /// Record created or updated by a batch import.
    Import,
    /// Other automation note.
    Note,
}

impl ActivityKind {
    /// Storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Message => "message",
            Self::Transfer => "transfer",
            Self::Appointment => "appointment",
            Self::Import => "import",
            Self::Note => "note",
        }
    }

    /// Parse the storage representation.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "call" => Some(Self::Call),
            "message" => Some(Self::Message),
            "transfer" => Some(Self::Transfer),
            "appointment" => Some(Self::Appointment),
            "import" => Some(Self::Import),
            "note" => Some(Self::Note),
            _ => None,
        }
    }
}

/// Direction of the interaction relative to the business.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Initiated by the client.
    Inbound,
    /// Initiated by the business.
    Outbound,
}

impl Direction {
    /// Storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }

    /// Parse the storage representation.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "inbound" => Some(Self::Inbound),
            "outbound" => Some(Self::Outbound),
            _ => None,
        }
    }
}

/// Structured call analysis produced by the voice platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallAnalysis {
    /// Short narrative summary.
    pub summary: Option<String>,
    /// Detected caller intent.
    pub intent: Option<String>,
    /// Detected caller sentiment.
    pub sentiment: Option<String>,
    /// Suggested next action for the advisor.
    pub next_action: Option<String>,
}

impl CallAnalysis {
    /// Whether every field is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        [&self.summary, &self.intent, &self.sentiment, &self.next_action]
            .iter()
            .all(|f| f.as_deref().is_none_or(|s| s.trim().is_empty()))
    }
}

/// Speaker in a transcript.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The person on the line.
    Caller,
    /// The voice assistant.
    Agent,
}

/// One transcript turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Utterance {
    /// Who spoke.
    pub speaker: Speaker,
    /// What was said.
    pub text: String,
}

/// An immutable log entry attached to a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityRecord {
    /// Unique record identifier.
    pub id: String,
    /// Owning client.
    pub client_id: String,
    /// Activity classification.
    pub kind: ActivityKind,
    /// Interaction direction.
    pub direction: Direction,
    /// Free-text description; embeds the external reference when present.
    pub description: String,
    /// External event identifier used for idempotency.
    pub external_ref: Option<String>,
    /// Structured analysis.
    pub analysis: Option<CallAnalysis>,
    /// Ordered transcript.
    pub transcript: Vec<Utterance>,
    /// Recording locator.
    pub recording_url: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl ActivityRecord {
    /// Construct a new activity. When `external_ref` is set, the description
    /// is suffixed with `[ref:<id>]`.
    #[must_use]
    pub fn new(
        client_id: String,
        kind: ActivityKind,
        direction: Direction,
        description: &str,
        external_ref: Option<String>,
    ) -> Self {
        let description = match external_ref.as_deref() {
            Some(ext) => format!("{description} [ref:{ext}]"),
            None => description.to_owned(),
        };
        Self {
            id: Uuid::new_v4().to_string(),
            client_id,
            kind,
            direction,
            description,
            external_ref,
            analysis: None,
            transcript: Vec::new(),
            recording_url: None,
            created_at: Utc::now(),
        }
    }

    /// Attach analysis, dropping it if every field is empty.
    #[must_use]
    pub fn with_analysis(mut self, analysis: Option<CallAnalysis>) -> Self {
        self.analysis = analysis.filter(|a| !a.is_empty());
        self
    }

    /// Attach a transcript.
    #[must_use]
    pub fn with_transcript(mut self, transcript: Vec<Utterance>) -> Self {
        self.transcript = transcript;
        self
    }

    /// Attach a recording locator.
    #[must_use]
    pub fn with_recording(mut self, recording_url: Option<String>) -> Self {
        self.recording_url = recording_url;
        self
    }
}
