//! Inbound webhook payloads.
//!
//! These mirror what the voice and automation platforms send. Every field
//! is optional so that partial payloads deserialize and are then accepted
//! or rejected by the ingestion pipeline rather than by the JSON layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Call-ended webhook body, either bare or wrapped in a `message` envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CallWebhook {
    /// `{ "message": { ...report... } }`
    Wrapped {
        /// The report.
        message: CallReport,
    },
    /// The report itself.
    Bare(CallReport),
}

impl CallWebhook {
    /// Unwrap the envelope.
    #[must_use]
    pub fn into_report(self) -> CallReport {
        match self {
            Self::Wrapped { message } | Self::Bare(message) => message,
        }
    }
}

/// End-of-call report from the voice platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallReport {
    /// Report type tag (`end-of-call-report`).
    #[serde(rename = "type")]
    pub report_type: Option<String>,
    /// Call metadata.
    pub call: Option<CallInfo>,
    /// Post-call analysis.
    pub analysis: Option<AnalysisPayload>,
    /// Call artifacts (recording, transcript).
    pub artifact: Option<Artifact>,
    /// Message-level recording locator.
    pub recording_url: Option<String>,
    /// Message-level transcript.
    pub messages: Option<Vec<TranscriptEntry>>,
    /// Why the call ended.
    pub ended_reason: Option<String>,
}

/// Call metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallInfo {
    /// Platform call identifier.
    pub id: Option<String>,
    /// `inbound`/`outbound` (or `inboundPhoneCall`/`outboundPhoneCall`).
    #[serde(rename = "type")]
    pub call_type: Option<String>,
    /// The other party.
    pub customer: Option<Customer>,
    /// Call-level recording locator.
    pub recording_url: Option<String>,
}

/// The other party on the call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Customer {
    /// Caller ID number.
    pub number: Option<String>,
    /// Caller name, when the platform knows it.
    pub name: Option<String>,
}

/// Post-call analysis fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisPayload {
    /// Narrative summary.
    pub summary: Option<String>,
    /// Caller intent.
    pub intent: Option<String>,
    /// Caller sentiment.
    pub sentiment: Option<String>,
    /// Suggested follow-up.
    pub next_action: Option<String>,
}

/// Call artifacts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Artifact-level recording locator.
    pub recording_url: Option<String>,
    /// Artifact-level transcript.
    pub messages: Option<Vec<TranscriptEntry>>,
}

/// One raw transcript entry. The text may be carried in any of three keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// `user`, `bot`, `assistant`, `system`, `tool_calls`, ...
    #[serde(default)]
    pub role: String,
    /// Text, variant one.
    pub message: Option<Value>,
    /// Text, variant two.
    pub content: Option<Value>,
    /// Text, variant three.
    pub text: Option<Value>,
}

impl TranscriptEntry {
    /// First non-empty string among `message`, `content`, `text`.
    #[must_use]
    pub fn spoken_text(&self) -> Option<&str> {
        [&self.message, &self.content, &self.text]
            .into_iter()
            .filter_map(|v| v.as_ref().and_then(Value::as_str))
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

/// Workflow-automation webhook body.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowRequest {
    /// Verb (`create`, `update`, `reschedule`, `log`).
    pub action: String,
    /// Noun (`lead`, `client`, `appointment`, `message`, `transfer`).
    pub entity: String,
    /// Action-specific fields.
    #[serde(default)]
    pub data: Value,
}
