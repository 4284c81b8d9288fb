//! Field extraction from end-of-call reports.

use crate::models::activity::{CallAnalysis, Direction, Speaker, Utterance};
use crate::models::event::{CallReport, TranscriptEntry};

/// Longest `nextAction` text carried into a follow-up task title.
pub const FOLLOW_UP_TITLE_CHARS: usize = 100;

/// Platform call identifier, trimmed and non-empty.
#[must_use]
pub fn call_id(report: &CallReport) -> Option<&str> {
    report
        .call
        .as_ref()
        .and_then(|c| c.id.as_deref())
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

/// Caller ID number, trimmed and non-empty.
#[must_use]
pub fn caller_number(report: &CallReport) -> Option<&str> {
    report
        .call
        .as_ref()
        .and_then(|c| c.customer.as_ref())
        .and_then(|c| c.number.as_deref())
        .map(str::trim)
        .filter(|n| !n.is_empty())
}

/// Direction from `call.type`; anything not mentioning `outbound` is inbound.
#[must_use]
pub fn direction(report: &CallReport) -> Direction {
    let outbound = report
        .call
        .as_ref()
        .and_then(|c| c.call_type.as_deref())
        .is_some_and(|t| t.to_ascii_lowercase().contains("outbound"));
    if outbound {
        Direction::Outbound
    } else {
        Direction::Inbound
    }
}

/// Analysis block with blank fields dropped, or `None` if nothing remains.
#[must_use]
pub fn analysis(report: &CallReport) -> Option<CallAnalysis> {
    let payload = report.analysis.as_ref()?;
    let keep = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    };
    let analysis = CallAnalysis {
        summary: keep(&payload.summary),
        intent: keep(&payload.intent),
        sentiment: keep(&payload.sentiment),
        next_action: keep(&payload.next_action),
    };
    (!analysis.is_empty()).then_some(analysis)
}

/// Caller and agent turns, in order.
///
/// Artifact messages take precedence over report-level messages. System
/// prompts, tool calls, and entries without text are dropped.
#[must_use]
pub fn transcript(report: &CallReport) -> Vec<Utterance> {
    let entries = report
        .artifact
        .as_ref()
        .and_then(|a| a.messages.as_deref())
        .or(report.messages.as_deref())
        .unwrap_or_default();
    entries.iter().filter_map(utterance).collect()
}

fn utterance(entry: &TranscriptEntry) -> Option<Utterance> {
    let speaker = match entry.role.as_str() {
        "user" => Speaker::Caller,
        "bot" | "assistant" => Speaker::Agent,
        _ => return None,
    };
    Some(Utterance {
        speaker,
        text: entry.spoken_text()?.to_owned(),
    })
}

/// `Follow up: <next action>`, with the action cut to
/// [`FOLLOW_UP_TITLE_CHARS`] characters.
#[must_use]
pub fn follow_up_title(next_action: &str) -> String {
    let action: String = next_action.trim().chars().take(FOLLOW_UP_TITLE_CHARS).collect();
    format!("Follow up: {action}")
}

/// One-line activity description.
#[must_use]
pub fn describe(report: &CallReport, number: &str) -> String {
    let lead = match direction(report) {
        Direction::Inbound => format!("Inbound call from {number}"),
        Direction::Outbound => format!("Outbound call to {number}"),
    };
    match report.ended_reason.as_deref().map(str::trim) {
        Some(reason) if !reason.is_empty() => format!("{lead} (ended: {reason})"),
        _ => lead,
    }
}
