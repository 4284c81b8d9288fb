//! Unit tests for end-of-call report field extraction.

use crm_ingest::ingest::call::{
    analysis, call_id, caller_number, describe, direction, follow_up_title, transcript,
    FOLLOW_UP_TITLE_CHARS,
};
use crm_ingest::models::activity::{Direction, Speaker};
use crm_ingest::models::event::{CallReport, CallWebhook};
use serde_json::json;

fn report(value: serde_json::Value) -> CallReport {
    serde_json::from_value::<CallWebhook>(value)
        .expect("payload parses")
        .into_report()
}

// ─── Identity fields ──────────────────────────────────────────────────

#[test]
fn blank_call_id_and_number_are_absent() {
    let r = report(json!({
        "type": "end-of-call-report",
        "call": { "id": "  ", "customer": { "number": "" } }
    }));
    assert!(call_id(&r).is_none());
    assert!(caller_number(&r).is_none());
}

#[test]
fn direction_follows_call_type() {
    let outbound = report(json!({ "call": { "type": "outboundPhoneCall" } }));
    let inbound = report(json!({ "call": { "type": "inboundPhoneCall" } }));
    let unknown = report(json!({}));
    assert_eq!(direction(&outbound), Direction::Outbound);
    assert_eq!(direction(&inbound), Direction::Inbound);
    assert_eq!(direction(&unknown), Direction::Inbound);
}

#[test]
fn description_names_number_and_end_reason() {
    let r = report(json!({
        "call": { "type": "outboundPhoneCall" },
        "endedReason": "customer-ended-call"
    }));
    assert_eq!(
        describe(&r, "5551234567"),
        "Outbound call to 5551234567 (ended: customer-ended-call)"
    );
}

// ─── Analysis ─────────────────────────────────────────────────────────

#[test]
fn blank_analysis_fields_are_dropped() {
    let r = report(json!({
        "analysis": { "summary": "Asked about IRAs", "nextAction": "  " }
    }));
    let a = analysis(&r).expect("analysis present");
    assert_eq!(a.summary.as_deref(), Some("Asked about IRAs"));
    assert!(a.next_action.is_none());

    let empty = report(json!({ "analysis": { "summary": "" } }));
    assert!(analysis(&empty).is_none());
}

#[test]
fn follow_up_title_truncates_long_actions() {
    let long = "x".repeat(250);
    let title = follow_up_title(&long);
    assert!(title.starts_with("Follow up: "));
    assert_eq!(title.len(), "Follow up: ".len() + FOLLOW_UP_TITLE_CHARS);

    assert_eq!(follow_up_title(" send forms "), "Follow up: send forms");
}

// ─── Transcript ───────────────────────────────────────────────────────

#[test]
fn artifact_transcript_wins_and_roles_are_filtered() {
    let r = report(json!({
        "messages": [ { "role": "user", "message": "top level" } ],
        "artifact": {
            "messages": [
                { "role": "system", "message": "You are a receptionist" },
                { "role": "bot", "message": "Hi, how can I help?" },
                { "role": "user", "content": "I need a callback" },
                { "role": "tool_calls", "message": "lookup" },
                { "role": "user", "message": "   " }
            ]
        }
    }));
    let turns = transcript(&r);
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].speaker, Speaker::Agent);
    assert_eq!(turns[1].speaker, Speaker::Caller);
    assert_eq!(turns[1].text, "I need a callback");
}

#[test]
fn report_level_transcript_is_the_fallback() {
    let r = report(json!({
        "messages": [ { "role": "assistant", "text": "Goodbye" } ]
    }));
    let turns = transcript(&r);
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].text, "Goodbye");
}
