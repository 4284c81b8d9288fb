//! Contract tests for inbound webhook payload shapes.
//!
//! The voice platform sends end-of-call reports either wrapped in a
//! `message` envelope or bare; the automation platform sends
//! `{action, entity, data}`.

use crm_ingest::ingest::call::{call_id, caller_number};
use crm_ingest::models::event::{CallWebhook, WorkflowRequest};
use serde_json::json;

#[test]
fn wrapped_and_bare_reports_decode_identically() {
    let report = json!({
        "type": "end-of-call-report",
        "endedReason": "hangup",
        "call": { "id": "call-1", "type": "inboundPhoneCall", "customer": { "number": "5551234567" } }
    });
    let wrapped: CallWebhook =
        serde_json::from_value(json!({ "message": report.clone() })).expect("wrapped");
    let bare: CallWebhook = serde_json::from_value(report).expect("bare");

    for webhook in [wrapped, bare] {
        let r = webhook.into_report();
        assert_eq!(r.report_type.as_deref(), Some("end-of-call-report"));
        assert_eq!(r.ended_reason.as_deref(), Some("hangup"));
        assert_eq!(call_id(&r), Some("call-1"));
        assert_eq!(caller_number(&r), Some("5551234567"));
    }
}

#[test]
fn unknown_report_fields_are_ignored() {
    let webhook: CallWebhook = serde_json::from_value(json!({
        "message": {
            "type": "end-of-call-report",
            "cost": 0.42,
            "call": { "id": "c", "orgId": "o" },
            "artifact": { "stereoRecordingUrl": "https://x" }
        }
    }))
    .expect("extra fields tolerated");
    assert_eq!(call_id(&webhook.into_report()), Some("c"));
}

#[test]
fn transcript_entries_accept_any_text_field() {
    let webhook: CallWebhook = serde_json::from_value(json!({
        "artifact": {
            "messages": [
                { "role": "user", "message": "a" },
                { "role": "user", "content": "b" },
                { "role": "user", "text": "c" },
                { "role": "tool_calls", "toolCalls": [] }
            ]
        }
    }))
    .expect("decodes");
    let report = webhook.into_report();
    let entries = report
        .artifact
        .and_then(|a| a.messages)
        .expect("messages");
    let texts: Vec<_> = entries.iter().filter_map(|e| e.spoken_text()).collect();
    assert_eq!(texts, vec!["a", "b", "c"]);
}

#[test]
fn workflow_request_data_defaults_to_null() {
    let request: WorkflowRequest =
        serde_json::from_value(json!({ "action": "log", "entity": "transfer" })).expect("decodes");
    assert!(request.data.is_null());
}

#[test]
fn workflow_request_requires_action_and_entity() {
    assert!(serde_json::from_value::<WorkflowRequest>(json!({ "action": "log" })).is_err());
}
