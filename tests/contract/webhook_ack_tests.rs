//! Contract tests for side-effect report and ingest outcome labels.

use crm_ingest::dispatch::StepOutcome;
use crm_ingest::ingest::IngestOutcome;
use serde_json::json;

#[test]
fn outcome_labels_are_snake_case() {
    assert_eq!(IngestOutcome::Created.as_str(), "created");
    assert_eq!(IngestOutcome::Updated.as_str(), "updated");
    assert_eq!(IngestOutcome::Duplicate.as_str(), "duplicate");
    assert_eq!(IngestOutcome::NotFound("x".into()).as_str(), "not_found");
    assert_eq!(IngestOutcome::Rejected("x".into()).as_str(), "rejected");
}

#[test]
fn only_not_found_and_rejected_carry_a_reason() {
    assert_eq!(IngestOutcome::Rejected("no id".into()).reason(), Some("no id"));
    assert_eq!(IngestOutcome::NotFound("gone".into()).reason(), Some("gone"));
    assert!(IngestOutcome::Created.reason().is_none());
}

#[test]
fn step_outcomes_serialize_tagged() {
    assert_eq!(
        serde_json::to_value(StepOutcome::Done("a1".into())).expect("serializes"),
        json!({ "outcome": "done", "detail": "a1" })
    );
    assert_eq!(
        serde_json::to_value(StepOutcome::Skipped).expect("serializes"),
        json!({ "outcome": "skipped" })
    );
    assert_eq!(
        serde_json::to_value(StepOutcome::Failed("db: locked".into())).expect("serializes"),
        json!({ "outcome": "failed", "detail": "db: locked" })
    );
}
