//! Integration tests for workflow-automation actions.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use crm_ingest::ingest::IngestOutcome;
use crm_ingest::models::activity::ActivityKind;
use crm_ingest::models::appointment::AppointmentStatus;
use crm_ingest::models::client::{ClientStatus, PipelineStage};
use crm_ingest::models::event::WorkflowRequest;
use crm_ingest::models::task::TaskPriority;
use crm_ingest::persistence::activity_repo::ActivityRepo;
use crm_ingest::persistence::appointment_repo::AppointmentRepo;
use crm_ingest::persistence::client_repo::ClientRepo;
use crm_ingest::persistence::notification_repo::NotificationRepo;
use crm_ingest::persistence::task_repo::TaskRepo;
use serde_json::{json, Value};

use super::test_helpers::{insert_client, test_app_state, test_config};

fn request(action: &str, entity: &str, data: Value) -> WorkflowRequest {
    WorkflowRequest {
        action: action.into(),
        entity: entity.into(),
        data,
    }
}

// ─── Classification ───────────────────────────────────────────────────

#[tokio::test]
async fn unknown_action_is_rejected() {
    let state = test_app_state(test_config()).await;
    let result = state
        .ingestor
        .ingest_workflow(&request("archive", "client", json!({})))
        .await
        .expect("ingest");
    assert!(matches!(result.outcome, IngestOutcome::Rejected(_)));
}

// ─── Leads ────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_lead_then_upsert_the_same_person() {
    let state = test_app_state(test_config()).await;
    let ingestor = &state.ingestor;

    let first = ingestor
        .ingest_workflow(&request(
            "create",
            "lead",
            json!({ "name": "Ada", "email": "ada@x.io", "source": "webinar", "tags": ["retirement"] }),
        ))
        .await
        .expect("create");
    assert_eq!(first.outcome, IngestOutcome::Created);

    let second = ingestor
        .ingest_workflow(&request(
            "create",
            "lead",
            json!({ "name": "Ada Lovelace", "email": "ADA@x.io", "phone": "5550001111" }),
        ))
        .await
        .expect("upsert");
    assert_eq!(second.outcome, IngestOutcome::Updated);
    assert_eq!(second.client_id, first.client_id);

    let client = ClientRepo::new(Arc::clone(&state.db))
        .get_by_id(&first.client_id.expect("id"))
        .await
        .expect("client");
    assert_eq!(client.name, "Ada Lovelace");
    assert_eq!(client.status, ClientStatus::Lead);
    assert_eq!(client.tags, vec!["retirement"]);
    assert_eq!(client.phones.len(), 1);
}

// ─── Client updates ───────────────────────────────────────────────────

#[tokio::test]
async fn update_client_by_code() {
    let state = test_app_state(test_config()).await;
    let existing = insert_client(&state.db, "CL-0007", "Grace", Some("g@x.io"), None).await;

    let result = state
        .ingestor
        .ingest_workflow(&request(
            "update",
            "client",
            json!({ "clientCode": "CL-0007", "status": "active", "secondaryEmail": "grace@navy.mil" }),
        ))
        .await
        .expect("update");
    assert_eq!(result.outcome, IngestOutcome::Updated);

    let client = ClientRepo::new(Arc::clone(&state.db))
        .get_by_id(&existing.id)
        .await
        .expect("client");
    assert_eq!(client.status, ClientStatus::Active);
    assert_eq!(client.emails.len(), 2);
    assert_eq!(client.primary_email().map(|e| e.canonical.as_str()), Some("g@x.io"));
}

#[tokio::test]
async fn update_for_unknown_client_is_not_found() {
    let state = test_app_state(test_config()).await;
    let result = state
        .ingestor
        .ingest_workflow(&request(
            "update",
            "client",
            json!({ "email": "ghost@x.io", "status": "active" }),
        ))
        .await
        .expect("update");
    assert!(matches!(result.outcome, IngestOutcome::NotFound(_)));
    assert_eq!(ClientRepo::new(Arc::clone(&state.db)).count().await.expect("count"), 0);
}

// ─── Appointments ─────────────────────────────────────────────────────

#[tokio::test]
async fn appointment_auto_assigns_an_active_advisor() {
    let state = test_app_state(test_config()).await;

    let result = state
        .ingestor
        .ingest_workflow(&request(
            "create",
            "appointment",
            json!({ "name": "Ada", "email": "ada@x.io", "date": "2026-03-02", "time": "14:30" }),
        ))
        .await
        .expect("book");
    assert_eq!(result.outcome, IngestOutcome::Created);
    let client_id = result.client_id.expect("client");

    let appointments = AppointmentRepo::new(Arc::clone(&state.db))
        .list_for_client(&client_id)
        .await
        .expect("appointments");
    assert_eq!(appointments.len(), 1);
    let appt = &appointments[0];
    assert_eq!(appt.advisor_id.as_deref(), Some("adv-alex"));
    assert_eq!(appt.starts_at, Utc.with_ymd_and_hms(2026, 3, 2, 14, 30, 0).unwrap());
    assert_eq!((appt.ends_at - appt.starts_at).num_minutes(), 60);

    let client = ClientRepo::new(Arc::clone(&state.db))
        .get_by_id(&client_id)
        .await
        .expect("client");
    assert_eq!(client.assigned_advisor_id.as_deref(), Some("adv-alex"));
    assert_eq!(client.stage, PipelineStage::MeetingScheduled);

    let notes = NotificationRepo::new(Arc::clone(&state.db))
        .list_for_recipient("adv-alex")
        .await
        .expect("notifications");
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].link, Some(format!("/appointments/{}", appt.id)));
}

#[tokio::test]
async fn busy_advisor_leaves_the_slot_unassigned() {
    let state = test_app_state(test_config()).await;
    let ingestor = &state.ingestor;
    let book = |email: &'static str| {
        request(
            "create",
            "appointment",
            json!({ "email": email, "date": "2026-03-02", "time": "10:00", "duration": 30 }),
        )
    };

    ingestor.ingest_workflow(&book("a@x.io")).await.expect("first");
    let second = ingestor.ingest_workflow(&book("b@x.io")).await.expect("second");

    let appointments = AppointmentRepo::new(Arc::clone(&state.db))
        .list_for_client(&second.client_id.expect("client"))
        .await
        .expect("appointments");
    assert!(appointments[0].advisor_id.is_none());
}

#[tokio::test]
async fn appointment_without_date_is_rejected() {
    let state = test_app_state(test_config()).await;
    let result = state
        .ingestor
        .ingest_workflow(&request("create", "appointment", json!({ "email": "a@x.io" })))
        .await
        .expect("ingest");
    assert!(matches!(result.outcome, IngestOutcome::Rejected(_)));
}

#[tokio::test]
async fn oversized_appointment_duration_is_rejected() {
    let state = test_app_state(test_config()).await;
    let result = state
        .ingestor
        .ingest_workflow(&request(
            "create",
            "appointment",
            json!({
                "email": "long@x.io",
                "date": "2026-05-04",
                "durationMinutes": 9_000_000_000_000_000_000_i64,
            }),
        ))
        .await
        .expect("ingest");

    assert!(matches!(result.outcome, IngestOutcome::Rejected(_)));
    let clients = ClientRepo::new(Arc::clone(&state.db));
    assert!(clients.find_by_email("long@x.io").await.expect("query").is_none());
}

#[tokio::test]
async fn reschedule_by_email_and_original_date() {
    let state = test_app_state(test_config()).await;
    let ingestor = &state.ingestor;
    ingestor
        .ingest_workflow(&request(
            "create",
            "appointment",
            json!({ "email": "ada@x.io", "date": "2026-03-02", "time": "14:30", "duration": 45 }),
        ))
        .await
        .expect("book");

    let result = ingestor
        .ingest_workflow(&request(
            "reschedule",
            "appointment",
            json!({ "email": "ada@x.io", "originalDate": "2026-03-02", "newDate": "2026-03-09" }),
        ))
        .await
        .expect("reschedule");
    assert_eq!(result.outcome, IngestOutcome::Updated);

    let appointments = AppointmentRepo::new(Arc::clone(&state.db))
        .list_for_client(&result.client_id.expect("client"))
        .await
        .expect("appointments");
    let appt = &appointments[0];
    assert_eq!(appt.status, AppointmentStatus::Rescheduled);
    assert_eq!(appt.starts_at, Utc.with_ymd_and_hms(2026, 3, 9, 14, 30, 0).unwrap());
    assert_eq!((appt.ends_at - appt.starts_at).num_minutes(), 45);
}

#[tokio::test]
async fn reschedule_of_unknown_appointment_creates_nothing() {
    let state = test_app_state(test_config()).await;
    let result = state
        .ingestor
        .ingest_workflow(&request(
            "reschedule",
            "appointment",
            json!({ "eventId": "no-such-event", "email": "ghost@x.io", "originalDate": "2026-03-02", "newDate": "2026-03-09" }),
        ))
        .await
        .expect("reschedule");

    assert!(matches!(result.outcome, IngestOutcome::NotFound(_)));
    assert!(result.effects.is_none());
    assert_eq!(ClientRepo::new(Arc::clone(&state.db)).count().await.expect("count"), 0);
    assert_eq!(ActivityRepo::new(Arc::clone(&state.db)).count().await.expect("count"), 0);
}

// ─── Messages and transfers ───────────────────────────────────────────

#[tokio::test]
async fn message_creates_a_high_priority_callback_task() {
    let state = test_app_state(test_config()).await;
    let before = Utc::now();

    let result = state
        .ingestor
        .ingest_workflow(&request(
            "log",
            "message",
            json!({ "name": "Ada", "phone": "5550001111", "message": "Please call me", "reason": "billing" }),
        ))
        .await
        .expect("message");
    assert_eq!(result.outcome, IngestOutcome::Created);
    let client_id = result.client_id.expect("client");

    let tasks = TaskRepo::new(Arc::clone(&state.db))
        .list_for_client(&client_id)
        .await
        .expect("tasks");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Callback: Ada");
    assert_eq!(tasks[0].priority, TaskPriority::High);
    assert!(tasks[0].due_at > before);

    let log = ActivityRepo::new(Arc::clone(&state.db))
        .list_for_client(&client_id)
        .await
        .expect("activities");
    assert_eq!(log[0].kind, ActivityKind::Message);
    assert!(log[0].description.contains("billing: Please call me"));
}

#[tokio::test]
async fn transfer_for_unknown_phone_is_not_found() {
    let state = test_app_state(test_config()).await;
    let result = state
        .ingestor
        .ingest_workflow(&request(
            "log",
            "transfer",
            json!({ "phone": "5559990000", "advisor": "Alex" }),
        ))
        .await
        .expect("transfer");
    assert!(matches!(result.outcome, IngestOutcome::NotFound(_)));
}

#[tokio::test]
async fn failed_transfer_is_logged_against_the_caller() {
    let state = test_app_state(test_config()).await;
    let existing = insert_client(&state.db, "CL-0001", "Ada", None, Some("5550001111")).await;

    let result = state
        .ingestor
        .ingest_workflow(&request(
            "log",
            "transfer",
            json!({ "phone": "(555) 000-1111", "transferredTo": "Alex", "success": false }),
        ))
        .await
        .expect("transfer");
    assert_eq!(result.outcome, IngestOutcome::Updated);

    let log = ActivityRepo::new(Arc::clone(&state.db))
        .list_for_client(&existing.id)
        .await
        .expect("activities");
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].kind, ActivityKind::Transfer);
    assert_eq!(log[0].description, "Transfer to Alex failed");
}
