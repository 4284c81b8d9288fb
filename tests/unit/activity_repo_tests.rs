//! Unit tests for the append-only activity log and its side tables.

use std::sync::Arc;

use chrono::{Duration, Utc};
use crm_ingest::models::activity::{
    ActivityKind, ActivityRecord, CallAnalysis, Direction, Speaker, Utterance,
};
use crm_ingest::models::client::{ClientRecord, IncomingClient};
use crm_ingest::models::notification::NotificationRecord;
use crm_ingest::models::task::{TaskPriority, TaskRecord, TaskStatus};
use crm_ingest::persistence::activity_repo::ActivityRepo;
use crm_ingest::persistence::client_repo::ClientRepo;
use crm_ingest::persistence::db::{self, Database};
use crm_ingest::persistence::notification_repo::NotificationRepo;
use crm_ingest::persistence::task_repo::TaskRepo;
use crm_ingest::AppError;

async fn with_client() -> (Arc<Database>, String) {
    let db = Arc::new(db::connect_memory().await.expect("db"));
    let incoming = IncomingClient {
        name: "Ada".into(),
        ..IncomingClient::default()
    };
    let client = ClientRepo::new(Arc::clone(&db))
        .create(&ClientRecord::from_incoming("CL-0001".into(), &incoming))
        .await
        .expect("client");
    (db, client.id)
}

// ─── Activities ───────────────────────────────────────────────────────

#[tokio::test]
async fn call_activity_round_trips_analysis_and_transcript() {
    let (db, client_id) = with_client().await;
    let repo = ActivityRepo::new(db);

    let activity = ActivityRecord::new(
        client_id.clone(),
        ActivityKind::Call,
        Direction::Inbound,
        "Inbound call from 5551234567",
        Some("call-1".into()),
    )
    .with_analysis(Some(CallAnalysis {
        summary: Some("Wants a review".into()),
        ..CallAnalysis::default()
    }))
    .with_transcript(vec![Utterance {
        speaker: Speaker::Caller,
        text: "Hello".into(),
    }])
    .with_recording(Some("https://rec.example/1".into()));
    repo.insert(&activity).await.expect("insert");

    let stored = repo.list_for_client(&client_id).await.expect("list");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].description, "Inbound call from 5551234567 [ref:call-1]");
    assert_eq!(
        stored[0].analysis.as_ref().and_then(|a| a.summary.as_deref()),
        Some("Wants a review")
    );
    assert_eq!(stored[0].transcript.len(), 1);
    assert_eq!(stored[0].recording_url.as_deref(), Some("https://rec.example/1"));
}

#[tokio::test]
async fn external_ref_is_unique() {
    let (db, client_id) = with_client().await;
    let repo = ActivityRepo::new(db);

    let first = ActivityRecord::new(
        client_id.clone(),
        ActivityKind::Call,
        Direction::Inbound,
        "first",
        Some("call-1".into()),
    );
    repo.insert(&first).await.expect("first insert");
    assert!(repo.exists_for_external_ref("call-1").await.expect("query"));

    let second = ActivityRecord::new(
        client_id,
        ActivityKind::Call,
        Direction::Inbound,
        "second",
        Some("call-1".into()),
    );
    let err = repo.insert(&second).await.expect_err("duplicate ref");
    assert!(matches!(err, AppError::AlreadyExists(_)));
    assert_eq!(repo.count().await.expect("count"), 1);
}

#[tokio::test]
async fn activities_without_ref_never_collide() {
    let (db, client_id) = with_client().await;
    let repo = ActivityRepo::new(db);
    for _ in 0..2 {
        let note = ActivityRecord::new(
            client_id.clone(),
            ActivityKind::Note,
            Direction::Inbound,
            "note",
            None,
        );
        repo.insert(&note).await.expect("insert");
    }
    assert_eq!(repo.count().await.expect("count"), 2);
}

#[tokio::test]
async fn empty_analysis_is_dropped() {
    let activity = ActivityRecord::new(
        "c".into(),
        ActivityKind::Call,
        Direction::Outbound,
        "call",
        None,
    )
    .with_analysis(Some(CallAnalysis::default()));
    assert!(activity.analysis.is_none());
}

// ─── Tasks and notifications ──────────────────────────────────────────

#[tokio::test]
async fn tasks_persist_as_pending() {
    let (db, client_id) = with_client().await;
    let repo = TaskRepo::new(db);
    let due = Utc::now() + Duration::days(1);

    let task = TaskRecord::new(
        Some(client_id.clone()),
        "Follow up: send brochure".into(),
        None,
        TaskPriority::Medium,
        due,
    );
    repo.insert(&task).await.expect("insert");

    let tasks = repo.list_for_client(&client_id).await.expect("list");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status, TaskStatus::Pending);
    assert_eq!(tasks[0].priority, TaskPriority::Medium);
    assert_eq!(tasks[0].due_at.timestamp(), due.timestamp());
}

#[tokio::test]
async fn notifications_list_newest_first_and_unread() {
    let (db, _) = with_client().await;
    let repo = NotificationRepo::new(db);

    let mut older = NotificationRecord::new(
        "adv-1".into(),
        "call",
        "Older".into(),
        "m".into(),
        None,
    );
    older.created_at = Utc::now() - Duration::minutes(5);
    repo.insert(&older).await.expect("insert");
    let newer = NotificationRecord::new(
        "adv-1".into(),
        "call",
        "Newer".into(),
        "m".into(),
        Some("/clients/x".into()),
    );
    repo.insert(&newer).await.expect("insert");

    let listed = repo.list_for_recipient("adv-1").await.expect("list");
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].title, "Newer");
    assert!(listed.iter().all(|n| !n.read));
    assert!(repo.list_for_recipient("adv-2").await.expect("list").is_empty());
}
