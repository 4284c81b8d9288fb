//! Unit tests for `ClientRepo` persistence and code assignment.

use std::sync::Arc;

use chrono::Utc;
use crm_ingest::models::client::{ClientPatch, ClientRecord, ClientStatus, IncomingClient};
use crm_ingest::persistence::client_repo::ClientRepo;
use crm_ingest::persistence::db;
use crm_ingest::AppError;

async fn repo() -> ClientRepo {
    let db = db::connect_memory().await.expect("db");
    ClientRepo::new(Arc::new(db))
}

fn record(code: &str, name: &str) -> ClientRecord {
    let incoming = IncomingClient {
        name: name.into(),
        emails: vec![format!("{}@example.com", name.to_lowercase())],
        phones: vec!["(555) 123-4567".into()],
        tags: vec!["vip".into()],
        ..IncomingClient::default()
    };
    ClientRecord::from_incoming(code.into(), &incoming)
}

// ─── Create and read ──────────────────────────────────────────────────

#[tokio::test]
async fn create_round_trips_contacts_and_tags() {
    let repo = repo().await;
    let saved = repo.create(&record("CL-0001", "Ada")).await.expect("create");

    let loaded = repo.get_by_id(&saved.id).await.expect("load");
    assert_eq!(loaded.client_code, "CL-0001");
    assert_eq!(loaded.status, ClientStatus::Lead);
    assert_eq!(loaded.tags, vec!["vip"]);
    assert_eq!(loaded.primary_phone().map(|p| p.value.as_str()), Some("(555) 123-4567"));
    assert_eq!(loaded.primary_phone().map(|p| p.canonical.as_str()), Some("5551234567"));
    assert_eq!(loaded.primary_email().map(|e| e.canonical.as_str()), Some("ada@example.com"));
}

#[tokio::test]
async fn duplicate_code_is_already_exists() {
    let repo = repo().await;
    repo.create(&record("CL-0001", "Ada")).await.expect("first");
    let err = repo
        .create(&record("CL-0001", "Grace"))
        .await
        .expect_err("duplicate code");
    assert!(matches!(err, AppError::AlreadyExists(_)));
}

#[tokio::test]
async fn missing_client_is_not_found() {
    let repo = repo().await;
    assert!(matches!(
        repo.get_by_id("nope").await,
        Err(AppError::NotFound(_))
    ));
    assert!(repo.find_by_code("CL-9999").await.expect("query").is_none());
}

// ─── Code assignment ──────────────────────────────────────────────────

#[tokio::test]
async fn generated_codes_follow_the_highest_existing_code() {
    let repo = repo().await;
    repo.create(&record("CL-0001", "Ada")).await.expect("create");
    repo.create(&record("CL-0003", "Grace")).await.expect("create");

    let next = repo
        .create_with_next_code(record("", "Barbara"), 3)
        .await
        .expect("create");
    assert_eq!(next.client_code, "CL-0004");
    assert_eq!(repo.next_code().await.expect("next"), "CL-0005");
}

#[tokio::test]
async fn empty_store_starts_at_one() {
    let repo = repo().await;
    let first = repo
        .create_with_next_code(record("", "Ada"), 0)
        .await
        .expect("create");
    assert_eq!(first.client_code, "CL-0001");
}

// ─── Updates ──────────────────────────────────────────────────────────

#[tokio::test]
async fn patch_appends_secondary_contacts_without_replacing_primary() {
    let repo = repo().await;
    let saved = repo.create(&record("CL-0001", "Ada")).await.expect("create");

    let patch = ClientPatch {
        status: Some(ClientStatus::Active),
        add_emails: vec!["countess@example.com".into()],
        add_phones: vec!["555 987 6543".into()],
        ..ClientPatch::default()
    };
    let updated = repo.apply_patch(&saved.id, &patch).await.expect("patch");
    assert_eq!(updated.status, ClientStatus::Active);

    let loaded = repo.get_by_id(&saved.id).await.expect("load");
    assert_eq!(loaded.emails.len(), 2);
    assert_eq!(loaded.phones.len(), 2);
    assert_eq!(loaded.primary_email().map(|e| e.canonical.as_str()), Some("ada@example.com"));
    assert!(!loaded.emails[1].primary);

    let found = repo.find_by_phone("5559876543").await.expect("query");
    assert_eq!(found.map(|c| c.id), Some(saved.id));
}

#[tokio::test]
async fn touch_and_assign_update_the_record() {
    let repo = repo().await;
    let saved = repo.create(&record("CL-0001", "Ada")).await.expect("create");
    let now = Utc::now();

    repo.touch_last_contact(&saved.id, now).await.expect("touch");
    repo.assign_advisor(&saved.id, "adv-1").await.expect("assign");

    let loaded = repo.get_by_id(&saved.id).await.expect("load");
    assert_eq!(loaded.last_contact_at.map(|t| t.timestamp()), Some(now.timestamp()));
    assert_eq!(loaded.assigned_advisor_id.as_deref(), Some("adv-1"));

    assert!(matches!(
        repo.touch_last_contact("missing", now).await,
        Err(AppError::NotFound(_))
    ));
}

// ─── Delete ───────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_removes_the_client_and_frees_its_identifiers() {
    let repo = repo().await;
    let saved = repo.create(&record("CL-0001", "Ada")).await.expect("create");

    repo.delete(&saved.id).await.expect("delete");

    assert_eq!(repo.count().await.expect("count"), 0);
    assert!(repo.find_by_phone("5551234567").await.expect("query").is_none());
    assert!(repo.find_by_email("ada@example.com").await.expect("query").is_none());
    assert!(matches!(
        repo.delete(&saved.id).await,
        Err(AppError::NotFound(_))
    ));
}
