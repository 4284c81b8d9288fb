//! Unit tests for import job state transitions.

use std::sync::Arc;

use chrono::Utc;
use crm_ingest::import::ParsedTable;
use crm_ingest::models::import_job::{ImportJob, ImportStatus, RowError};
use crm_ingest::persistence::db;
use crm_ingest::persistence::import_job_repo::ImportJobRepo;
use crm_ingest::AppError;

fn staged() -> ParsedTable {
    ParsedTable {
        columns: vec!["Name".into()],
        rows: vec![vec!["Ada".into()], vec!["Grace".into()]],
        row_numbers: vec![2, 3],
    }
}

async fn repo_with_job() -> (ImportJobRepo, ImportJob) {
    let db = db::connect_memory().await.expect("db");
    let repo = ImportJobRepo::new(Arc::new(db));
    let job = repo
        .create(&ImportJob::new("clients.csv".into(), 2), &staged())
        .await
        .expect("create");
    (repo, job)
}

// ─── Staging ──────────────────────────────────────────────────────────

#[tokio::test]
async fn new_job_is_pending_with_staged_rows() {
    let (repo, job) = repo_with_job().await;

    let loaded = repo.get(&job.id).await.expect("get");
    assert_eq!(loaded.status, ImportStatus::Pending);
    assert_eq!(loaded.total_rows, 2);
    assert_eq!(loaded.processed_count, 0);

    let table: ParsedTable = repo.load_staged(&job.id).await.expect("staged");
    assert_eq!(table, staged());
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let (repo, _) = repo_with_job().await;
    assert!(matches!(repo.get("missing").await, Err(AppError::NotFound(_))));
    assert!(matches!(
        repo.load_staged::<ParsedTable>("missing").await,
        Err(AppError::NotFound(_))
    ));
}

// ─── Transitions ──────────────────────────────────────────────────────

#[tokio::test]
async fn job_starts_only_once() {
    let (repo, job) = repo_with_job().await;

    let started = repo.begin_processing(&job.id, Utc::now()).await.expect("start");
    assert_eq!(started.status, ImportStatus::Processing);
    assert!(started.started_at.is_some());

    let err = repo
        .begin_processing(&job.id, Utc::now())
        .await
        .expect_err("second start");
    assert!(matches!(err, AppError::AlreadyExists(_)));
}

#[tokio::test]
async fn progress_and_completion_are_persisted() {
    let (repo, job) = repo_with_job().await;
    let mut running = repo.begin_processing(&job.id, Utc::now()).await.expect("start");

    running.processed_count = 1;
    running.created_count = 1;
    repo.flush_progress(&running).await.expect("flush");
    assert_eq!(repo.get(&job.id).await.expect("get").processed_count, 1);

    running.processed_count = 2;
    running.error_count = 1;
    running.errors.push(RowError {
        row: 3,
        message: "validation: name is required".into(),
    });
    let done = repo.complete(&running, Utc::now()).await.expect("complete");
    assert_eq!(done.status, ImportStatus::Completed);

    let loaded = repo.get(&job.id).await.expect("get");
    assert_eq!(loaded.status, ImportStatus::Completed);
    assert_eq!(loaded.errors, running.errors);
    assert!(loaded.completed_at.is_some());
}

#[tokio::test]
async fn completed_job_releases_staged_rows() {
    let (repo, job) = repo_with_job().await;
    let running = repo.begin_processing(&job.id, Utc::now()).await.expect("start");
    repo.complete(&running, Utc::now()).await.expect("complete");

    let err = repo
        .load_staged::<ParsedTable>(&job.id)
        .await
        .expect_err("staged rows cleared");
    assert!(matches!(err, AppError::AlreadyExists(_)));
}

#[tokio::test]
async fn pending_job_cannot_complete() {
    let (repo, job) = repo_with_job().await;
    assert!(repo.complete(&job, Utc::now()).await.is_err());
}

// ─── Wire view ────────────────────────────────────────────────────────

#[test]
fn success_count_sums_created_and_updated() {
    let mut job = ImportJob::new("f.csv".into(), 10);
    job.created_count = 3;
    job.updated_count = 2;
    job.skipped_count = 4;
    job.error_count = 1;

    let view = job.status_view();
    assert_eq!(view.success_count, 5);
    assert_eq!(view.total_records, 10);
}
