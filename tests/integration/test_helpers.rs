//! Shared test helpers for integration tests.
//!
//! Provides in-memory `AppState`, a test `GlobalConfig`, and seeded
//! clients and advisors so individual test modules can focus on
//! behaviour rather than boilerplate.

use std::sync::Arc;

use crm_ingest::config::GlobalConfig;
use crm_ingest::http::AppState;
use crm_ingest::models::client::{ClientRecord, IncomingClient};
use crm_ingest::persistence::advisor_repo::AdvisorRepo;
use crm_ingest::persistence::client_repo::ClientRepo;
use crm_ingest::persistence::db;
use sqlx::SqlitePool;

/// Build a `GlobalConfig` with a small flush interval and one active
/// advisor plus one inactive advisor.
pub fn test_config() -> GlobalConfig {
    let toml = r#"
http_port = 0

[database]
path = "unused-in-memory.db"

[import]
progress_flush_every = 2
max_rows = 50

[[advisors]]
id = "adv-alex"
name = "Alex Advisor"
email = "alex@example.com"

[[advisors]]
id = "adv-zed"
name = "Zed Retired"
email = "zed@example.com"
active = false
"#;
    GlobalConfig::from_toml_str(toml).expect("valid test config")
}

/// Build a complete `AppState` over an in-memory database with the test
/// advisor roster seeded.
pub async fn test_app_state(config: GlobalConfig) -> Arc<AppState> {
    let database = Arc::new(db::connect_memory().await.expect("db connect"));
    AdvisorRepo::new(Arc::clone(&database))
        .seed(&config.advisors)
        .await
        .expect("seed advisors");
    Arc::new(AppState::new(Arc::new(config), database))
}

/// Insert a client with the given code, name, email, and phone.
#[allow(dead_code)]
pub async fn insert_client(
    db: &Arc<SqlitePool>,
    code: &str,
    name: &str,
    email: Option<&str>,
    phone: Option<&str>,
) -> ClientRecord {
    let incoming = IncomingClient {
        name: name.to_owned(),
        emails: email.into_iter().map(str::to_owned).collect(),
        phones: phone.into_iter().map(str::to_owned).collect(),
        ..IncomingClient::default()
    };
    ClientRepo::new(Arc::clone(db))
        .create(&ClientRecord::from_incoming(code.to_owned(), &incoming))
        .await
        .expect("create client")
}

/// Assign an advisor to a stored client.
#[allow(dead_code)]
pub async fn assign(db: &Arc<SqlitePool>, client_id: &str, advisor_id: &str) {
    ClientRepo::new(Arc::clone(db))
        .assign_advisor(client_id, advisor_id)
        .await
        .expect("assign advisor");
}
