//! `SQLite` schema bootstrap logic.
//!
//! All table definitions use `CREATE TABLE IF NOT EXISTS`; safe to
//! re-run on every server startup. Produces a convergent result.
//!
//! The UNIQUE constraints on `client.client_code` and
//! `activity.external_ref` are the authoritative guards for code
//! assignment and webhook idempotency; application-level checks in front
//! of them are advisory.

use sqlx::SqlitePool;

use crate::Result;

/// Apply all table definitions to the connected `SQLite` database.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS advisor (
    id              TEXT PRIMARY KEY NOT NULL,
    name            TEXT NOT NULL,
    email           TEXT NOT NULL,
    active          INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS client (
    id                  TEXT PRIMARY KEY NOT NULL,
    client_code         TEXT NOT NULL UNIQUE,
    name                TEXT NOT NULL,
    status              TEXT NOT NULL CHECK(status IN ('lead','prospect','active')),
    stage               TEXT NOT NULL CHECK(stage IN ('new_lead','contacted','meeting_scheduled','proposal_sent','onboarding','won')),
    tags                TEXT NOT NULL DEFAULT '[]',
    assigned_advisor_id TEXT,
    last_contact_at     TEXT,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS client_phone (
    client_id       TEXT NOT NULL REFERENCES client(id),
    value           TEXT NOT NULL,
    canonical       TEXT NOT NULL,
    is_primary      INTEGER NOT NULL DEFAULT 0,
    position        INTEGER NOT NULL,
    UNIQUE(client_id, canonical)
);

CREATE TABLE IF NOT EXISTS client_email (
    client_id       TEXT NOT NULL REFERENCES client(id),
    value           TEXT NOT NULL,
    canonical       TEXT NOT NULL,
    is_primary      INTEGER NOT NULL DEFAULT 0,
    position        INTEGER NOT NULL,
    UNIQUE(client_id, canonical)
);

CREATE TABLE IF NOT EXISTS activity (
    id              TEXT PRIMARY KEY NOT NULL,
    client_id       TEXT NOT NULL REFERENCES client(id),
    kind            TEXT NOT NULL CHECK(kind IN ('call','message','transfer','appointment','import','note')),
    direction       TEXT NOT NULL CHECK(direction IN ('inbound','outbound')),
    description     TEXT NOT NULL,
    external_ref    TEXT UNIQUE,
    analysis        TEXT,
    transcript      TEXT NOT NULL DEFAULT '[]',
    recording_url   TEXT,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS task (
    id              TEXT PRIMARY KEY NOT NULL,
    client_id       TEXT REFERENCES client(id),
    title           TEXT NOT NULL,
    description     TEXT,
    priority        TEXT NOT NULL CHECK(priority IN ('low','medium','high')),
    due_at          TEXT NOT NULL,
    status          TEXT NOT NULL CHECK(status IN ('pending','completed')),
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notification (
    id              TEXT PRIMARY KEY NOT NULL,
    recipient_id    TEXT NOT NULL,
    kind            TEXT NOT NULL,
    title           TEXT NOT NULL,
    message         TEXT NOT NULL,
    link            TEXT,
    is_read         INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS appointment (
    id              TEXT PRIMARY KEY NOT NULL,
    client_id       TEXT NOT NULL REFERENCES client(id),
    advisor_id      TEXT,
    title           TEXT NOT NULL,
    starts_at       TEXT NOT NULL,
    ends_at         TEXT NOT NULL,
    status          TEXT NOT NULL CHECK(status IN ('scheduled','rescheduled','cancelled')),
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS import_job (
    id              TEXT PRIMARY KEY NOT NULL,
    filename        TEXT NOT NULL,
    total_rows      INTEGER NOT NULL,
    processed_count INTEGER NOT NULL DEFAULT 0,
    created_count   INTEGER NOT NULL DEFAULT 0,
    updated_count   INTEGER NOT NULL DEFAULT 0,
    skipped_count   INTEGER NOT NULL DEFAULT 0,
    error_count     INTEGER NOT NULL DEFAULT 0,
    errors          TEXT NOT NULL DEFAULT '[]',
    status          TEXT NOT NULL CHECK(status IN ('pending','processing','completed')),
    staged_table    TEXT,
    created_at      TEXT NOT NULL,
    started_at      TEXT,
    completed_at    TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_client_phone_primary ON client_phone(client_id) WHERE is_primary = 1;
CREATE UNIQUE INDEX IF NOT EXISTS idx_client_email_primary ON client_email(client_id) WHERE is_primary = 1;
CREATE INDEX IF NOT EXISTS idx_client_phone_canonical ON client_phone(canonical);
CREATE INDEX IF NOT EXISTS idx_client_email_canonical ON client_email(canonical);
CREATE INDEX IF NOT EXISTS idx_activity_client ON activity(client_id);
CREATE INDEX IF NOT EXISTS idx_task_client ON task(client_id);
CREATE INDEX IF NOT EXISTS idx_notification_recipient ON notification(recipient_id);
CREATE INDEX IF NOT EXISTS idx_appointment_client ON appointment(client_id);
CREATE INDEX IF NOT EXISTS idx_appointment_advisor ON appointment(advisor_id);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
