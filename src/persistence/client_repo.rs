//! Client repository for `SQLite` persistence.
//!
//! A client row owns its phone and email rows; both are written in the
//! same transaction as the client itself.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::models::client::{
    next_client_code, ClientPatch, ClientRecord, ClientStatus, ContactPoint, PipelineStage,
};
use crate::{AppError, Result};

use super::db::Database;
use super::{parse_opt_ts, parse_ts};

/// Repository wrapper around `SQLite` for client records.
#[derive(Clone)]
pub struct ClientRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct ClientRow {
    id: String,
    client_code: String,
    name: String,
    status: String,
    stage: String,
    tags: String,
    assigned_advisor_id: Option<String>,
    last_contact_at: Option<String>,
    created_at: String,
    updated_at: String,
}

#[derive(sqlx::FromRow)]
struct ContactRow {
    value: String,
    canonical: String,
    is_primary: i64,
}

impl From<ContactRow> for ContactPoint {
    fn from(row: ContactRow) -> Self {
        Self {
            value: row.value,
            canonical: row.canonical,
            primary: row.is_primary != 0,
        }
    }
}

impl ClientRow {
    fn into_client(self, phones: Vec<ContactPoint>, emails: Vec<ContactPoint>) -> Result<ClientRecord> {
        let status = ClientStatus::parse(&self.status)
            .ok_or_else(|| AppError::Db(format!("invalid client status: {}", self.status)))?;
        let stage = PipelineStage::parse(&self.stage)
            .ok_or_else(|| AppError::Db(format!("invalid client stage: {}", self.stage)))?;
        let tags: Vec<String> = serde_json::from_str(&self.tags)
            .map_err(|e| AppError::Db(format!("invalid tags: {e}")))?;

        Ok(ClientRecord {
            id: self.id,
            client_code: self.client_code,
            name: self.name,
            status,
            stage,
            phones,
            emails,
            tags,
            assigned_advisor_id: self.assigned_advisor_id,
            last_contact_at: parse_opt_ts("last_contact_at", self.last_contact_at.as_deref())?,
            created_at: parse_ts("created_at", &self.created_at)?,
            updated_at: parse_ts("updated_at", &self.updated_at)?,
        })
    }
}

/// Contact tables share one shape.
#[derive(Clone, Copy)]
enum ContactTable {
    Phone,
    Email,
}

impl ContactTable {
    fn name(self) -> &'static str {
        match self {
            Self::Phone => "client_phone",
            Self::Email => "client_email",
        }
    }
}

fn tags_json(tags: &[String]) -> Result<String> {
    serde_json::to_string(tags).map_err(|e| AppError::Db(format!("cannot encode tags: {e}")))
}

fn is_code_conflict(err: &AppError) -> bool {
    matches!(err, AppError::AlreadyExists(msg) if msg.contains("client_code"))
}

impl ClientRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a client together with its phones and emails.
    ///
    /// # Errors
    ///
    /// Returns `AppError::AlreadyExists` if the client code is taken, or
    /// `AppError::Db` if the insert fails.
    pub async fn create(&self, client: &ClientRecord) -> Result<ClientRecord> {
        let mut tx = self.db.begin().await?;

        sqlx::query(
            "INSERT INTO client (id, client_code, name, status, stage, tags,
             assigned_advisor_id, last_contact_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&client.id)
        .bind(&client.client_code)
        .bind(&client.name)
        .bind(client.status.as_str())
        .bind(client.stage.as_str())
        .bind(tags_json(&client.tags)?)
        .bind(&client.assigned_advisor_id)
        .bind(client.last_contact_at.map(|dt| dt.to_rfc3339()))
        .bind(client.created_at.to_rfc3339())
        .bind(client.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for (position, phone) in client.phones.iter().enumerate() {
            insert_contact(&mut tx, ContactTable::Phone, &client.id, phone, position).await?;
        }
        for (position, email) in client.emails.iter().enumerate() {
            insert_contact(&mut tx, ContactTable::Email, &client.id, email, position).await?;
        }

        tx.commit().await?;
        Ok(client.clone())
    }

    /// Insert a client under the next free `CL-####` code.
    ///
    /// The code is derived from the highest existing code; a concurrent
    /// writer can claim the same code first, in which case the UNIQUE
    /// constraint rejects the insert and a fresh code is derived, up to
    /// `retry_limit` extra attempts.
    ///
    /// # Errors
    ///
    /// Returns `AppError::AlreadyExists` when every attempt conflicts, or
    /// `AppError::Db` on other failures.
    pub async fn create_with_next_code(
        &self,
        mut client: ClientRecord,
        retry_limit: u32,
    ) -> Result<ClientRecord> {
        let mut attempt = 0;
        loop {
            client.client_code = self.next_code().await?;
            match self.create(&client).await {
                Err(err) if is_code_conflict(&err) && attempt < retry_limit => {
                    attempt += 1;
                    warn!(
                        code = %client.client_code,
                        attempt,
                        "client code taken by a concurrent writer, retrying"
                    );
                }
                other => return other,
            }
        }
    }

    /// Next code after the highest numbered `CL-` code on file.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails, or `AppError::Validation`
    /// if no higher code can be formed.
    pub async fn next_code(&self) -> Result<String> {
        let codes: Vec<String> =
            sqlx::query_scalar("SELECT client_code FROM client WHERE client_code LIKE 'CL-%'")
                .fetch_all(self.db.as_ref())
                .await?;
        next_client_code(codes.iter().map(String::as_str))
    }

    /// Retrieve a client by internal identifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the client does not exist.
    pub async fn get_by_id(&self, id: &str) -> Result<ClientRecord> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("client {id}")))
    }

    /// Retrieve a client by internal identifier, if present.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<ClientRecord>> {
        let row: Option<ClientRow> = sqlx::query_as(
            "SELECT id, client_code, name, status, stage, tags, assigned_advisor_id,
             last_contact_at, created_at, updated_at
             FROM client WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(self.db.as_ref())
        .await?;

        match row {
            Some(row) => self.hydrate(row).await.map(Some),
            None => Ok(None),
        }
    }

    /// Retrieve a client by human-facing code.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<ClientRecord>> {
        let id: Option<String> = sqlx::query_scalar("SELECT id FROM client WHERE client_code = ?1")
            .bind(code)
            .fetch_optional(self.db.as_ref())
            .await?;
        match id {
            Some(id) => self.find_by_id(&id).await,
            None => Ok(None),
        }
    }

    /// Oldest client holding an email with this canonical form.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn find_by_email(&self, canonical: &str) -> Result<Option<ClientRecord>> {
        self.find_by_contact(ContactTable::Email, canonical).await
    }

    /// Oldest client holding a phone with this canonical form.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn find_by_phone(&self, canonical: &str) -> Result<Option<ClientRecord>> {
        self.find_by_contact(ContactTable::Phone, canonical).await
    }

    async fn find_by_contact(
        &self,
        table: ContactTable,
        canonical: &str,
    ) -> Result<Option<ClientRecord>> {
        // `table` comes from a closed enum of literal names, not user input.
        let query = format!(
            "SELECT c.id FROM {t} x JOIN client c ON c.id = x.client_id
             WHERE x.canonical = ?1
             ORDER BY c.created_at ASC, c.id ASC LIMIT 1",
            t = table.name()
        );
        let id: Option<String> = sqlx::query_scalar(&query)
            .bind(canonical)
            .fetch_optional(self.db.as_ref())
            .await?;
        match id {
            Some(id) => self.find_by_id(&id).await,
            None => Ok(None),
        }
    }

    /// Apply a patch to a stored client and persist the result.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the client does not exist, or
    /// `AppError::Db` if the update fails.
    pub async fn apply_patch(&self, id: &str, patch: &ClientPatch) -> Result<ClientRecord> {
        let mut current = self.get_by_id(id).await?;
        if patch.is_empty() {
            return Ok(current);
        }
        let added = patch.apply_to(&mut current);

        let mut tx = self.db.begin().await?;
        sqlx::query(
            "UPDATE client SET name = ?1, status = ?2, stage = ?3, tags = ?4, updated_at = ?5
             WHERE id = ?6",
        )
        .bind(&current.name)
        .bind(current.status.as_str())
        .bind(current.stage.as_str())
        .bind(tags_json(&current.tags)?)
        .bind(current.updated_at.to_rfc3339())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let first_new_phone = current.phones.len() - added.phones.len();
        for (offset, phone) in added.phones.iter().enumerate() {
            insert_contact(&mut tx, ContactTable::Phone, id, phone, first_new_phone + offset).await?;
        }
        let first_new_email = current.emails.len() - added.emails.len();
        for (offset, email) in added.emails.iter().enumerate() {
            insert_contact(&mut tx, ContactTable::Email, id, email, first_new_email + offset).await?;
        }
        tx.commit().await?;

        debug!(
            client_id = %id,
            phones_added = added.phones.len(),
            emails_added = added.emails.len(),
            "client patched"
        );
        Ok(current)
    }

    /// Record the most recent contact time.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the client does not exist.
    pub async fn touch_last_contact(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let stamp = at.to_rfc3339();
        let result =
            sqlx::query("UPDATE client SET last_contact_at = ?1, updated_at = ?1 WHERE id = ?2")
                .bind(&stamp)
                .bind(id)
                .execute(self.db.as_ref())
                .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("client {id}")));
        }
        Ok(())
    }

    /// Assign an advisor to a client.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the client does not exist.
    pub async fn assign_advisor(&self, id: &str, advisor_id: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE client SET assigned_advisor_id = ?1, updated_at = ?2 WHERE id = ?3",
        )
        .bind(advisor_id)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(self.db.as_ref())
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("client {id}")));
        }
        Ok(())
    }

    /// Delete a client and its contact identifiers.
    ///
    /// Only valid for a client nothing else references yet; a foreign-key
    /// violation surfaces as `AppError::Db`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the client does not exist, or
    /// `AppError::Db` if the delete fails.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut tx = self.db.begin().await?;
        for table in [ContactTable::Phone, ContactTable::Email] {
            let query = format!("DELETE FROM {t} WHERE client_id = ?1", t = table.name());
            sqlx::query(&query).bind(id).execute(&mut *tx).await?;
        }
        let result = sqlx::query("DELETE FROM client WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("client {id}")));
        }
        tx.commit().await?;
        Ok(())
    }

    /// Number of stored clients.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM client")
            .fetch_one(self.db.as_ref())
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn hydrate(&self, row: ClientRow) -> Result<ClientRecord> {
        let phones = self.load_contacts(ContactTable::Phone, &row.id).await?;
        let emails = self.load_contacts(ContactTable::Email, &row.id).await?;
        row.into_client(phones, emails)
    }

    async fn load_contacts(&self, table: ContactTable, client_id: &str) -> Result<Vec<ContactPoint>> {
        let query = format!(
            "SELECT value, canonical, is_primary FROM {t} WHERE client_id = ?1 ORDER BY position",
            t = table.name()
        );
        let rows: Vec<ContactRow> = sqlx::query_as(&query)
            .bind(client_id)
            .fetch_all(self.db.as_ref())
            .await?;
        Ok(rows.into_iter().map(ContactPoint::from).collect())
    }
}

async fn insert_contact(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    table: ContactTable,
    client_id: &str,
    point: &ContactPoint,
    position: usize,
) -> Result<()> {
    let query = format!(
        "INSERT INTO {t} (client_id, value, canonical, is_primary, position)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        t = table.name()
    );
    sqlx::query(&query)
        .bind(client_id)
        .bind(&point.value)
        .bind(&point.canonical)
        .bind(i64::from(point.primary))
        .bind(i64::try_from(position).unwrap_or(i64::MAX))
        .execute(&mut **tx)
        .await?;
    Ok(())
}
