//! Identity resolution against stored client identifiers.
//!
//! Precedence is fixed: an email match wins over a phone match, and the
//! two signals are never combined, so a phone that belongs to another
//! client is not looked up once an email matches. Names are never used as
//! a key.

use tracing::debug;

use crate::models::client::ClientRecord;
use crate::persistence::client_repo::ClientRepo;
use crate::Result;

use super::normalize::{normalize_email, normalize_phone};

/// Identifiers extracted from an import row or inbound event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityCandidates {
    /// Display name. Only used when a new record is created.
    pub name: Option<String>,
    /// Email candidates, tried in order.
    pub emails: Vec<String>,
    /// Phone candidates, tried in order.
    pub phones: Vec<String>,
}

impl IdentityCandidates {
    /// Candidates carrying a single phone number.
    #[must_use]
    pub fn from_phone(phone: &str) -> Self {
        Self {
            phones: vec![phone.to_owned()],
            ..Self::default()
        }
    }

    /// Candidates carrying an optional email and phone.
    #[must_use]
    pub fn from_parts(name: Option<&str>, email: Option<&str>, phone: Option<&str>) -> Self {
        Self {
            name: name.map(str::to_owned),
            emails: email.into_iter().map(str::to_owned).collect(),
            phones: phone.into_iter().map(str::to_owned).collect(),
        }
    }
}

/// Finds the client an incoming set of identifiers refers to.
#[derive(Clone)]
pub struct IdentityResolver {
    clients: ClientRepo,
}

impl IdentityResolver {
    /// Create a resolver over the given client repository.
    #[must_use]
    pub fn new(clients: ClientRepo) -> Self {
        Self { clients }
    }

    /// Resolve candidates to zero or one client.
    ///
    /// Primary and secondary identifiers are both searched.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if a lookup fails.
    pub async fn resolve(&self, candidates: &IdentityCandidates) -> Result<Option<ClientRecord>> {
        for raw in &candidates.emails {
            let canonical = normalize_email(raw);
            if canonical.is_empty() {
                continue;
            }
            if let Some(client) = self.clients.find_by_email(&canonical).await? {
                debug!(client_id = %client.id, "identity resolved by email");
                return Ok(Some(client));
            }
        }

        let found = self.phone_match(candidates).await?;
        if let Some(ref client) = found {
            debug!(client_id = %client.id, "identity resolved by phone");
        }
        Ok(found)
    }

    async fn phone_match(&self, candidates: &IdentityCandidates) -> Result<Option<ClientRecord>> {
        for raw in &candidates.phones {
            let canonical = normalize_phone(raw);
            if canonical.is_empty() {
                continue;
            }
            if let Some(client) = self.clients.find_by_phone(&canonical).await? {
                return Ok(Some(client));
            }
        }
        Ok(None)
    }
}
