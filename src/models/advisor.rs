//! Advisor roster model.

use serde::{Deserialize, Serialize};

use crate::config::AdvisorSeed;

/// An advisor who can own clients and take appointments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Advisor {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Whether the advisor takes new appointments.
    pub active: bool,
}

impl From<&AdvisorSeed> for Advisor {
    fn from(seed: &AdvisorSeed) -> Self {
        Self {
            id: seed.id.clone(),
            name: seed.name.clone(),
            email: seed.email.clone(),
            active: seed.active,
        }
    }
}
