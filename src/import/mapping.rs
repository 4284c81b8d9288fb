//! Column mapping from uploaded headers onto client fields.

use serde::{Deserialize, Serialize};

use crate::identity::normalize::format_phone;
use crate::models::client::{ClientStatus, IncomingClient, PipelineStage};
use crate::{AppError, Result};

use super::parse::ParsedTable;

/// Client field a source column can feed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TargetField {
    /// Explicit `CL-####` code.
    ClientCode,
    /// Full display name.
    Name,
    /// Given name, joined with `LastName` when `Name` is empty.
    FirstName,
    /// Family name.
    LastName,
    /// Primary email candidate.
    Email,
    /// Additional email.
    SecondaryEmail,
    /// Primary phone candidate.
    Phone,
    /// Additional phone.
    SecondaryPhone,
    /// Lifecycle status label.
    Status,
    /// Pipeline stage label.
    Stage,
    /// Tags separated by `;` or `,`.
    Tags,
    /// Ignore the column.
    Skip,
}

/// Value rewrite applied before a cell is assigned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Upper-case the value.
    Uppercase,
    /// Lower-case the value.
    Lowercase,
    /// Render a phone number in display form.
    PhoneFormat,
}

impl Transform {
    /// Apply the transform to a trimmed cell value.
    #[must_use]
    pub fn apply(self, value: &str) -> String {
        match self {
            Self::Uppercase => value.to_uppercase(),
            Self::Lowercase => value.to_lowercase(),
            Self::PhoneFormat => format_phone(value),
        }
    }
}

/// One source column routed to one target field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    /// Header in the uploaded file.
    pub source_column: String,
    /// Client field receiving the value.
    pub target_field: TargetField,
    /// Optional rewrite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
}

impl ColumnMapping {
    /// Mapping without a transform.
    #[must_use]
    pub fn new(source_column: &str, target_field: TargetField) -> Self {
        Self {
            source_column: source_column.to_owned(),
            target_field,
            transform: None,
        }
    }
}

/// A mapping checked against a table, with header positions resolved.
#[derive(Debug, Clone)]
pub struct ResolvedMapping {
    entries: Vec<(usize, TargetField, Option<Transform>)>,
}

/// Check that every mapped source column exists in the table.
///
/// # Errors
///
/// Returns `AppError::Validation` naming the first missing column, or if
/// the mapping is empty.
pub fn validate_mapping(table: &ParsedTable, mapping: &[ColumnMapping]) -> Result<ResolvedMapping> {
    if mapping.iter().all(|m| m.target_field == TargetField::Skip) {
        return Err(AppError::Validation("mapping assigns no fields".into()));
    }

    let mut entries = Vec::with_capacity(mapping.len());
    for entry in mapping {
        if entry.target_field == TargetField::Skip {
            continue;
        }
        let index = table.column_index(entry.source_column.trim()).ok_or_else(|| {
            AppError::Validation(format!(
                "mapped column {:?} is not in the file",
                entry.source_column
            ))
        })?;
        entries.push((index, entry.target_field, entry.transform));
    }
    Ok(ResolvedMapping { entries })
}

/// Build the incoming client for one data row.
///
/// # Errors
///
/// Returns `AppError::Validation` if the row has no name or carries an
/// unrecognised status or stage.
pub fn map_row(mapping: &ResolvedMapping, row: &[String]) -> Result<IncomingClient> {
    let mut incoming = IncomingClient::default();
    let mut first_name = String::new();
    let mut last_name = String::new();
    let mut secondary_emails = Vec::new();
    let mut secondary_phones = Vec::new();

    for &(index, field, transform) in &mapping.entries {
        let raw = row.get(index).map_or("", |v| v.trim());
        if raw.is_empty() {
            continue;
        }
        let value = transform.map_or_else(|| raw.to_owned(), |t| t.apply(raw));

        match field {
            TargetField::ClientCode => incoming.client_code = Some(value),
            TargetField::Name => incoming.name = value,
            TargetField::FirstName => first_name = value,
            TargetField::LastName => last_name = value,
            TargetField::Email => incoming.emails.insert(0, value),
            TargetField::SecondaryEmail => secondary_emails.push(value),
            TargetField::Phone => incoming.phones.insert(0, value),
            TargetField::SecondaryPhone => secondary_phones.push(value),
            TargetField::Status => {
                incoming.status = Some(ClientStatus::parse(&value).ok_or_else(|| {
                    AppError::Validation(format!("unknown status {value:?}"))
                })?);
            }
            TargetField::Stage => {
                incoming.stage = Some(PipelineStage::parse(&value).ok_or_else(|| {
                    AppError::Validation(format!("unknown stage {value:?}"))
                })?);
            }
            TargetField::Tags => incoming.tags.extend(split_tags(&value)),
            TargetField::Skip => {}
        }
    }

    incoming.emails.extend(secondary_emails);
    incoming.phones.extend(secondary_phones);

    if incoming.name.is_empty() {
        incoming.name = [first_name.as_str(), last_name.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
    }
    if incoming.name.is_empty() {
        return Err(AppError::Validation("name is required".into()));
    }
    Ok(incoming)
}

fn split_tags(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split([';', ','])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}
