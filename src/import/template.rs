//! Downloadable import template and the mapping that matches it.

use crate::{AppError, Result};

use super::mapping::{ColumnMapping, TargetField};

/// Template header cells and the field each one maps to.
pub const TEMPLATE_COLUMNS: [(&str, TargetField); 11] = [
    ("Client ID", TargetField::ClientCode),
    ("Name", TargetField::Name),
    ("First Name", TargetField::FirstName),
    ("Last Name", TargetField::LastName),
    ("Email", TargetField::Email),
    ("Secondary Email", TargetField::SecondaryEmail),
    ("Phone", TargetField::Phone),
    ("Secondary Phone", TargetField::SecondaryPhone),
    ("Status", TargetField::Status),
    ("Stage", TargetField::Stage),
    ("Tags", TargetField::Tags),
];

const SAMPLE_ROW: [&str; 11] = [
    "CL-0001",
    "Jane Example",
    "Jane",
    "Example",
    "jane@example.com",
    "",
    "(555) 123-4567",
    "",
    "lead",
    "new_lead",
    "retirement;referral",
];

/// Render the template as CSV: header plus one sample row.
///
/// # Errors
///
/// Returns `AppError::Import` if the writer fails.
pub fn template_csv() -> Result<String> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(TEMPLATE_COLUMNS.iter().map(|(header, _)| *header))?;
    writer.write_record(SAMPLE_ROW)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Import(format!("template flush: {e}")))?;
    String::from_utf8(bytes).map_err(|e| AppError::Import(format!("template encoding: {e}")))
}

/// Mapping for a file that uses the template's headers.
#[must_use]
pub fn default_mapping() -> Vec<ColumnMapping> {
    TEMPLATE_COLUMNS
        .iter()
        .map(|(header, field)| ColumnMapping::new(header, *field))
        .collect()
}
