//! Unit tests for column mapping and row conversion.

use crm_ingest::import::mapping::{map_row, validate_mapping};
use crm_ingest::import::parse::parse_delimited;
use crm_ingest::import::{ColumnMapping, ParsedTable, TargetField, Transform};
use crm_ingest::models::client::{ClientStatus, PipelineStage};
use crm_ingest::AppError;

fn table(csv: &str) -> ParsedTable {
    parse_delimited(csv.as_bytes()).expect("csv parses")
}

fn row(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_owned()).collect()
}

// ─── Validation ───────────────────────────────────────────────────────

#[test]
fn mapping_to_missing_column_is_rejected() {
    let t = table("Name,Email\nAda,ada@example.com\n");
    let mapping = vec![
        ColumnMapping::new("Name", TargetField::Name),
        ColumnMapping::new("Mobile", TargetField::Phone),
    ];
    let err = validate_mapping(&t, &mapping).expect_err("missing column");
    assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("Mobile")));
}

#[test]
fn mapping_that_skips_everything_is_rejected() {
    let t = table("Name\nAda\n");
    let mapping = vec![ColumnMapping::new("Name", TargetField::Skip)];
    assert!(matches!(
        validate_mapping(&t, &mapping),
        Err(AppError::Validation(_))
    ));
}

#[test]
fn skipped_columns_need_not_exist() {
    let t = table("Name\nAda\n");
    let mapping = vec![
        ColumnMapping::new("Name", TargetField::Name),
        ColumnMapping::new("Notes", TargetField::Skip),
    ];
    assert!(validate_mapping(&t, &mapping).is_ok());
}

// ─── Row conversion ───────────────────────────────────────────────────

#[test]
fn primary_identifiers_precede_secondary_ones() {
    let t = table("Alt Email,Email,Alt Phone,Phone,Name\n");
    let mapping = vec![
        ColumnMapping::new("Alt Email", TargetField::SecondaryEmail),
        ColumnMapping::new("Email", TargetField::Email),
        ColumnMapping::new("Alt Phone", TargetField::SecondaryPhone),
        ColumnMapping::new("Phone", TargetField::Phone),
        ColumnMapping::new("Name", TargetField::Name),
    ];
    let resolved = validate_mapping(&t, &mapping).expect("valid");
    let incoming = map_row(
        &resolved,
        &row(&["alt@example.com", "main@example.com", "5550002222", "5550001111", "Ada"]),
    )
    .expect("row maps");

    assert_eq!(incoming.emails, vec!["main@example.com", "alt@example.com"]);
    assert_eq!(incoming.phones, vec!["5550001111", "5550002222"]);
}

#[test]
fn first_and_last_name_are_joined_when_name_is_blank() {
    let t = table("First,Last,Name\n");
    let mapping = vec![
        ColumnMapping::new("First", TargetField::FirstName),
        ColumnMapping::new("Last", TargetField::LastName),
        ColumnMapping::new("Name", TargetField::Name),
    ];
    let resolved = validate_mapping(&t, &mapping).expect("valid");

    let joined = map_row(&resolved, &row(&["Ada", "Lovelace", ""])).expect("row maps");
    assert_eq!(joined.name, "Ada Lovelace");

    let explicit = map_row(&resolved, &row(&["Ada", "Lovelace", "Countess"])).expect("row maps");
    assert_eq!(explicit.name, "Countess");
}

#[test]
fn nameless_row_is_a_validation_error() {
    let t = table("Name,Email\n");
    let mapping = vec![
        ColumnMapping::new("Name", TargetField::Name),
        ColumnMapping::new("Email", TargetField::Email),
    ];
    let resolved = validate_mapping(&t, &mapping).expect("valid");
    let err = map_row(&resolved, &row(&["  ", "x@example.com"])).expect_err("no name");
    assert_eq!(err.to_string(), "validation: name is required");
}

#[test]
fn status_and_stage_labels_are_parsed() {
    let t = table("Name,Status,Stage\n");
    let mapping = vec![
        ColumnMapping::new("Name", TargetField::Name),
        ColumnMapping::new("Status", TargetField::Status),
        ColumnMapping::new("Stage", TargetField::Stage),
    ];
    let resolved = validate_mapping(&t, &mapping).expect("valid");

    let incoming = map_row(&resolved, &row(&["Ada", "prospect", "contacted"])).expect("maps");
    assert_eq!(incoming.status, Some(ClientStatus::Prospect));
    assert_eq!(incoming.stage, Some(PipelineStage::Contacted));

    let err = map_row(&resolved, &row(&["Ada", "dormant", ""])).expect_err("bad status");
    assert!(err.is_validation());
}

#[test]
fn transforms_and_tag_splitting_apply() {
    let t = table("Name,Email,Phone,Tags\n");
    let mapping = vec![
        ColumnMapping::new("Name", TargetField::Name),
        ColumnMapping {
            transform: Some(Transform::Lowercase),
            ..ColumnMapping::new("Email", TargetField::Email)
        },
        ColumnMapping {
            transform: Some(Transform::PhoneFormat),
            ..ColumnMapping::new("Phone", TargetField::Phone)
        },
        ColumnMapping::new("Tags", TargetField::Tags),
    ];
    let resolved = validate_mapping(&t, &mapping).expect("valid");
    let incoming = map_row(
        &resolved,
        &row(&["Ada", "ADA@Example.com", "555.123.4567", "vip; retiree"]),
    )
    .expect("maps");

    assert_eq!(incoming.emails, vec!["ada@example.com"]);
    assert_eq!(incoming.phones, vec!["(555) 123-4567"]);
    assert_eq!(incoming.tags, vec!["vip", "retiree"]);
}

#[test]
fn short_rows_leave_trailing_fields_empty() {
    let t = table("Name,Email,Phone\n");
    let mapping = vec![
        ColumnMapping::new("Name", TargetField::Name),
        ColumnMapping::new("Phone", TargetField::Phone),
    ];
    let resolved = validate_mapping(&t, &mapping).expect("valid");
    let incoming = map_row(&resolved, &row(&["Ada"])).expect("maps");
    assert!(incoming.phones.is_empty());
}

// ─── Wire format ──────────────────────────────────────────────────────

#[test]
fn mapping_entries_deserialize_from_camel_case() {
    let json = r#"[
        {"sourceColumn": "E-mail", "targetField": "secondary_email"},
        {"sourceColumn": "Tel", "targetField": "phone", "transform": "phone_format"}
    ]"#;
    let mapping: Vec<ColumnMapping> = serde_json::from_str(json).expect("deserializes");
    assert_eq!(mapping[0].target_field, TargetField::SecondaryEmail);
    assert_eq!(mapping[1].transform, Some(Transform::PhoneFormat));
}
