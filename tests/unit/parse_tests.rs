//! Unit tests for tabular file parsing, previews, and the template.

use crm_ingest::import::parse::{parse_table, preview};
use crm_ingest::import::template::{default_mapping, template_csv, TEMPLATE_COLUMNS};
use crm_ingest::AppError;

// ─── Delimited text ───────────────────────────────────────────────────

#[test]
fn quoted_fields_keep_embedded_commas() {
    let csv = "Name,Notes\n\"Hopper, Grace\",\"likes \"\"COBOL\"\"\"\n";
    let table = parse_table("clients.csv", csv.as_bytes()).expect("parses");
    assert_eq!(table.rows[0], vec!["Hopper, Grace", "likes \"COBOL\""]);
}

#[test]
fn byte_order_mark_is_stripped_from_first_header() {
    let csv = "\u{feff}Name,Email\nAda,ada@example.com\n";
    let table = parse_table("clients.csv", csv.as_bytes()).expect("parses");
    assert_eq!(table.column_index("Name"), Some(0));
}

#[test]
fn blank_rows_are_dropped_and_short_rows_padded() {
    let csv = "Name,Email,Phone\nAda\n,,\nGrace,g@example.com,555\n";
    let table = parse_table("clients.csv", csv.as_bytes()).expect("parses");
    assert_eq!(table.len(), 2);
    assert_eq!(table.rows[0], vec!["Ada", "", ""]);
}

#[test]
fn unknown_extension_is_read_as_delimited_text() {
    let table = parse_table("export.txt", b"Name\nAda\n").expect("parses");
    assert_eq!(table.columns, vec!["Name"]);
    assert_eq!(table.len(), 1);
}

#[test]
fn empty_file_has_no_header() {
    let err = parse_table("empty.csv", b"").expect_err("no header");
    assert!(matches!(err, AppError::Import(_)));
}

#[test]
fn garbage_spreadsheet_is_an_import_error() {
    let err = parse_table("clients.xlsx", b"definitely not a zip").expect_err("bad workbook");
    assert!(matches!(err, AppError::Import(_)));
}

// ─── Preview ──────────────────────────────────────────────────────────

#[test]
fn preview_is_keyed_by_header_and_limited() {
    let csv = "Name,Email\nA,a@x.io\nB,b@x.io\nC,c@x.io\n";
    let table = parse_table("clients.csv", csv.as_bytes()).expect("parses");
    let view = preview(&table, 2);

    assert_eq!(view.total_rows, 3);
    assert_eq!(view.sample.len(), 2);
    assert_eq!(view.sample[1].get("Email").map(String::as_str), Some("b@x.io"));
}

// ─── Template ─────────────────────────────────────────────────────────

#[test]
fn template_round_trips_through_its_own_mapping() {
    let csv = template_csv().expect("template renders");
    let table = parse_table("template.csv", csv.as_bytes()).expect("parses");

    assert_eq!(table.columns.len(), TEMPLATE_COLUMNS.len());
    assert_eq!(table.len(), 1);
    for entry in default_mapping() {
        assert!(table.column_index(&entry.source_column).is_some());
    }
}
