//! Contract tests for the downloadable import template.

use crm_ingest::import::template::template_csv;

#[test]
fn header_line_is_stable() {
    let csv = template_csv().expect("renders");
    let header = csv.lines().next().expect("header line");
    assert_eq!(
        header,
        "Client ID,Name,First Name,Last Name,Email,Secondary Email,Phone,Secondary Phone,Status,Stage,Tags"
    );
}

#[test]
fn sample_row_is_a_valid_client() {
    let csv = template_csv().expect("renders");
    let sample = csv.lines().nth(1).expect("sample line");
    assert!(sample.starts_with("CL-0001,Jane Example,"));
    assert!(sample.contains("jane@example.com"));
    assert_eq!(csv.lines().count(), 2);
}
