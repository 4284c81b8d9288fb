//! Unit tests for client-code validation and generation.

use crm_ingest::models::client::{
    code_number, format_client_code, next_client_code, validate_client_code,
};
use crm_ingest::AppError;

#[test]
fn valid_codes_have_at_least_four_digits() {
    assert!(validate_client_code("CL-0001").is_ok());
    assert!(validate_client_code("CL-12345").is_ok());
}

#[test]
fn malformed_codes_are_validation_errors() {
    for code in ["CL-001", "cl-0001", "CL0001", "CL-00a1", "", "XX-0001"] {
        let err = validate_client_code(code).expect_err(code);
        assert!(matches!(err, AppError::Validation(_)), "code {code:?}");
    }
}

#[test]
fn first_code_is_one() {
    assert_eq!(next_client_code(std::iter::empty()).expect("next code"), "CL-0001");
}

#[test]
fn next_code_is_max_plus_one_without_reusing_gaps() {
    let existing = ["CL-0001", "CL-0003"];
    assert_eq!(next_client_code(existing).expect("next code"), "CL-0004");
}

#[test]
fn foreign_codes_are_ignored_when_generating() {
    let existing = ["CL-0002", "LEGACY-99", "CL-00X9"];
    assert_eq!(next_client_code(existing).expect("next code"), "CL-0003");
}

#[test]
fn codes_grow_past_four_digits() {
    assert_eq!(next_client_code(["CL-9999"]).expect("next code"), "CL-10000");
    assert_eq!(format_client_code(42), "CL-0042");
    assert_eq!(code_number("CL-10000"), Some(10_000));
}

#[test]
fn exhausted_code_space_is_a_validation_error() {
    let err = next_client_code(["CL-18446744073709551615"]).expect_err("overflow");
    assert!(matches!(err, AppError::Validation(_)));
}
