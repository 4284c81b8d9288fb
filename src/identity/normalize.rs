//! Canonical forms for phone numbers and email addresses.
//!
//! Canonical forms exist only for equality comparison. Display values are
//! stored as supplied.

/// Digits kept for phone comparison. Caller-ID numbers and stored numbers
/// may disagree on country-code presence, so only the national part counts.
pub const PHONE_COMPARE_DIGITS: usize = 10;

/// Canonical phone form: the trailing ten digits.
///
/// Non-digits are stripped first. Inputs with fewer than ten digits
/// normalize to their digit string; inputs with no digits normalize to `""`.
#[must_use]
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() > PHONE_COMPARE_DIGITS {
        digits[digits.len() - PHONE_COMPARE_DIGITS..].to_owned()
    } else {
        digits
    }
}

/// Canonical email form: trimmed and lower-cased.
#[must_use]
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Display formatting used by the `phone_format` import transform.
///
/// `5551234567` becomes `(555) 123-4567` and `15551234567` becomes
/// `+1 (555) 123-4567`. Anything else is returned trimmed.
#[must_use]
pub fn format_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        10 => format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..]),
        11 if digits.starts_with('1') => format!(
            "+1 ({}) {}-{}",
            &digits[1..4],
            &digits[4..7],
            &digits[7..]
        ),
        _ => raw.trim().to_owned(),
    }
}
