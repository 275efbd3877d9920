//! Contact channel normalization
//!
//! Website forms deliver email and phone in whatever shape the visitor
//! typed. Matching runs on normalized values only; the raw values are
//! stored alongside for display.

/// Normalize an email address for matching: trim and lowercase.
///
/// Returns `None` when nothing usable remains.
pub fn normalize_email(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_lowercase())
}

/// Normalize a phone number for matching: keep digits only.
///
/// Formatting, spacing, and a leading `+` are all stripped; two numbers
/// match iff their digit sequences match. Returns `None` when the input
/// contains no digits.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    Some(digits)
}
