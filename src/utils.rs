//! Text normalization helpers shared by sources and the cleaner.

use crate::constants::cleaner::NULL_SENTINEL;

/// Convert arbitrary header text to a snake-like key.
///
/// Trims, lowercases, and replaces every non-alphanumeric character with `_`,
/// so `Transaction ID` and `transaction-id` both become `transaction_id`.
pub fn canonical_header_name(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .chars()
        .map(|ch| if ch.is_alphanumeric() { ch } else { '_' })
        .collect()
}

/// Whether a cell holds a value under the same rules as [`clean_text`], without allocating.
pub fn has_text(value: Option<&str>) -> bool {
    value
        .map(str::trim)
        .is_some_and(|text| !text.is_empty() && !text.eq_ignore_ascii_case(NULL_SENTINEL))
}

/// Trim a cell and map empty or `none` values to `None`.
pub fn clean_text(value: Option<&str>) -> Option<String> {
    has_text(value).then(|| value.unwrap_or_default().trim().to_string())
}

/// Pass a cell through unchanged, only mapping empty text to `None`.
///
/// Used on the streaming hot path where non-amount fields are not validated.
pub fn passthrough_text(value: Option<&str>) -> Option<String> {
    value
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

/// Round a value to two decimals for human-facing summaries.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
