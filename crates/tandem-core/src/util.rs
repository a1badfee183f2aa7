//! Shared utility functions used across multiple modules.

use chrono::NaiveDate;

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Current Unix timestamp in milliseconds.
pub fn timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Today's calendar date in the client's local timezone.
///
/// The day boundary is local midnight; callers must not assume UTC.
pub fn today_local() -> NaiveDate {
    chrono::Local::now().date_naive()
}
