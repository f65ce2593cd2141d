//! Date parsing and formatting.
//!
//! The backend sends plain dates (`2024-03-05`), RFC 3339 timestamps and
//! naive timestamps interchangeably. Screens show `DD/MM/YYYY` and writes go
//! back as `YYYY-MM-DD`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

const API_FORMAT: &str = "%Y-%m-%d";
const DISPLAY_FORMAT: &str = "%d/%m/%Y";

/// Parse a backend date or timestamp down to its calendar date.
///
/// Timestamps keep the date in their own offset.
#[must_use]
pub fn parse_api_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, API_FORMAT) {
        return Some(date);
    }
    parse_api_datetime(text).map(|dt| dt.date())
}

/// Parse a backend timestamp. A bare date is taken as midnight.
#[must_use]
pub fn parse_api_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, API_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Format a date for display as `DD/MM/YYYY`; missing dates render empty.
#[must_use]
pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DISPLAY_FORMAT).to_string())
        .unwrap_or_default()
}

/// Parse user input: `DD/MM/YYYY` first, then any backend format.
#[must_use]
pub fn parse_display_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DISPLAY_FORMAT)
        .ok()
        .or_else(|| parse_api_date(text))
}

/// Format a date as the backend expects it on writes.
#[must_use]
pub fn to_api_date(date: NaiveDate) -> String {
    date.format(API_FORMAT).to_string()
}
