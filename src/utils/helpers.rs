//! Helper functions and utilities
//!
//! This module contains common helper functions used throughout the application.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Offset, TimeZone, Utc};
use uuid::Uuid;

/// Generate a new UUID v4
pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Format an event date in the business time zone, e.g. "21 Oct 2026"
pub fn format_event_date(date: DateTime<Utc>, offset: FixedOffset) -> String {
    date.with_timezone(&offset).format("%d %b %Y").to_string()
}

/// Truncate text to at most `max_chars` characters, marking the cut with an ellipsis
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let mut truncated: String = text.chars().take(max_chars - 3).collect();
    truncated.push_str("...");
    truncated
}

/// A meeting identity must at least look like an email address
pub fn has_contact_address(email: &str) -> bool {
    email.contains('@')
}

/// Normalize a phone number for messaging.
///
/// Separators are removed; a bare 10-digit national number gets the
/// default country code. Returns `None` when nothing dialable remains.
pub fn normalize_phone(phone: &str, default_country_code: &str) -> Option<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 8 {
        return None;
    }
    if digits.len() == 10 && !default_country_code.is_empty() {
        return Some(format!("{}{}", default_country_code, digits));
    }
    Some(digits)
}

/// Bounds of a local calendar day as UTC instants: midnight to 23:59:59.999.
///
/// `days_ahead` selects the day relative to the local date of `now`.
pub fn local_day_bounds(now: DateTime<Utc>, offset: FixedOffset, days_ahead: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let local_date = now.with_timezone(&offset).date_naive() + Duration::days(days_ahead);
    let midnight = local_date.and_time(NaiveTime::MIN);
    let start = offset
        .from_local_datetime(&midnight)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight));
    let end = start + Duration::days(1) - Duration::milliseconds(1);
    (start, end)
}

/// Build a fixed offset from minutes east of UTC, falling back to UTC when out of range
pub fn offset_from_minutes(minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(minutes * 60).unwrap_or_else(|| Utc.fix())
}
