//! Tolerant parsing of free-text event time ranges
//!
//! Event times are entered by admins as text such as `"10:00 AM - 2:00 PM"`.
//! Parsing never fails the caller: [`TimeRange::parse_or_default`] degrades
//! to 10:00-11:00 when the text cannot be understood.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

const DEFAULT_START_HOUR: u32 = 10;
const DEFAULT_END_HOUR: u32 = 11;
const MINUTES_PER_DAY: i64 = 24 * 60;

/// Start and end of an event in 24-hour local time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_hour: u32,
    pub start_minute: u32,
    pub end_hour: u32,
    pub end_minute: u32,
}

impl Default for TimeRange {
    fn default() -> Self {
        Self {
            start_hour: DEFAULT_START_HOUR,
            start_minute: 0,
            end_hour: DEFAULT_END_HOUR,
            end_minute: 0,
        }
    }
}

static RANGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(\d{1,2})(?:[:.](\d{2}))?\s*([AP]\.?M\.?)?\s*(?:-|–|—|to)\s*(\d{1,2})(?:[:.](\d{2}))?\s*([AP]\.?M\.?)?\s*$",
    )
    .expect("time range pattern is valid")
});

impl TimeRange {
    /// Parse `"<start> [AM|PM] - <end> [AM|PM]"`, returning `None` on any miss
    pub fn parse(text: &str) -> Option<Self> {
        let caps = RANGE_PATTERN.captures(text)?;

        let start_hour = to_24_hour(caps.get(1)?.as_str(), caps.get(3).map(|m| m.as_str()))?;
        let start_minute = parse_minute(caps.get(2).map(|m| m.as_str()))?;
        let end_hour = to_24_hour(caps.get(4)?.as_str(), caps.get(6).map(|m| m.as_str()))?;
        let end_minute = parse_minute(caps.get(5).map(|m| m.as_str()))?;

        let range = Self { start_hour, start_minute, end_hour, end_minute };
        if range.start_minutes() == range.end_minutes() {
            return None;
        }
        Some(range)
    }

    /// Parse, falling back to 10:00-11:00
    pub fn parse_or_default(text: &str) -> Self {
        match Self::parse(text) {
            Some(range) => range,
            None => {
                tracing::debug!(event_time = %text, "Unparseable event time, using default range");
                Self::default()
            }
        }
    }

    fn start_minutes(&self) -> i64 {
        i64::from(self.start_hour) * 60 + i64::from(self.start_minute)
    }

    fn end_minutes(&self) -> i64 {
        i64::from(self.end_hour) * 60 + i64::from(self.end_minute)
    }

    /// Length of the event in minutes; a range ending before it starts runs past midnight
    pub fn duration_minutes(&self) -> i64 {
        let diff = self.end_minutes() - self.start_minutes();
        if diff > 0 {
            diff
        } else {
            diff + MINUTES_PER_DAY
        }
    }

    /// Start instant on the local calendar day of `event_date`
    pub fn start_on(&self, event_date: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
        let local_date = event_date.with_timezone(&offset).date_naive();
        let time = NaiveTime::from_hms_opt(self.start_hour, self.start_minute, 0).unwrap_or(NaiveTime::MIN);
        let local = local_date.and_time(time);
        offset
            .from_local_datetime(&local)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(event_date)
    }
}

fn to_24_hour(hour: &str, meridiem: Option<&str>) -> Option<u32> {
    let hour: u32 = hour.parse().ok()?;
    match meridiem.map(|m| m.to_ascii_uppercase().starts_with('P')) {
        Some(is_pm) => {
            if hour == 0 || hour > 12 {
                return None;
            }
            Some(match (is_pm, hour) {
                (true, 12) => 12,
                (true, h) => h + 12,
                (false, 12) => 0,
                (false, h) => h,
            })
        }
        None if hour < 24 => Some(hour),
        None => None,
    }
}

fn parse_minute(minute: Option<&str>) -> Option<u32> {
    match minute {
        None => Some(0),
        Some(m) => m.parse::<u32>().ok().filter(|m| *m < 60),
    }
}
