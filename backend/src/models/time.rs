use chrono::{DateTime, Datelike, Duration, FixedOffset, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Pattern bucket key in mill local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatternKey {
    pub hour_of_day: u8,
    /// Monday = 0
    pub weekday: u8,
}

impl PatternKey {
    pub fn new(hour_of_day: u8, weekday: u8) -> Self {
        Self {
            hour_of_day,
            weekday,
        }
    }

    /// Bucket containing `instant` under the mill's fixed UTC offset.
    pub fn at(instant: DateTime<Utc>, offset: FixedOffset) -> Self {
        let local = instant.with_timezone(&offset);
        Self {
            hour_of_day: local.hour() as u8,
            weekday: local.weekday().num_days_from_monday() as u8,
        }
    }
}

/// Fixed offset of the mill's local clock.
pub fn mill_offset(offset_minutes: i32) -> Result<FixedOffset, String> {
    FixedOffset::east_opt(offset_minutes * 60)
        .ok_or_else(|| format!("UTC offset of {} minutes is out of range", offset_minutes))
}

/// Instant `horizon` hours after `now`.
pub fn horizon_instant(now: DateTime<Utc>, horizon: u32) -> DateTime<Utc> {
    now + Duration::hours(horizon as i64)
}

/// Elapsed time between two instants in fractional hours.
pub fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 3_600_000.0
}

#[cfg(test)]
#[path = "time_tests.rs"]
mod time_tests;
