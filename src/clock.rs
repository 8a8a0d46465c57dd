//! Date and time-of-day helpers
//!
//! Every instant the planner handles is a `DateTime<FixedOffset>` taken from the
//! caller's "now". Wall-clock inputs (target time, sample times) are composed
//! onto now's calendar date in now's offset, never built by string concatenation.

use crate::error::PlanError;
use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Timelike};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Accepted wall-clock formats.
const TIME_OF_DAY_FORMATS: [&str; 4] = ["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M:%S %p"];

/// Combine `now`'s calendar date with a time of day, in `now`'s offset.
pub fn at_time_of_day(
    now: &DateTime<FixedOffset>,
    time: NaiveTime,
) -> Result<DateTime<FixedOffset>, PlanError> {
    let local = now.date_naive().and_time(time);
    now.offset()
        .from_local_datetime(&local)
        .single()
        .ok_or_else(|| PlanError::TimeParseError(format!("no single instant for {local}")))
}

/// Drop seconds and sub-second precision.
pub fn truncate_to_minute(instant: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    instant
        - Duration::seconds(i64::from(instant.second()))
        - Duration::nanoseconds(i64::from(instant.nanosecond()))
}

/// First point strictly after `now` on the `interval_minutes` grid anchored at
/// the top of the hour.
///
/// The grid position is `minute % interval`, so a 30 minute grid hits :00 and
/// :30 and a 120 minute grid hits the next top of the hour. When `now` already
/// sits on the grid the following point is one full interval later.
pub fn next_grid_point(now: DateTime<FixedOffset>, interval_minutes: u32) -> DateTime<FixedOffset> {
    let base = truncate_to_minute(now);
    let interval = i64::from(interval_minutes.max(1));
    let remainder = i64::from(base.minute()) % interval;
    let step = if remainder == 0 {
        interval
    } else {
        interval - remainder
    };
    base + Duration::minutes(step)
}

/// Signed hours from `from` to `to` at millisecond resolution.
pub fn hours_between(from: DateTime<FixedOffset>, to: DateTime<FixedOffset>) -> f64 {
    (to - from).num_milliseconds() as f64 / MILLIS_PER_HOUR
}

pub fn roll_forward_day(instant: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    instant + Duration::days(1)
}

/// Parse a wall-clock time such as `18:00`, `18:00:30` or `06:00 PM`.
///
/// The result is truncated to the minute.
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, PlanError> {
    let trimmed = raw.trim();
    TIME_OF_DAY_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
        .and_then(|time| NaiveTime::from_hms_opt(time.hour(), time.minute(), 0))
        .ok_or_else(|| PlanError::TimeParseError(format!("unrecognized time of day '{raw}'")))
}

/// Serde adapter storing a `NaiveTime` as `HH:MM`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time_of_day(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(raw: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(raw).unwrap()
    }

    #[test]
    fn test_at_time_of_day_keeps_date_and_offset() {
        let now = at("2024-03-10T09:41:27+02:00");
        let target = at_time_of_day(&now, NaiveTime::from_hms_opt(18, 0, 0).unwrap()).unwrap();
        assert_eq!(target, at("2024-03-10T18:00:00+02:00"));
    }

    #[test]
    fn test_truncate_to_minute() {
        let instant = at("2024-03-10T09:41:27.250+00:00");
        assert_eq!(truncate_to_minute(instant), at("2024-03-10T09:41:00+00:00"));
    }

    #[test]
    fn test_next_grid_point_rounds_up() {
        let now = at("2024-03-10T09:41:27+00:00");
        assert_eq!(next_grid_point(now, 15), at("2024-03-10T09:45:00+00:00"));
        assert_eq!(next_grid_point(now, 30), at("2024-03-10T10:00:00+00:00"));
        assert_eq!(next_grid_point(now, 60), at("2024-03-10T10:00:00+00:00"));
        assert_eq!(next_grid_point(now, 120), at("2024-03-10T10:00:00+00:00"));
    }

    #[test]
    fn test_next_grid_point_on_grid_moves_one_interval() {
        let now = at("2024-03-10T09:30:00+00:00");
        assert_eq!(next_grid_point(now, 30), at("2024-03-10T10:00:00+00:00"));

        // Seconds past the grid minute still count as on the grid
        let now = at("2024-03-10T09:30:45+00:00");
        assert_eq!(next_grid_point(now, 30), at("2024-03-10T10:00:00+00:00"));
    }

    #[test]
    fn test_hours_between_is_signed() {
        let a = at("2024-03-10T09:00:00+00:00");
        let b = at("2024-03-10T10:30:00+00:00");
        assert!((hours_between(a, b) - 1.5).abs() < 1e-9);
        assert!((hours_between(b, a) + 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_time_of_day_formats() {
        let six_pm = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
        assert_eq!(parse_time_of_day("18:00").unwrap(), six_pm);
        assert_eq!(parse_time_of_day(" 18:00:59 ").unwrap(), six_pm);
        assert_eq!(parse_time_of_day("06:00 PM").unwrap(), six_pm);
        assert!(parse_time_of_day("six o'clock").is_err());
    }
}
