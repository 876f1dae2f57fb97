//! Formatting helpers for the usage summary panel.

use chrono::{DateTime, TimeZone};
use std::fmt::Display;

/// Placeholder shown for values that are not known yet.
pub const UNSET: &str = "-";

/// Formats a date as `DD Month YYYY`, e.g. `19 October 2026`.
pub fn format_date<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.format("%d %B %Y").to_string()
}

/// Formats a time of day as `HH:mm`.
pub fn format_time<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.format("%H:%M").to_string()
}

/// Formats an optional coordinate, falling back to the unset placeholder.
pub fn format_coordinate(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => UNSET.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_format_date() {
        let at = Utc.with_ymd_and_hms(2026, 10, 9, 7, 5, 0).unwrap();
        assert_eq!(format_date(&at), "09 October 2026");
    }

    #[test]
    fn test_format_time_is_24_hour() {
        let at = Utc.with_ymd_and_hms(2026, 10, 9, 19, 5, 42).unwrap();
        assert_eq!(format_time(&at), "19:05");
    }

    #[test]
    fn test_format_coordinate() {
        assert_eq!(format_coordinate(None), "-");
        assert_eq!(format_coordinate(Some(13.7563)), "13.7563");
        assert_eq!(format_coordinate(Some(-0.5)), "-0.5");
    }
}
