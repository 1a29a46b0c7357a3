//! Timestamp utilities

use chrono::{DateTime, Local, TimeZone, Utc};

/// Display format for scan timestamps (`1/5/2026, 9:03:07 PM`)
pub const DISPLAY_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for operators, in the zone it carries
pub fn display_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(DISPLAY_FORMAT).to_string()
}

/// Current local time, formatted for a log entry
pub fn now_display() -> String {
    display_timestamp(&Local::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
    }

    #[test]
    fn test_display_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2026, 1, 5, 21, 3, 7).unwrap();
        assert_eq!(display_timestamp(&at), "1/5/2026, 9:03:07 PM");

        let morning = Utc.with_ymd_and_hms(2026, 11, 30, 0, 15, 0).unwrap();
        assert_eq!(display_timestamp(&morning), "11/30/2026, 12:15:00 AM");
    }

    #[test]
    fn test_now_display_not_empty() {
        assert!(now_display().contains(", "));
    }
}
