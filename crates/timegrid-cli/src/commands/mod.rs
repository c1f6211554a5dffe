pub mod auth;
pub mod calendar;
pub mod client;
pub mod config;
pub mod entry;
pub mod feed;
pub mod project;
pub mod report;
pub mod sync;
pub mod tag;
pub mod timer;
pub mod view;

use chrono::{DateTime, NaiveDateTime, Utc};

/// Parse a command-line instant: RFC 3339 or `"YYYY-MM-DD HH:MM"` (UTC).
pub(crate) fn parse_instant(raw: &str) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .map_err(|_| format!("cannot parse {raw:?} as a time, expected \"YYYY-MM-DD HH:MM\""))?;
    Ok(naive.and_utc())
}

/// Render minutes since midnight as `HH:MM`.
pub(crate) fn fmt_minute(minute: u32) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_space_and_t_separated_instants() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 3, 9, 30, 0).unwrap();
        assert_eq!(parse_instant("2024-01-03 09:30").unwrap(), expected);
        assert_eq!(parse_instant("2024-01-03T09:30").unwrap(), expected);
        assert_eq!(parse_instant("2024-01-03T09:30:00Z").unwrap(), expected);
    }

    #[test]
    fn rejects_garbage_instants() {
        assert!(parse_instant("yesterday-ish").is_err());
    }

    #[test]
    fn formats_minutes_of_day() {
        assert_eq!(fmt_minute(0), "00:00");
        assert_eq!(fmt_minute(540), "09:00");
        assert_eq!(fmt_minute(1439), "23:59");
    }
}
