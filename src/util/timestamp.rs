//! Partial date-time literal parsing.
//!
//! Grammar: `yyyy-MM-dd['T'HH[:mm[:ss[.SSS]]]][±HH:MM]` with leftward
//! zero-completion — a missing month or day defaults to `01`, missing time
//! fields to zero. Without an explicit offset the literal is read as UTC,
//! so plans stay identical across machines.

use chrono::{FixedOffset, LocalResult, NaiveDateTime, TimeZone};

use crate::error::{RapidsError, Result};

const TIME_PATTERN: &str = "HH:mm:ss.SSS";
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Parse a partial date-time literal into epoch milliseconds.
pub fn parse_timestamp(text: &str) -> Result<i64> {
    let (date, time, offset) = match text.split_once('T') {
        Some((date, rest)) => {
            let offset = offset_suffix(rest);
            let time = &rest[..rest.len() - offset.len()];
            (date.to_string(), complete_time(time), offset.to_string())
        }
        None => (complete_date(text), complete_time(""), String::new()),
    };

    let naive = NaiveDateTime::parse_from_str(&format!("{}T{}", date, time), DATE_TIME_FORMAT)
        .map_err(|e| invalid(text, &e.to_string()))?;

    if offset.is_empty() {
        return Ok(naive.and_utc().timestamp_millis());
    }

    let offset: FixedOffset = offset
        .parse()
        .map_err(|_| invalid(text, &format!("bad offset '{}'", offset)))?;

    match offset.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.timestamp_millis()),
        _ => Err(invalid(text, "ambiguous local time")),
    }
}

fn invalid(text: &str, reason: &str) -> RapidsError {
    RapidsError::invalid_timestamp(format!("failed to parse '{}': {}", text, reason))
}

/// The trailing `±HH:MM` offset of a time string, if present.
fn offset_suffix(time: &str) -> &str {
    match time.find(['+', '-']) {
        Some(at) => &time[at..],
        None => "",
    }
}

/// Zero-fill a date to `yyyy-MM-dd`.
fn complete_date(date: &str) -> String {
    match date.split('-').count() {
        1 => format!("{}-01-01", date),
        2 => format!("{}-01", date),
        // Either complete, or malformed and left for the parser to reject.
        _ => date.to_string(),
    }
}

/// Zero-fill a time to `HH:mm:ss.SSS`.
fn complete_time(time: &str) -> String {
    if time.len() >= TIME_PATTERN.len() {
        return time.to_string();
    }

    let completion: String = TIME_PATTERN[time.len()..]
        .chars()
        .map(|c| if c.is_ascii_alphabetic() { '0' } else { c })
        .collect();

    format!("{}{}", time, completion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_timestamp() {
        // 2020-01-02T03:04:05.678 UTC
        assert_eq!(
            parse_timestamp("2020-01-02T03:04:05.678").unwrap(),
            1_577_934_245_678
        );
    }

    #[test]
    fn test_seconds_completion() {
        assert_eq!(
            parse_timestamp("2020-01-02T03:04:05").unwrap(),
            1_577_934_245_000
        );
    }

    #[test]
    fn test_time_completion() {
        assert_eq!(
            parse_timestamp("2020-01-02T03:04").unwrap(),
            parse_timestamp("2020-01-02T03:04:00.000").unwrap()
        );
        assert_eq!(
            parse_timestamp("2020-01-02T03").unwrap(),
            parse_timestamp("2020-01-02T03:00:00.000").unwrap()
        );
    }

    #[test]
    fn test_date_completion() {
        assert_eq!(
            parse_timestamp("2020").unwrap(),
            parse_timestamp("2020-01-01T00:00:00.000").unwrap()
        );
        assert_eq!(
            parse_timestamp("2020-03").unwrap(),
            parse_timestamp("2020-03-01T00:00:00.000").unwrap()
        );
        assert_eq!(
            parse_timestamp("2020-03-15").unwrap(),
            parse_timestamp("2020-03-15T00:00:00.000").unwrap()
        );
    }

    #[test]
    fn test_explicit_offset() {
        let utc = parse_timestamp("2020-01-02T03:04:05").unwrap();
        let plus_two = parse_timestamp("2020-01-02T03:04:05+02:00").unwrap();
        assert_eq!(plus_two, utc - 2 * 60 * 60 * 1000);

        let minus_five = parse_timestamp("2020-01-02T03:04:05-05:00").unwrap();
        assert_eq!(minus_five, utc + 5 * 60 * 60 * 1000);
    }

    #[test]
    fn test_invalid_rejected() {
        assert!(matches!(
            parse_timestamp("not-a-date"),
            Err(RapidsError::InvalidTimestampLiteral { .. })
        ));
        assert!(parse_timestamp("2020-13-01").is_err());
        assert!(parse_timestamp("2020-01-02T25:00").is_err());
    }
}
