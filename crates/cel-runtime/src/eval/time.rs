//! Time parsing and formatting for the timestamp and duration builtins.
//!
//! These primitives are deliberately shallow: construction from strings
//! or seconds, RFC 3339 formatting, and UTC calendar accessors. There is
//! no timestamp/duration arithmetic.

use chrono::{DateTime, Datelike, Timelike, Utc};

use super::value::{Duration, Timestamp};

/// Parse an RFC 3339 timestamp string.
///
/// Supports formats like:
/// - "2009-02-13T23:31:30Z"
/// - "2009-02-13T23:31:30.123456789Z"
/// - "2009-02-13T23:31:30+01:00"
pub fn parse_timestamp(s: &str) -> Result<Timestamp, String> {
    let dt = DateTime::parse_from_rfc3339(s)
        .map_err(|e| format!("invalid timestamp format: {}", e))?;

    let ts = Timestamp {
        seconds: dt.timestamp(),
        nanos: dt.timestamp_subsec_nanos() as i32,
    };

    if !ts.is_valid() {
        return Err("timestamp out of range: must be between year 0001 and 9999".to_string());
    }

    Ok(ts)
}

/// Parse a duration string with unit suffixes.
///
/// Supports formats like:
/// - "100s" - 100 seconds
/// - "1.5h" - 1.5 hours
/// - "1h30m45s" - compound units
/// - "100ms", "100us", "100ns"
/// - "-30s" - negative durations
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let (negative, s) = if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else {
        (false, s)
    };

    if s.is_empty() {
        return Err("invalid duration: no value".to_string());
    }

    let mut total_nanos: i128 = 0;
    let mut remaining = s;

    while !remaining.is_empty() {
        // Parse the numeric part (including optional decimal point)
        let num_end = remaining
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(remaining.len());

        if num_end == 0 {
            return Err(format!(
                "invalid duration format: expected number at '{}'",
                remaining
            ));
        }

        let num_str = &remaining[..num_end];
        remaining = &remaining[num_end..];

        // Parse the unit
        let unit_end = remaining
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(remaining.len());

        if unit_end == 0 {
            return Err(format!("invalid duration: missing unit after '{}'", num_str));
        }

        let unit = &remaining[..unit_end];
        remaining = &remaining[unit_end..];

        let multiplier: i128 = match unit {
            "h" => 3_600_000_000_000,
            "m" => 60_000_000_000,
            "s" => 1_000_000_000,
            "ms" => 1_000_000,
            "us" | "\u{00b5}s" => 1_000, // microseconds (supports μs)
            "ns" => 1,
            _ => return Err(format!("invalid duration unit: '{}'", unit)),
        };

        // The number may be fractional
        if num_str.contains('.') {
            let num: f64 = num_str
                .parse()
                .map_err(|_| format!("invalid number in duration: '{}'", num_str))?;
            total_nanos += (num * multiplier as f64) as i128;
        } else {
            let num: i128 = num_str
                .parse()
                .map_err(|_| format!("invalid number in duration: '{}'", num_str))?;
            total_nanos += num * multiplier;
        }
    }

    if negative {
        total_nanos = -total_nanos;
    }

    let seconds = (total_nanos / 1_000_000_000) as i64;
    let nanos = (total_nanos % 1_000_000_000) as i32;

    let duration = Duration::new(seconds, nanos);

    if !duration.is_valid() {
        return Err("duration out of range: must be within approximately 10000 years".to_string());
    }

    Ok(duration)
}

/// Format a timestamp as an RFC 3339 string with nanosecond precision.
///
/// Examples:
/// - "2009-02-13T23:31:30Z" (no fractional seconds)
/// - "2009-02-13T23:31:30.123456789Z" (with nanoseconds)
pub fn format_timestamp(ts: &Timestamp) -> String {
    if let Some(dt) = ts.to_datetime_utc() {
        if ts.nanos == 0 {
            dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
        } else {
            // Format with nanoseconds, trimming trailing zeros
            let nanos_str = format!("{:09}", ts.nanos);
            let trimmed = nanos_str.trim_end_matches('0');
            if trimmed.is_empty() {
                dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
            } else {
                format!("{}.{}Z", dt.format("%Y-%m-%dT%H:%M:%S"), trimmed)
            }
        }
    } else {
        // Fallback for out-of-range timestamps
        format!("{}s", ts.seconds)
    }
}

/// Format a duration as a string: "Xs" or "X.XXXXXXXXXs".
pub fn format_duration(d: &Duration) -> String {
    if d.nanos == 0 {
        format!("{}s", d.seconds)
    } else {
        let total_nanos = d.seconds as i128 * 1_000_000_000 + d.nanos as i128;
        let sign = if total_nanos < 0 { "-" } else { "" };
        let abs_nanos = total_nanos.abs();
        let secs = abs_nanos / 1_000_000_000;
        let frac = abs_nanos % 1_000_000_000;

        if frac == 0 {
            format!("{}{}s", sign, secs)
        } else {
            let frac_str = format!("{:09}", frac);
            let trimmed = frac_str.trim_end_matches('0');
            format!("{}{}.{}s", sign, secs, trimmed)
        }
    }
}

/// Calendar component extracted by the timestamp accessor methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampComponent {
    /// Full 4-digit year.
    FullYear,
    /// Month (0-11, 0 = January).
    Month,
    /// Day of month (1-31).
    Date,
    /// Hours (0-23).
    Hours,
    /// Minutes (0-59).
    Minutes,
    /// Seconds (0-59).
    Seconds,
}

impl TimestampComponent {
    /// Get the component value from a UTC DateTime.
    pub fn extract(&self, dt: &DateTime<Utc>) -> i64 {
        match self {
            TimestampComponent::FullYear => dt.year() as i64,
            TimestampComponent::Month => dt.month0() as i64, // 0-11
            TimestampComponent::Date => dt.day() as i64,     // 1-31
            TimestampComponent::Hours => dt.hour() as i64,
            TimestampComponent::Minutes => dt.minute() as i64,
            TimestampComponent::Seconds => dt.second() as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_timestamp_basic() {
        let ts = parse_timestamp("2009-02-13T23:31:30Z").unwrap();
        assert_eq!(ts.seconds, 1234567890);
        assert_eq!(ts.nanos, 0);
    }

    #[test]
    fn parse_timestamp_with_nanos() {
        let ts = parse_timestamp("2009-02-13T23:31:30.123456789Z").unwrap();
        assert_eq!(ts.seconds, 1234567890);
        assert_eq!(ts.nanos, 123456789);
    }

    #[test]
    fn parse_timestamp_with_offset() {
        let ts = parse_timestamp("2009-02-13T18:31:30-05:00").unwrap();
        assert_eq!(ts.seconds, 1234567890);
    }

    #[test]
    fn parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("not a timestamp").is_err());
        assert!(parse_timestamp("2009-02-13").is_err());
    }

    #[test]
    fn parse_duration_seconds() {
        let d = parse_duration("100s").unwrap();
        assert_eq!(d.seconds, 100);
        assert_eq!(d.nanos, 0);
    }

    #[test]
    fn parse_duration_compound() {
        let d = parse_duration("1h30m").unwrap();
        assert_eq!(d.seconds, 5400);
    }

    #[test]
    fn parse_duration_negative() {
        let d = parse_duration("-30s").unwrap();
        assert_eq!(d.seconds, -30);
    }

    #[test]
    fn parse_duration_fractional() {
        let d = parse_duration("1.5h").unwrap();
        assert_eq!(d.seconds, 5400);
        let d = parse_duration("500ms").unwrap();
        assert_eq!(d.nanos, 500_000_000);
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("5").is_err());
        assert!(parse_duration("5x").is_err());
    }

    #[test]
    fn format_timestamp_rfc3339() {
        let ts = Timestamp::new(1234567890, 0);
        assert_eq!(format_timestamp(&ts), "2009-02-13T23:31:30Z");

        let ts = Timestamp::new(1234567890, 123000000);
        assert_eq!(format_timestamp(&ts), "2009-02-13T23:31:30.123Z");
    }

    #[test]
    fn format_duration_seconds() {
        assert_eq!(format_duration(&Duration::new(100, 0)), "100s");
        assert_eq!(format_duration(&Duration::new(1, 500000000)), "1.5s");
    }

    #[test]
    fn component_extraction() {
        let ts = Timestamp::new(1234567890, 0);
        let dt = ts.to_datetime_utc().unwrap();

        assert_eq!(TimestampComponent::FullYear.extract(&dt), 2009);
        assert_eq!(TimestampComponent::Month.extract(&dt), 1); // February, 0-indexed
        assert_eq!(TimestampComponent::Date.extract(&dt), 13);
        assert_eq!(TimestampComponent::Hours.extract(&dt), 23);
        assert_eq!(TimestampComponent::Minutes.extract(&dt), 31);
        assert_eq!(TimestampComponent::Seconds.extract(&dt), 30);
    }
}
