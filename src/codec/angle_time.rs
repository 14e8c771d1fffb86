//! Angle and time codecs
//!
//! Scene corners are stored as degrees-minutes-seconds strings and dates as
//! a day count since 1950-01-01 plus seconds of day. Timestamps are emitted
//! as `YYYY-MM-DDTHH:MM:SS.ffffff`.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::errors::{SpotError, SpotResult};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Converts a `[NSEWRL+-]DDDMMSSsss` field to decimal degrees
///
/// A blank field yields exactly 0.0. Returns `None` when the sign marker or
/// the digits are malformed.
pub fn dms_to_decimal_degrees(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return Some(0.0);
    }
    if !text.is_ascii() || text.len() < 11 {
        return None;
    }

    let sign = match text.as_bytes()[0] {
        b'N' | b'E' | b'R' | b'+' => 1.0,
        b'S' | b'W' | b'L' | b'-' => -1.0,
        _ => return None,
    };
    let degrees: u32 = text[1..4].parse().ok()?;
    let minutes: u32 = text[4..6].parse().ok()?;
    let milliseconds: u32 = text[6..11].parse().ok()?;
    let seconds = f64::from(milliseconds) / 1000.0;

    Some(sign * (f64::from(degrees) + f64::from(minutes) / 60.0 + seconds / 3600.0))
}

/// Formats decimal degrees as `<marker>DDDMMSSsss`
///
/// `positive` and `negative` are the hemisphere markers, e.g. `N`/`S`.
pub fn decimal_degrees_to_dms(value: f64, positive: char, negative: char) -> String {
    let marker = if value < 0.0 { negative } else { positive };
    let total_ms = (value.abs() * 3_600_000.0).round() as u64;
    let degrees = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let milliseconds = total_ms % 60_000;
    format!("{}{:03}{:02}{:05}", marker, degrees, minutes, milliseconds)
}

fn epoch() -> SpotResult<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1950, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| SpotError::GenericError("Invalid Julian epoch".to_string()))
}

/// Converts a day count since 1950-01-01 and seconds of day to a timestamp
pub fn julian_to_calendar(days: i64, seconds_of_day: f64) -> SpotResult<String> {
    let micros = (seconds_of_day * 1_000_000.0).round() as i64;
    let instant = epoch()?
        .checked_add_signed(Duration::days(days))
        .and_then(|t| t.checked_add_signed(Duration::microseconds(micros)))
        .ok_or_else(|| {
            SpotError::GenericError(format!(
                "Julian date out of range: day {} second {}",
                days, seconds_of_day
            ))
        })?;
    Ok(instant.format(TIMESTAMP_FORMAT).to_string())
}

/// Recovers the day count and seconds of day from a timestamp
pub fn calendar_to_julian(timestamp: &str) -> SpotResult<(i64, f64)> {
    let instant = NaiveDateTime::parse_from_str(timestamp.trim(), "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| SpotError::GenericError(format!("Invalid timestamp '{}': {}", timestamp, e)))?;
    let days = (instant.date() - epoch()?.date()).num_days();
    let time = instant.time();
    let seconds = f64::from(time.num_seconds_from_midnight()) + f64::from(time.nanosecond()) / 1e9;
    Ok((days, seconds))
}

/// Adds a signed offset in seconds to a timestamp
pub fn offset_timestamp(base: &str, delta_seconds: f64) -> SpotResult<String> {
    let (days, seconds) = calendar_to_julian(base)?;
    let total = seconds + delta_seconds;
    let day_shift = (total / SECONDS_PER_DAY).floor();
    let seconds = total - day_shift * SECONDS_PER_DAY;
    julian_to_calendar(days + day_shift as i64, seconds)
}

/// Converts degrees to radians
pub fn degrees_to_radians(degrees: f64) -> f64 {
    degrees.to_radians()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_dms_examples() {
        let v = dms_to_decimal_degrees("N0433612000     ").unwrap();
        assert_abs_diff_eq!(v, 43.0 + 36.0 / 60.0 + 12.0 / 3600.0, epsilon = 1e-9);

        let w = dms_to_decimal_degrees("W0011530500").unwrap();
        assert_abs_diff_eq!(w, -(1.0 + 15.0 / 60.0 + 30.5 / 3600.0), epsilon = 1e-9);

        assert_eq!(dms_to_decimal_degrees(""), Some(0.0));
        assert_eq!(dms_to_decimal_degrees("                "), Some(0.0));
        assert_eq!(dms_to_decimal_degrees("X0433612000"), None);
        assert_eq!(dms_to_decimal_degrees("N04336"), None);
    }

    #[test]
    fn test_dms_property_over_grid() {
        for (marker, sign) in [('N', 1.0), ('S', -1.0), ('E', 1.0), ('W', -1.0), ('R', 1.0), ('L', -1.0), ('+', 1.0), ('-', -1.0)] {
            for d in [0u32, 1, 45, 179] {
                for m in [0u32, 30, 59] {
                    for s in [0u32, 12_345, 59_999] {
                        let text = format!("{}{:03}{:02}{:05}", marker, d, m, s);
                        let expected = sign * (d as f64 + m as f64 / 60.0 + s as f64 / 1000.0 / 3600.0);
                        let got = dms_to_decimal_degrees(&text).unwrap();
                        assert_abs_diff_eq!(got, expected, epsilon = 1e-9);
                    }
                }
            }
        }
    }

    #[test]
    fn test_dms_inverse() {
        let text = decimal_degrees_to_dms(-12.5, 'N', 'S');
        assert_eq!(text, "S0123000000");
        assert_abs_diff_eq!(dms_to_decimal_degrees(&text).unwrap(), -12.5, epsilon = 1e-9);
    }

    #[test]
    fn test_julian_epoch_and_leap_years() {
        assert_eq!(julian_to_calendar(0, 0.0).unwrap(), "1950-01-01T00:00:00.000000");
        // 1952 is a leap year: day 789 is 1952-02-29
        assert_eq!(julian_to_calendar(789, 3661.5).unwrap(), "1952-02-29T01:01:01.500000");
        // 2000 is a leap year, 1900 rule does not apply after the epoch
        assert_eq!(julian_to_calendar(18_262, 0.0).unwrap(), "2000-01-01T00:00:00.000000");
    }

    #[test]
    fn test_julian_round_trip() {
        for days in [0i64, 1, 365, 15_000, 20_000] {
            for seconds in [0.0, 0.25, 43_200.123456, 86_399.999999] {
                let stamp = julian_to_calendar(days, seconds).unwrap();
                let (d, s) = calendar_to_julian(&stamp).unwrap();
                assert_eq!(d, days);
                assert_abs_diff_eq!(s, seconds, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_offset_crosses_midnight() {
        let later = offset_timestamp("1992-05-12T23:59:59.000000", 2.5).unwrap();
        assert_eq!(later, "1992-05-13T00:00:01.500000");
        let earlier = offset_timestamp("1992-05-13T00:00:01.000000", -3.0).unwrap();
        assert_eq!(earlier, "1992-05-12T23:59:58.000000");
    }

    #[test]
    fn test_degrees_to_radians() {
        assert_abs_diff_eq!(degrees_to_radians(180.0), std::f64::consts::PI, epsilon = 1e-12);
    }
}
