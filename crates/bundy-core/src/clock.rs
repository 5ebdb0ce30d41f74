// crates/bundy-core/src/clock.rs
//
// The single normalization point between device/local wall time and
// absolute instants. Parsing punches and computing day boundaries both go
// through here with the same reference timezone; nothing else in the
// engine touches offsets.

use chrono::offset::LocalResult;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("invalid timestamp '{raw}': {message}")]
    Invalid { raw: String, message: String },

    #[error("local time '{raw}' does not exist in {timezone}")]
    NonexistentLocalTime { raw: String, timezone: String },
}

static DEVICE_FORMATS: &[&str] = &["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"];

/// Parses a device timestamp: `DD/MM/YYYY HH:MM`, optionally with seconds,
/// optionally followed by terminal noise ("01/07/2025 08:20 1"). Out-of-range
/// day/month/hour/minute values are rejected with a per-row error.
pub fn parse_device_timestamp(raw: &str) -> Result<NaiveDateTime, NormalizeError> {
    let trimmed = raw.trim();
    let mut tokens = trimmed.split_whitespace();
    let candidate = match (tokens.next(), tokens.next()) {
        (Some(date), Some(time)) => format!("{date} {time}"),
        _ => {
            return Err(NormalizeError::Invalid {
                raw: raw.to_string(),
                message: "expected a date and a time".to_string(),
            })
        }
    };

    for format in DEVICE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(&candidate, format) {
            return Ok(parsed);
        }
    }

    Err(NormalizeError::Invalid {
        raw: raw.to_string(),
        message: format!("'{candidate}' does not match any supported format"),
    })
}

/// Resolves a reference-zone wall time to an absolute instant. Ambiguous
/// times (a clock set back) take the earlier reading; skipped times are a
/// per-row error rather than a silent shift.
pub fn local_to_instant(local: NaiveDateTime, tz: Tz) -> Result<DateTime<Utc>, NormalizeError> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(NormalizeError::NonexistentLocalTime {
            raw: local.to_string(),
            timezone: tz.name().to_string(),
        }),
    }
}

/// Parses and resolves in one step; returns the instant together with its
/// business-day key.
pub fn normalize_device_timestamp(
    raw: &str,
    tz: Tz,
) -> Result<(DateTime<Utc>, NaiveDate), NormalizeError> {
    let local = parse_device_timestamp(raw)?;
    let instant = local_to_instant(local, tz)?;
    Ok((instant, business_day(instant, tz)))
}

/// The calendar date, in the reference timezone, an instant belongs to.
pub fn business_day(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// Wall-clock time of an instant in the reference timezone.
pub fn local_time(instant: DateTime<Utc>, tz: Tz) -> NaiveTime {
    instant.with_timezone(&tz).time()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    const MANILA: Tz = chrono_tz::Asia::Manila;

    #[test]
    fn parses_plain_device_timestamp() {
        let parsed = parse_device_timestamp("01/07/2025 07:55").unwrap();
        assert_eq!(parsed.time().hour(), 7);
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
    }

    #[test]
    fn parses_timestamp_with_seconds_and_noise() {
        let parsed = parse_device_timestamp("15/03/2025 17:02:44  1 0").unwrap();
        assert_eq!(parsed.time(), NaiveTime::from_hms_opt(17, 2, 44).unwrap());
    }

    #[test]
    fn rejects_out_of_range_components() {
        assert!(parse_device_timestamp("32/01/2025 08:00").is_err());
        assert!(parse_device_timestamp("01/13/2025 08:00").is_err());
        assert!(parse_device_timestamp("01/01/2025 24:01").is_err());
        assert!(parse_device_timestamp("01/01/2025 08:61").is_err());
        assert!(parse_device_timestamp("just noise").is_err());
        assert!(parse_device_timestamp("01/07/2025").is_err());
    }

    #[test]
    fn business_day_follows_reference_zone_not_utc() {
        // 00:30 on 1 July in Manila is still 30 June in UTC. The business
        // day must come from the reference zone.
        let (instant, day) = normalize_device_timestamp("01/07/2025 00:30", MANILA).unwrap();
        assert_eq!(day, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
        assert_eq!(
            instant.date_naive(),
            NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
        );
    }

    #[test]
    fn late_evening_punch_stays_on_its_day() {
        let (_, day) = normalize_device_timestamp("30/06/2025 23:50", MANILA).unwrap();
        assert_eq!(day, NaiveDate::from_ymd_opt(2025, 6, 30).unwrap());
    }

    #[test]
    fn local_time_round_trips_through_instant() {
        let (instant, _) = normalize_device_timestamp("01/07/2025 08:20", MANILA).unwrap();
        assert_eq!(
            local_time(instant, MANILA),
            NaiveTime::from_hms_opt(8, 20, 0).unwrap()
        );
    }
}
