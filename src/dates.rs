//! Date normalization and UTC calendar helpers.
//!
//! Every externally-supplied date is pinned to 12:00 UTC before it is
//! persisted, so that extracting year/month/day via UTC accessors later
//! is stable no matter which timezone the client or the server runs in.
//! All bucketing and filtering uses UTC calendar fields; the only
//! deliberate exception is birthday matching (see `presenters`).

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::error::ApiError;

/// Hour every stored date is pinned to. Midday keeps the calendar date
/// intact through naive local-timezone round-trips in presentation code.
const NOON_HOUR: u32 = 12;

/// Parse an externally-supplied date (`YYYY-MM-DD` or an ISO datetime)
/// and pin it to 12:00 UTC on its UTC calendar day.
pub fn normalize_date(input: &str) -> Result<DateTime<Utc>, ApiError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("date must not be empty"));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(pin_to_noon(date));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(pin_to_noon(dt.with_timezone(&Utc).date_naive()));
    }
    Err(ApiError::validation(format!(
        "invalid date '{trimmed}', expected YYYY-MM-DD or an ISO datetime"
    )))
}

fn pin_to_noon(date: NaiveDate) -> DateTime<Utc> {
    let noon = date
        .and_hms_opt(NOON_HOUR, 0, 0)
        .expect("12:00:00 is a valid time of day");
    Utc.from_utc_datetime(&noon)
}

/// Bucket key for a normalized date: `"YYYY-MM-DD"` from UTC fields.
pub fn day_key(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Calendar days in `(month, year)` under the proleptic Gregorian rule.
///
/// `month` must already be validated into `1..=12`.
pub fn days_in_month(month: u32, year: i32) -> u32 {
    let first = NaiveDate::from_ymd_opt(year, month, 1).expect("month validated into 1..=12");
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("first of month is always valid");
    (next - first).num_days() as u32
}

/// Validate a client-supplied month number into `1..=12`.
pub fn validate_month(month: i64) -> Result<u32, ApiError> {
    if (1..=12).contains(&month) {
        Ok(month as u32)
    } else {
        Err(ApiError::validation(format!(
            "month must be between 1 and 12, got {month}"
        )))
    }
}

/// Half-open UTC range `[first of month, first of next month)` for
/// range-scoping database queries. The aggregator still re-filters by
/// UTC fields; this only bounds what gets fetched.
pub fn month_range(month: u32, year: i32) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = NaiveDate::from_ymd_opt(year, month, 1).expect("month validated into 1..=12");
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("first of month is always valid");
    (
        Utc.from_utc_datetime(&start.and_hms_opt(0, 0, 0).expect("midnight is valid")),
        Utc.from_utc_datetime(&end.and_hms_opt(0, 0, 0).expect("midnight is valid")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn normalize_date_pins_plain_date_to_utc_noon() {
        let dt = normalize_date("2024-03-15").expect("plain date should parse");
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 3);
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 12);
        assert_eq!(dt.minute(), 0);
    }

    #[test]
    fn normalize_date_accepts_iso_datetime_and_keeps_utc_day() {
        let dt = normalize_date("2024-03-15T23:30:00-03:00").expect("iso datetime should parse");
        // 23:30 UTC-3 is 02:30 UTC on the 16th; the UTC calendar day wins.
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 3, 16));
        assert_eq!(dt.hour(), 12);
    }

    #[test]
    fn normalize_date_round_trips_utc_fields() {
        let dt = normalize_date("2024-03-15").expect("should parse");
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 3, 15));
        assert_eq!(day_key(&dt), "2024-03-15");
    }

    #[test]
    fn normalize_date_rejects_garbage_and_empty() {
        assert!(normalize_date("").is_err());
        assert!(normalize_date("  ").is_err());
        assert!(normalize_date("15/03/2024").is_err());
        assert!(normalize_date("2024-13-01").is_err());
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(days_in_month(2, 2024), 29);
        assert_eq!(days_in_month(2, 2023), 28);
        assert_eq!(days_in_month(2, 2000), 29);
        assert_eq!(days_in_month(2, 1900), 28);
        assert_eq!(days_in_month(12, 2024), 31);
        assert_eq!(days_in_month(4, 2024), 30);
    }

    #[test]
    fn validate_month_bounds() {
        assert_eq!(validate_month(1).unwrap(), 1);
        assert_eq!(validate_month(12).unwrap(), 12);
        assert!(validate_month(0).is_err());
        assert!(validate_month(13).is_err());
        assert!(validate_month(-3).is_err());
    }

    #[test]
    fn month_range_covers_exactly_one_month() {
        let (start, end) = month_range(12, 2024);
        assert_eq!(day_key(&start), "2024-12-01");
        assert_eq!(day_key(&end), "2025-01-01");
        let noon = normalize_date("2024-12-31").unwrap();
        assert!(noon >= start && noon < end);
    }
}
