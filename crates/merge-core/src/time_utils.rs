use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};

/// Format used when timestamps are written without a zone suffix.
pub const NAIVE_UTC_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ── Timestamp composition ─────────────────────────────────────────────────────

/// Convert a coerced numeric component to an integer, rejecting fractions,
/// infinities and values outside `i64`.
fn integral(value: f64) -> Option<i64> {
    if !value.is_finite() || value.fract() != 0.0 {
        return None;
    }
    if value < i64::MIN as f64 || value > i64::MAX as f64 {
        return None;
    }
    Some(value as i64)
}

/// Compose a UTC timestamp from year / month / day / hour components.
///
/// Returns `None` when any component is missing, non-integral, or outside
/// its calendar range (month 13, February 30, hour 24, ...). Nothing is
/// clamped or rolled over.
///
/// The hour is a clock field, not an offset added to midnight: hour 24 is
/// not read as 00:00 of the next day, `1.5` is not read as 01:30, and a
/// negative hour does not step back into the previous day. Such rows are
/// dropped by the caller instead.
pub fn compose_utc(
    year: Option<f64>,
    month: Option<f64>,
    day: Option<f64>,
    hour: Option<f64>,
) -> Option<DateTime<Utc>> {
    let year = i32::try_from(integral(year?)?).ok()?;
    let month = u32::try_from(integral(month?)?).ok()?;
    let day = u32::try_from(integral(day?)?).ok()?;
    let hour = u32::try_from(integral(hour?)?).ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let naive = date.and_hms_opt(hour, 0, 0)?;
    Some(naive.and_utc())
}

// ── Flooring / calendar helpers ───────────────────────────────────────────────

/// Truncate `dt` to midnight UTC of the same calendar day.
pub fn floor_to_day(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Calendar `(year, month)` of a UTC timestamp.
pub fn year_month(dt: DateTime<Utc>) -> (i32, u32) {
    (dt.year(), dt.month())
}

/// Render a UTC timestamp without any zone designator.
pub fn to_naive_utc_string(dt: DateTime<Utc>) -> String {
    dt.naive_utc().format(NAIVE_UTC_FORMAT).to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn parts(y: f64, m: f64, d: f64, h: f64) -> Option<DateTime<Utc>> {
        compose_utc(Some(y), Some(m), Some(d), Some(h))
    }

    // ── compose_utc ───────────────────────────────────────────────────────────

    #[test]
    fn test_compose_valid() {
        let dt = parts(2005.0, 1.0, 1.0, 12.0);
        assert_eq!(dt, Some(Utc.with_ymd_and_hms(2005, 1, 1, 12, 0, 0).unwrap()));
    }

    #[test]
    fn test_compose_invalid_calendar_date_not_clamped() {
        assert_eq!(parts(2005.0, 2.0, 30.0, 12.0), None);
        assert_eq!(parts(2005.0, 13.0, 1.0, 0.0), None);
        assert_eq!(parts(2005.0, 1.0, 32.0, 0.0), None);
        assert_eq!(parts(2005.0, 0.0, 1.0, 0.0), None);
    }

    #[test]
    fn test_compose_leap_day() {
        assert!(parts(2004.0, 2.0, 29.0, 0.0).is_some());
        assert!(parts(2005.0, 2.0, 29.0, 0.0).is_none());
    }

    #[test]
    fn test_compose_hour_range() {
        assert!(parts(2005.0, 1.0, 1.0, 21.0).is_some());
        assert!(parts(2005.0, 1.0, 1.0, 24.0).is_none());
        assert!(parts(2005.0, 1.0, 1.0, -3.0).is_none());
    }

    #[test]
    fn test_compose_hour_is_not_an_offset() {
        // 24 would be 2005-01-02 00:00 and 1.5 would be 01:30 if added as a duration.
        assert_eq!(parts(2005.0, 1.0, 1.0, 24.0), None);
        assert_eq!(parts(2005.0, 1.0, 1.0, 1.5), None);
        assert_eq!(parts(2005.0, 1.0, 2.0, -1.0), None);
    }

    #[test]
    fn test_compose_missing_component() {
        assert_eq!(compose_utc(Some(2005.0), Some(1.0), Some(1.0), None), None);
        assert_eq!(compose_utc(None, Some(1.0), Some(1.0), Some(0.0)), None);
    }

    #[test]
    fn test_compose_rejects_fractions_and_non_finite() {
        assert!(parts(2005.0, 1.5, 1.0, 0.0).is_none());
        assert!(parts(2005.0, 1.0, 1.0, 1.5).is_none());
        assert!(parts(f64::INFINITY, 1.0, 1.0, 0.0).is_none());
        assert!(parts(1e20, 1.0, 1.0, 0.0).is_none());
    }

    // ── floor_to_day / year_month ─────────────────────────────────────────────

    #[test]
    fn test_floor_to_day() {
        let dt = Utc.with_ymd_and_hms(2005, 3, 14, 21, 0, 0).unwrap();
        let floored = floor_to_day(dt);
        assert_eq!(floored, Utc.with_ymd_and_hms(2005, 3, 14, 0, 0, 0).unwrap());
        assert_eq!(floored.hour(), 0);
        assert_eq!(floor_to_day(floored), floored);
    }

    #[test]
    fn test_year_month() {
        let dt = Utc.with_ymd_and_hms(2006, 12, 31, 18, 0, 0).unwrap();
        assert_eq!(year_month(dt), (2006, 12));
    }

    // ── to_naive_utc_string ───────────────────────────────────────────────────

    #[test]
    fn test_naive_string_has_no_zone() {
        let dt = Utc.with_ymd_and_hms(2005, 2, 1, 6, 0, 0).unwrap();
        assert_eq!(to_naive_utc_string(dt), "2005-02-01 06:00:00");
    }
}
