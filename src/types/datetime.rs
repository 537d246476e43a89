//! Date, datetime and time parsing and formatting.

use crate::types::error::{TypeError, TypeResult};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::fmt;

/// Layouts accepted when parsing text into a datetime, tried in order.
const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
];

const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Largest TIME value MySQL accepts: 838:59:59.
pub const MAX_TIME_MICROS: i64 = (838 * 3600 + 59 * 60 + 59) * 1_000_000;

/// The zero datetime `0000-00-00 00:00:00`. chrono has no month 0, so the
/// zero value is carried as the first instant of year 0 and rendered
/// specially.
pub fn zero_datetime() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(0, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MIN)
}

pub fn is_zero_datetime(t: &NaiveDateTime) -> bool {
    *t == zero_datetime()
}

/// Latest representable datetime: 9999-12-31 23:59:59.999999.
pub fn max_datetime() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|d| d.and_hms_micro_opt(23, 59, 59, 999_999))
        .unwrap_or(NaiveDateTime::MAX)
}

/// Returns `None` for results past the end of year 9999.
pub fn validate_time(t: NaiveDateTime) -> Option<NaiveDateTime> {
    if t > max_datetime() {
        None
    } else {
        Some(t)
    }
}

/// Parse a datetime the way MySQL accepts it in string context.
pub fn parse_datetime(s: &str) -> TypeResult<NaiveDateTime> {
    let s = s.trim();
    if s.starts_with("0000-00-00") {
        return Ok(zero_datetime());
    }
    if s.len() == 8 || s.len() == 14 {
        if s.bytes().all(|b| b.is_ascii_digit()) {
            return parse_compact_datetime(s);
        }
    }
    for layout in DATETIME_LAYOUTS {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, layout) {
            return Ok(t);
        }
    }
    for layout in DATE_LAYOUTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, layout) {
            if let Some(t) = d.and_hms_opt(0, 0, 0) {
                return Ok(t);
            }
        }
    }
    Err(TypeError::InvalidDatetime(s.to_string()))
}

/// `YYYYMMDD` or `YYYYMMDDhhmmss`.
fn parse_compact_datetime(s: &str) -> TypeResult<NaiveDateTime> {
    let field = |range: std::ops::Range<usize>| -> u32 { s[range].parse().unwrap_or(0) };
    let (hour, minute, second) = if s.len() == 14 {
        (field(8..10), field(10..12), field(12..14))
    } else {
        (0, 0, 0)
    };
    NaiveDate::from_ymd_opt(field(0..4) as i32, field(4..6), field(6..8))
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .ok_or_else(|| TypeError::InvalidDatetime(s.to_string()))
}

/// Render a datetime as `YYYY-MM-DD hh:mm:ss[.ffffff]`.
pub fn format_datetime(t: &NaiveDateTime) -> String {
    if is_zero_datetime(t) {
        return "0000-00-00 00:00:00".to_string();
    }
    let micros = t.nanosecond() / 1_000;
    if micros == 0 {
        t.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        format!("{}.{:06}", t.format("%Y-%m-%d %H:%M:%S"), micros)
    }
}

pub fn format_date(t: &NaiveDateTime) -> String {
    if is_zero_datetime(t) {
        return "0000-00-00".to_string();
    }
    t.format("%Y-%m-%d").to_string()
}

/// Numeric form of a datetime in MySQL numeric context: `YYYYMMDDhhmmss`.
pub fn datetime_to_number(t: &NaiveDateTime) -> i64 {
    if is_zero_datetime(t) {
        return 0;
    }
    let date = t.year() as i64 * 10_000 + t.month() as i64 * 100 + t.day() as i64;
    let time = t.hour() as i64 * 10_000 + t.minute() as i64 * 100 + t.second() as i64;
    date * 1_000_000 + time
}

/// A TIME value: a signed span of microseconds, within +/- 838:59:59.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timespan(pub i64);

impl Timespan {
    pub fn from_hms_micro(
        negative: bool,
        hours: i64,
        minutes: i64,
        seconds: i64,
        micros: i64,
    ) -> Self {
        let total = ((hours * 60 + minutes) * 60 + seconds) * 1_000_000 + micros;
        Timespan(if negative { -total } else { total })
    }

    pub fn micros(&self) -> i64 {
        self.0
    }

    /// Clamp to the TIME range, reporting whether the value fit.
    pub fn clamped(self) -> (Self, bool) {
        if self.0 > MAX_TIME_MICROS {
            (Timespan(MAX_TIME_MICROS), false)
        } else if self.0 < -MAX_TIME_MICROS {
            (Timespan(-MAX_TIME_MICROS), false)
        } else {
            (self, true)
        }
    }

    pub fn from_time_of_day(t: &NaiveTime) -> Self {
        let micros = t.nanosecond() as i64 / 1_000;
        Timespan::from_hms_micro(
            false,
            t.hour() as i64,
            t.minute() as i64,
            t.second() as i64,
            micros,
        )
    }

    /// `hhmmss` numeric form.
    pub fn to_number(&self) -> i64 {
        let (neg, h, m, s, _) = self.parts();
        let n = h * 10_000 + m * 100 + s;
        if neg {
            -n
        } else {
            n
        }
    }

    fn parts(&self) -> (bool, i64, i64, i64, i64) {
        let neg = self.0 < 0;
        let abs = self.0.abs();
        let micros = abs % 1_000_000;
        let secs = abs / 1_000_000;
        (neg, secs / 3600, (secs / 60) % 60, secs % 60, micros)
    }

    /// Interpret an integer in `[-]hhmmss` form.
    pub fn from_number(n: i64) -> TypeResult<Self> {
        let neg = n < 0;
        let abs = n.unsigned_abs() as i64;
        let (h, m, s) = (abs / 10_000, (abs / 100) % 100, abs % 100);
        if m > 59 || s > 59 {
            return Err(TypeError::invalid(n, "time"));
        }
        Ok(Timespan::from_hms_micro(neg, h, m, s, 0))
    }

    /// Parse `[-][D ]hh:mm[:ss[.ffffff]]` or a bare `[-]hhmmss` number.
    pub fn parse(s: &str) -> TypeResult<Self> {
        let trimmed = s.trim();
        let (neg, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let invalid = || TypeError::invalid(s, "time");

        let (days, clock) = match body.split_once(' ') {
            Some((d, rest)) => (d.parse::<i64>().map_err(|_| invalid())?, rest),
            None => (0, body),
        };

        if !clock.contains(':') {
            let (whole, frac) = split_fraction(clock);
            let n: i64 = whole.parse().map_err(|_| invalid())?;
            let base = Timespan::from_number(n)?;
            let micros = parse_fraction(frac).ok_or_else(invalid)?;
            let total = base.0 + micros + days * 86_400_000_000;
            return Ok(Timespan(if neg { -total } else { total }));
        }

        let mut fields = clock.split(':');
        let hours: i64 = fields.next().unwrap_or("0").parse().map_err(|_| invalid())?;
        let minutes: i64 = fields.next().unwrap_or("0").parse().map_err(|_| invalid())?;
        let (sec_str, frac) = split_fraction(fields.next().unwrap_or("0"));
        let seconds: i64 = sec_str.parse().map_err(|_| invalid())?;
        if fields.next().is_some() || minutes > 59 || seconds > 59 {
            return Err(invalid());
        }
        let micros = parse_fraction(frac).ok_or_else(invalid)?;
        Ok(Timespan::from_hms_micro(neg, days * 24 + hours, minutes, seconds, micros))
    }
}

impl fmt::Display for Timespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (neg, h, m, s, micros) = self.parts();
        if neg {
            f.write_str("-")?;
        }
        write!(f, "{:02}:{:02}:{:02}", h, m, s)?;
        if micros != 0 {
            write!(f, ".{:06}", micros)?;
        }
        Ok(())
    }
}

fn split_fraction(s: &str) -> (&str, &str) {
    match s.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (s, ""),
    }
}

/// Parse up to six fractional digits into microseconds.
fn parse_fraction(frac: &str) -> Option<i64> {
    if frac.is_empty() {
        return Some(0);
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits: String = frac.chars().chain(std::iter::repeat('0')).take(6).collect();
    digits.parse().ok()
}

/// Number of days in the given month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        parse_datetime(s).unwrap()
    }

    #[test]
    fn test_parse_datetime_layouts() {
        assert_eq!(format_datetime(&dt("2018-05-01")), "2018-05-01 00:00:00");
        assert_eq!(format_datetime(&dt("2018-05-01 10:11:12")), "2018-05-01 10:11:12");
        assert_eq!(format_datetime(&dt("2018-05-01T10:11:12.5")), "2018-05-01 10:11:12.500000");
        assert_eq!(format_datetime(&dt("20180501")), "2018-05-01 00:00:00");
        assert!(parse_datetime("not a date").is_err());
        assert!(parse_datetime("2018-13-01").is_err());
    }

    #[test]
    fn test_zero_datetime() {
        let zero = dt("0000-00-00 00:00:00");
        assert!(is_zero_datetime(&zero));
        assert_eq!(format_datetime(&zero), "0000-00-00 00:00:00");
        assert_eq!(datetime_to_number(&zero), 0);
    }

    #[test]
    fn test_datetime_to_number() {
        assert_eq!(datetime_to_number(&dt("2020-01-02 03:04:05")), 20200102030405);
    }

    #[test]
    fn test_validate_time() {
        assert!(validate_time(dt("9999-12-31 23:59:59")).is_some());
        let past = NaiveDate::from_ymd_opt(10000, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert!(validate_time(past).is_none());
    }

    #[test]
    fn test_timespan_parse_and_format() {
        assert_eq!(Timespan::parse("10:11:12").unwrap().to_string(), "10:11:12");
        assert_eq!(Timespan::parse("-01:00:00.25").unwrap().to_string(), "-01:00:00.250000");
        assert_eq!(Timespan::parse("1 02:00:00").unwrap().to_string(), "26:00:00");
        assert_eq!(Timespan::parse("123").unwrap().to_string(), "00:01:23");
        assert!(Timespan::parse("10:61:00").is_err());
        assert!(Timespan::parse("abc").is_err());
    }

    #[test]
    fn test_timespan_clamp() {
        let (t, ok) = Timespan::from_hms_micro(false, 900, 0, 0, 0).clamped();
        assert!(!ok);
        assert_eq!(t.to_string(), "838:59:59");
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2004, 2), 29);
        assert_eq!(days_in_month(2005, 2), 28);
        assert_eq!(days_in_month(2005, 12), 31);
        assert_eq!(days_in_month(2005, 4), 30);
    }
}
