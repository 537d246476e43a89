//! `INTERVAL expr unit` and calendar offsets.
//!
//! An interval is not a value: arithmetic nodes ask it for a [`TimeDelta`]
//! through [`Interval::eval_delta`] and apply that to a datetime operand.

use crate::expression::error::{ExpressionError, ExpressionResult};
use crate::expression::expr::{take_children, Expression, ExpressionOps};
use crate::session::Context;
use crate::types::convert::to_text;
use crate::types::datetime::days_in_month;
use crate::types::{SqlType, Value};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Units accepted after `INTERVAL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntervalUnit {
    Microsecond,
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
    YearMonth,
    DayHour,
    DayMinute,
    DaySecond,
    DayMicrosecond,
    HourMinute,
    HourSecond,
    HourMicrosecond,
    MinuteSecond,
    MinuteMicrosecond,
    SecondMicrosecond,
}

/// Field a captured number of a composite unit is written to.
#[derive(Debug, Clone, Copy)]
enum Field {
    Years,
    Months,
    Days,
    Hours,
    Minutes,
    Seconds,
    Microseconds,
}

const ALL_UNITS: [IntervalUnit; 20] = [
    IntervalUnit::Microsecond,
    IntervalUnit::Second,
    IntervalUnit::Minute,
    IntervalUnit::Hour,
    IntervalUnit::Day,
    IntervalUnit::Week,
    IntervalUnit::Month,
    IntervalUnit::Quarter,
    IntervalUnit::Year,
    IntervalUnit::YearMonth,
    IntervalUnit::DayHour,
    IntervalUnit::DayMinute,
    IntervalUnit::DaySecond,
    IntervalUnit::DayMicrosecond,
    IntervalUnit::HourMinute,
    IntervalUnit::HourSecond,
    IntervalUnit::HourMicrosecond,
    IntervalUnit::MinuteSecond,
    IntervalUnit::MinuteMicrosecond,
    IntervalUnit::SecondMicrosecond,
];

impl IntervalUnit {
    /// Parse a unit name, ignoring case.
    pub fn parse(s: &str) -> ExpressionResult<Self> {
        let upper = s.trim().to_ascii_uppercase();
        ALL_UNITS
            .iter()
            .copied()
            .find(|unit| unit.as_str() == upper)
            .ok_or_else(|| ExpressionError::InvalidIntervalUnit(s.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalUnit::Microsecond => "MICROSECOND",
            IntervalUnit::Second => "SECOND",
            IntervalUnit::Minute => "MINUTE",
            IntervalUnit::Hour => "HOUR",
            IntervalUnit::Day => "DAY",
            IntervalUnit::Week => "WEEK",
            IntervalUnit::Month => "MONTH",
            IntervalUnit::Quarter => "QUARTER",
            IntervalUnit::Year => "YEAR",
            IntervalUnit::YearMonth => "YEAR_MONTH",
            IntervalUnit::DayHour => "DAY_HOUR",
            IntervalUnit::DayMinute => "DAY_MINUTE",
            IntervalUnit::DaySecond => "DAY_SECOND",
            IntervalUnit::DayMicrosecond => "DAY_MICROSECOND",
            IntervalUnit::HourMinute => "HOUR_MINUTE",
            IntervalUnit::HourSecond => "HOUR_SECOND",
            IntervalUnit::HourMicrosecond => "HOUR_MICROSECOND",
            IntervalUnit::MinuteSecond => "MINUTE_SECOND",
            IntervalUnit::MinuteMicrosecond => "MINUTE_MICROSECOND",
            IntervalUnit::SecondMicrosecond => "SECOND_MICROSECOND",
        }
    }

    /// Pattern and target fields of a composite unit; `None` for single
    /// units.
    fn composite(&self) -> Option<(&'static str, &'static [Field])> {
        use Field::*;
        let layout: (&'static str, &'static [Field]) = match self {
            IntervalUnit::YearMonth => (r"^(-)?(\d+)-(\d+)$", &[Years, Months]),
            IntervalUnit::DayHour => (r"^(-)?(\d+)\s+(\d+)$", &[Days, Hours]),
            IntervalUnit::DayMinute => (r"^(-)?(\d+)\s+(\d+):(\d+)$", &[Days, Hours, Minutes]),
            IntervalUnit::DaySecond => (
                r"^(-)?(\d+)\s+(\d+):(\d+):(\d+)$",
                &[Days, Hours, Minutes, Seconds],
            ),
            IntervalUnit::DayMicrosecond => (
                r"^(-)?(\d+)\s+(\d+):(\d+):(\d+)\.(\d+)$",
                &[Days, Hours, Minutes, Seconds, Microseconds],
            ),
            IntervalUnit::HourMinute => (r"^(-)?(\d+):(\d+)$", &[Hours, Minutes]),
            IntervalUnit::HourSecond => (r"^(-)?(\d+):(\d+):(\d+)$", &[Hours, Minutes, Seconds]),
            IntervalUnit::HourMicrosecond => (
                r"^(-)?(\d+):(\d+):(\d+)\.(\d+)$",
                &[Hours, Minutes, Seconds, Microseconds],
            ),
            IntervalUnit::MinuteSecond => (r"^(-)?(\d+):(\d+)$", &[Minutes, Seconds]),
            IntervalUnit::MinuteMicrosecond => (
                r"^(-)?(\d+):(\d+)\.(\d+)$",
                &[Minutes, Seconds, Microseconds],
            ),
            IntervalUnit::SecondMicrosecond => (r"^(-)?(\d+)\.(\d+)$", &[Seconds, Microseconds]),
            _ => return None,
        };
        Some(layout)
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A calendar offset. Years and months move along the calendar; the
/// remaining fields form a fixed duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeDelta {
    pub years: i64,
    pub months: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub microseconds: i64,
}

impl TimeDelta {
    /// `t + delta`
    pub fn add(&self, t: NaiveDateTime) -> ExpressionResult<NaiveDateTime> {
        self.apply(t, 1)
    }

    /// `t - delta`
    pub fn sub(&self, t: NaiveDateTime) -> ExpressionResult<NaiveDateTime> {
        self.apply(t, -1)
    }

    fn apply(&self, t: NaiveDateTime, sign: i64) -> ExpressionResult<NaiveDateTime> {
        let out_of_range = || ExpressionError::DatetimeOutOfRange;

        let shift = self
            .years
            .checked_mul(12)
            .and_then(|m| m.checked_add(self.months))
            .and_then(|m| m.checked_mul(sign))
            .ok_or_else(out_of_range)?;
        let total_months = (t.year() as i64 * 12 + t.month0() as i64)
            .checked_add(shift)
            .ok_or_else(out_of_range)?;
        let year = i32::try_from(total_months.div_euclid(12)).map_err(|_| out_of_range())?;
        let month = total_months.rem_euclid(12) as u32 + 1;
        let day = t.day().min(days_in_month(year, month));
        let shifted = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(out_of_range)?
            .and_time(t.time());

        let micros = self
            .fixed_micros()
            .and_then(|m| m.checked_mul(sign))
            .ok_or_else(out_of_range)?;
        shifted
            .checked_add_signed(Duration::microseconds(micros))
            .ok_or_else(out_of_range)
    }

    fn fixed_micros(&self) -> Option<i64> {
        let hours = self.days.checked_mul(24)?.checked_add(self.hours)?;
        let minutes = hours.checked_mul(60)?.checked_add(self.minutes)?;
        let seconds = minutes.checked_mul(60)?.checked_add(self.seconds)?;
        seconds.checked_mul(1_000_000)?.checked_add(self.microseconds)
    }

    fn set(&mut self, field: Field, n: i64) {
        match field {
            Field::Years => self.years = n,
            Field::Months => self.months = n,
            Field::Days => self.days = n,
            Field::Hours => self.hours = n,
            Field::Minutes => self.minutes = n,
            Field::Seconds => self.seconds = n,
            Field::Microseconds => self.microseconds = n,
        }
    }
}

/// `INTERVAL expr unit`. Only meaningful as an operand of `+` or `-`.
#[derive(Debug, Clone)]
pub struct Interval {
    expr: Box<Expression>,
    pub unit: IntervalUnit,
    pattern: OnceLock<Regex>,
}

impl Interval {
    /// Build an interval from a unit name; unknown units fail.
    pub fn new(expr: Expression, unit: &str) -> ExpressionResult<Self> {
        Ok(Self::with_unit(expr, IntervalUnit::parse(unit)?))
    }

    pub fn with_unit(expr: Expression, unit: IntervalUnit) -> Self {
        Self {
            expr: Box::new(expr),
            unit,
            pattern: OnceLock::new(),
        }
    }

    /// Evaluate the offset this interval describes. NULL gives `None`.
    pub fn eval_delta(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Option<TimeDelta>> {
        let value = self.expr.eval(ctx, row)?;
        if value.is_null() {
            return Ok(None);
        }

        let mut delta = TimeDelta::default();
        let Some((_, fields)) = self.unit.composite() else {
            let n = match SqlType::Int64.convert(&value)? {
                (Value::Int64(n), _) => n,
                _ => return Ok(None),
            };
            match self.unit {
                IntervalUnit::Microsecond => delta.microseconds = n,
                IntervalUnit::Second => delta.seconds = n,
                IntervalUnit::Minute => delta.minutes = n,
                IntervalUnit::Hour => delta.hours = n,
                IntervalUnit::Day => delta.days = n,
                IntervalUnit::Week => delta.days = n.saturating_mul(7),
                IntervalUnit::Month => delta.months = n,
                IntervalUnit::Quarter => delta.months = n.saturating_mul(3),
                _ => delta.years = n,
            }
            return Ok(Some(delta));
        };

        let text = to_text(&value);
        let text = text.trim();
        let invalid = || ExpressionError::InvalidIntervalFormat {
            unit: self.unit.to_string(),
            value: text.to_string(),
        };
        let captures = self.pattern()?.captures(text).ok_or_else(invalid)?;
        let negative = captures.get(1).is_some();
        for (i, field) in fields.iter().enumerate() {
            let digits = captures.get(i + 2).map(|m| m.as_str()).unwrap_or("0");
            let n = match field {
                Field::Microseconds => fraction_to_micros(digits),
                _ => digits.parse::<i64>().ok(),
            }
            .ok_or_else(invalid)?;
            delta.set(*field, if negative { -n } else { n });
        }
        Ok(Some(delta))
    }

    fn pattern(&self) -> ExpressionResult<&Regex> {
        if let Some(re) = self.pattern.get() {
            return Ok(re);
        }
        let source = self.unit.composite().map(|(p, _)| p).unwrap_or("^$");
        let re = Regex::new(source).map_err(|e| ExpressionError::InvalidRegexp(e.to_string()))?;
        Ok(self.pattern.get_or_init(|| re))
    }
}

/// Fractional seconds are left-aligned, as in MySQL: `.5` is 500000.
fn fraction_to_micros(digits: &str) -> Option<i64> {
    let padded: String = digits.chars().chain(std::iter::repeat('0')).take(6).collect();
    padded.parse().ok()
}

impl ExpressionOps for Interval {
    fn eval(&self, _ctx: &Context, _row: &[Value]) -> ExpressionResult<Value> {
        Err(ExpressionError::NotEvaluable {
            expression: self.to_string(),
        })
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Int64
    }

    fn is_nullable(&self) -> bool {
        self.expr.is_nullable()
    }

    fn children(&self) -> Vec<&Expression> {
        vec![&self.expr]
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        let [expr] = take_children::<1>(self, children)?;
        Ok(Expression::Interval(Interval::with_unit(expr, self.unit)))
    }

    fn debug_string(&self) -> String {
        format!("INTERVAL {} {}", self.expr.debug_string(), self.unit)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "INTERVAL {} {}", self.expr, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn delta(value: impl Into<Value>, unit: &str) -> ExpressionResult<Option<TimeDelta>> {
        let interval = Interval::new(Expression::literal(value.into()), unit)?;
        interval.eval_delta(&Context::default(), &[])
    }

    #[test]
    fn test_calendar_arithmetic() {
        let years = TimeDelta {
            years: 1,
            ..Default::default()
        };
        assert_eq!(years.add(dt(2004, 2, 29)).unwrap(), dt(2005, 2, 28));

        let months = TimeDelta {
            months: 13,
            ..Default::default()
        };
        assert_eq!(months.add(dt(2004, 2, 29)).unwrap(), dt(2005, 3, 29));

        let month = TimeDelta {
            months: 1,
            ..Default::default()
        };
        assert_eq!(month.add(dt(2021, 1, 31)).unwrap(), dt(2021, 2, 28));
        assert_eq!(month.add(dt(2020, 1, 31)).unwrap(), dt(2020, 2, 29));
        assert_eq!(month.sub(dt(2021, 1, 15)).unwrap(), dt(2020, 12, 15));
    }

    #[test]
    fn test_fixed_phase() {
        let d = TimeDelta {
            days: 1,
            hours: 2,
            ..Default::default()
        };
        let expected = NaiveDate::from_ymd_opt(2018, 5, 2)
            .unwrap()
            .and_hms_opt(2, 0, 0)
            .unwrap();
        assert_eq!(d.add(dt(2018, 5, 1)).unwrap(), expected);
        assert_eq!(d.sub(expected).unwrap(), dt(2018, 5, 1));
    }

    #[test]
    fn test_out_of_range() {
        let d = TimeDelta {
            years: i64::MAX,
            ..Default::default()
        };
        assert_eq!(d.add(dt(2000, 1, 1)), Err(ExpressionError::DatetimeOutOfRange));
    }

    #[test]
    fn test_single_units() {
        assert_eq!(
            delta(2i64, "week").unwrap(),
            Some(TimeDelta {
                days: 14,
                ..Default::default()
            })
        );
        assert_eq!(
            delta(1i64, "QUARTER").unwrap(),
            Some(TimeDelta {
                months: 3,
                ..Default::default()
            })
        );
        assert_eq!(delta(Value::Null, "DAY").unwrap(), None);
    }

    #[test]
    fn test_composite_units() {
        assert_eq!(
            delta("1 2", "DAY_HOUR").unwrap(),
            Some(TimeDelta {
                days: 1,
                hours: 2,
                ..Default::default()
            })
        );
        assert_eq!(
            delta("3-4", "YEAR_MONTH").unwrap(),
            Some(TimeDelta {
                years: 3,
                months: 4,
                ..Default::default()
            })
        );
        assert_eq!(
            delta("1:30.5", "MINUTE_MICROSECOND").unwrap(),
            Some(TimeDelta {
                minutes: 1,
                seconds: 30,
                microseconds: 500_000,
                ..Default::default()
            })
        );
        assert_eq!(
            delta("-1 2", "DAY_HOUR").unwrap(),
            Some(TimeDelta {
                days: -1,
                hours: -2,
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_invalid_interval() {
        assert!(matches!(
            delta("1-2", "DAY_HOUR"),
            Err(ExpressionError::InvalidIntervalFormat { .. })
        ));
        assert_eq!(
            Interval::new(Expression::literal(1i64), "FORTNIGHT").unwrap_err(),
            ExpressionError::InvalidIntervalUnit("FORTNIGHT".to_string())
        );
    }

    #[test]
    fn test_interval_is_not_evaluable() {
        let interval = Interval::new(Expression::literal(1i64), "day").unwrap();
        assert_eq!(interval.to_string(), "INTERVAL 1 DAY");
        assert_eq!(interval.sql_type(), SqlType::Int64);
        assert!(matches!(
            interval.eval(&Context::default(), &[]),
            Err(ExpressionError::NotEvaluable { .. })
        ));
    }
}
