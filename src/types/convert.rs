//! Conversion of values into a target [`SqlType`].
//!
//! Conversions never panic. Values that parse but fall outside the target's
//! domain saturate (or wrap, for negative values into unsigned types) and are
//! reported as [`ConvertInRange::OutOfRange`]; values that cannot be read at
//! all are a [`TypeError`].

use crate::types::datetime::{
    datetime_to_number, parse_datetime, zero_datetime, Timespan,
};
use crate::types::decimal::{
    decimal_from_f64, format_decimal, parse_decimal, round_to_scale, truncate_to_scale, Decimal,
};
use crate::types::error::{TypeError, TypeResult};
use crate::types::sql_type::SqlType;
use crate::types::value::Value;
use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike, Utc};
use num_traits::{Signed, ToPrimitive};

/// Whether a conversion stayed inside the target type's domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertInRange {
    InRange,
    OutOfRange,
}

use ConvertInRange::{InRange, OutOfRange};

impl ConvertInRange {
    fn and(self, other: ConvertInRange) -> ConvertInRange {
        if self == OutOfRange || other == OutOfRange {
            OutOfRange
        } else {
            InRange
        }
    }
}

impl SqlType {
    /// Convert `value` to this type. NULL converts to NULL for every type.
    pub fn convert(&self, value: &Value) -> TypeResult<(Value, ConvertInRange)> {
        if value.is_null() {
            return Ok((Value::Null, InRange));
        }
        match self {
            SqlType::Null => Ok((Value::Null, InRange)),
            SqlType::Deferred => Ok((value.clone(), InRange)),
            SqlType::Boolean => {
                let (i, r) = to_i64(value, self)?;
                Ok((Value::Boolean(i != 0), r))
            }
            SqlType::Int8 => narrow_signed(value, self, i8::MIN as i64, i8::MAX as i64)
                .map(|(i, r)| (Value::Int8(i as i8), r)),
            SqlType::Int16 => narrow_signed(value, self, i16::MIN as i64, i16::MAX as i64)
                .map(|(i, r)| (Value::Int16(i as i16), r)),
            SqlType::Int24 => narrow_signed(value, self, -(1 << 23), (1 << 23) - 1)
                .map(|(i, r)| (Value::Int32(i as i32), r)),
            SqlType::Int32 => narrow_signed(value, self, i32::MIN as i64, i32::MAX as i64)
                .map(|(i, r)| (Value::Int32(i as i32), r)),
            SqlType::Int64 => to_i64(value, self).map(|(i, r)| (Value::Int64(i), r)),
            SqlType::Uint8 => narrow_unsigned(value, self, u8::MAX as u64)
                .map(|(u, r)| (Value::Uint8(u as u8), r)),
            SqlType::Uint16 => narrow_unsigned(value, self, u16::MAX as u64)
                .map(|(u, r)| (Value::Uint16(u as u16), r)),
            SqlType::Uint24 => narrow_unsigned(value, self, (1 << 24) - 1)
                .map(|(u, r)| (Value::Uint32(u as u32), r)),
            SqlType::Uint32 => narrow_unsigned(value, self, u32::MAX as u64)
                .map(|(u, r)| (Value::Uint32(u as u32), r)),
            SqlType::Uint64 => to_u64(value, self).map(|(u, r)| (Value::Uint64(u), r)),
            SqlType::Float32 => {
                let f = to_f64(value, self)?;
                let r = if f.is_finite() && f.abs() > f32::MAX as f64 {
                    OutOfRange
                } else {
                    InRange
                };
                Ok((Value::Float32(f as f32), r))
            }
            SqlType::Float64 => Ok((Value::Float64(to_f64(value, self)?), InRange)),
            SqlType::Decimal(t) => {
                let d = to_decimal(value, self)?;
                Ok((Value::Decimal(t.bound(d)?), InRange))
            }
            SqlType::Year => to_year(value, self).map(|y| (Value::Int16(y), InRange)),
            SqlType::Date => {
                let t = to_datetime(value)?;
                Ok((Value::Datetime(t.date().and_time(NaiveTime::MIN)), InRange))
            }
            SqlType::Datetime | SqlType::Timestamp => {
                Ok((Value::Datetime(to_datetime(value)?), InRange))
            }
            SqlType::Time => {
                let (t, fits) = to_timespan(value)?.clamped();
                Ok((Value::Time(t), if fits { InRange } else { OutOfRange }))
            }
            SqlType::Text(st) => {
                let s = to_text(value);
                if st.length != u32::MAX && s.chars().count() > st.length as usize {
                    let truncated: String = s.chars().take(st.length as usize).collect();
                    return Ok((Value::Text(truncated), OutOfRange));
                }
                Ok((Value::Text(s), InRange))
            }
            SqlType::Binary(st) => {
                let mut b = to_bytes(value);
                if st.length != u32::MAX && b.len() > st.length as usize {
                    b.truncate(st.length as usize);
                    return Ok((Value::Bytes(b), OutOfRange));
                }
                Ok((Value::Bytes(b), InRange))
            }
            SqlType::Enum(e) => {
                let index = match value {
                    Value::Text(s) => e.index_of(s),
                    Value::Bytes(b) => e.index_of(&String::from_utf8_lossy(b)),
                    other => {
                        let (i, _) = to_i64(other, self)?;
                        u16::try_from(i)
                            .ok()
                            .filter(|i| (*i as usize) <= e.values().len())
                    }
                };
                index
                    .map(|i| (Value::Enum(i), InRange))
                    .ok_or_else(|| TypeError::invalid(value, self))
            }
            SqlType::Set(s) => {
                let bits = match value {
                    Value::Text(text) => s.bits_of(text),
                    Value::Bytes(b) => s.bits_of(&String::from_utf8_lossy(b)),
                    other => {
                        let (u, _) = to_u64(other, self)?;
                        Some(u).filter(|u| *u <= s.max_bits())
                    }
                };
                bits.map(|b| (Value::Set(b), InRange))
                    .ok_or_else(|| TypeError::invalid(value, self))
            }
            SqlType::Json => to_json(value).map(|j| (Value::Json(j), InRange)),
            SqlType::Tuple(types) => match value {
                Value::Tuple(values) if values.len() == types.len() => {
                    let mut range = InRange;
                    let mut out = Vec::with_capacity(values.len());
                    for (t, v) in types.iter().zip(values) {
                        let (converted, r) = t.convert(v)?;
                        range = range.and(r);
                        out.push(converted);
                    }
                    Ok((Value::Tuple(out), range))
                }
                other if types.len() == 1 => types[0].convert(other),
                other => Err(TypeError::UnsupportedConversion {
                    from: other.sql_type().to_string(),
                    to: self.to_string(),
                }),
            },
        }
    }
}

/// Longest prefix of `s` (after leading whitespace) that reads as a number,
/// as MySQL does when text is used in numeric context. Empty when there is
/// none.
pub fn numeric_prefix(s: &str) -> &str {
    let s = s.trim_start();
    let b = s.as_bytes();
    let digits = |mut i: usize| {
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if end < b.len() && (b[end] == b'+' || b[end] == b'-') {
        end += 1;
    }
    let int_end = digits(end);
    let mut has_digits = int_end > end;
    end = int_end;
    if end < b.len() && b[end] == b'.' {
        let frac_end = digits(end + 1);
        if has_digits || frac_end > end + 1 {
            has_digits = true;
            end = frac_end;
        }
    }
    if !has_digits {
        return "";
    }
    if end < b.len() && (b[end] == b'e' || b[end] == b'E') {
        let mut exp = end + 1;
        if exp < b.len() && (b[exp] == b'+' || b[exp] == b'-') {
            exp += 1;
        }
        let exp_end = digits(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    &s[..end]
}

/// Read the numeric prefix of `s` as a float. The flag is `false` when part
/// of the text was ignored, which callers report as a truncation.
pub fn parse_float_prefix(s: &str) -> (f64, bool) {
    let prefix = numeric_prefix(s);
    let complete = prefix.len() == s.trim().len();
    (prefix.parse().unwrap_or(0.0), complete)
}

impl Value {
    /// MySQL truthiness: NULL is unknown, numbers are true when non-zero,
    /// text is read through its numeric prefix.
    pub fn truthiness(&self) -> Option<bool> {
        match self {
            Value::Null => None,
            Value::Boolean(b) => Some(*b),
            Value::Text(s) => Some(parse_float_prefix(s).0 != 0.0),
            Value::Bytes(b) => Some(parse_float_prefix(&String::from_utf8_lossy(b)).0 != 0.0),
            Value::Datetime(t) => Some(datetime_to_number(t) != 0),
            Value::Json(serde_json::Value::Bool(b)) => Some(*b),
            Value::Json(serde_json::Value::Number(n)) => Some(n.as_f64() != Some(0.0)),
            Value::Json(serde_json::Value::Null) => Some(false),
            Value::Json(_) => Some(true),
            Value::Tuple(_) => None,
            other => to_f64(other, &SqlType::Float64).ok().map(|f| f != 0.0),
        }
    }
}

fn narrow_signed(
    value: &Value,
    target: &SqlType,
    min: i64,
    max: i64,
) -> TypeResult<(i64, ConvertInRange)> {
    let (i, r) = to_i64(value, target)?;
    if i < min {
        Ok((min, OutOfRange))
    } else if i > max {
        Ok((max, OutOfRange))
    } else {
        Ok((i, r))
    }
}

fn narrow_unsigned(value: &Value, target: &SqlType, max: u64) -> TypeResult<(u64, ConvertInRange)> {
    let (u, r) = to_u64(value, target)?;
    if r == OutOfRange && u > i64::MAX as u64 {
        // wrapped negative
        return Ok((0, OutOfRange));
    }
    if u > max {
        Ok((max, OutOfRange))
    } else {
        Ok((u, r))
    }
}

fn saturate_f64_to_i64(
    f: f64,
    value: &Value,
    target: &SqlType,
) -> TypeResult<(i64, ConvertInRange)> {
    if f.is_nan() {
        return Err(TypeError::invalid(value, target));
    }
    let rounded = f.round();
    if rounded >= i64::MAX as f64 {
        Ok((i64::MAX, if rounded > i64::MAX as f64 { OutOfRange } else { InRange }))
    } else if rounded < i64::MIN as f64 {
        Ok((i64::MIN, OutOfRange))
    } else {
        Ok((rounded as i64, InRange))
    }
}

fn round_decimal(d: &Decimal) -> Decimal {
    round_to_scale(d, 0)
}

/// Big-endian unsigned integer read from up to eight bytes.
fn bytes_to_u64(b: &[u8], value: &Value, target: &SqlType) -> TypeResult<u64> {
    if b.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(&hex::encode(b), 16).map_err(|_| TypeError::invalid(value, target))
}

fn to_i64(value: &Value, target: &SqlType) -> TypeResult<(i64, ConvertInRange)> {
    match value {
        Value::Null => Ok((0, InRange)),
        Value::Boolean(b) => Ok((*b as i64, InRange)),
        Value::Int8(v) => Ok((*v as i64, InRange)),
        Value::Int16(v) => Ok((*v as i64, InRange)),
        Value::Int32(v) => Ok((*v as i64, InRange)),
        Value::Int64(v) => Ok((*v, InRange)),
        Value::Uint8(v) => Ok((*v as i64, InRange)),
        Value::Uint16(v) => Ok((*v as i64, InRange)),
        Value::Uint32(v) => Ok((*v as i64, InRange)),
        Value::Uint64(v) | Value::Set(v) => match i64::try_from(*v) {
            Ok(i) => Ok((i, InRange)),
            Err(_) => Ok((i64::MAX, OutOfRange)),
        },
        Value::Enum(v) => Ok((*v as i64, InRange)),
        Value::Float32(f) => saturate_f64_to_i64(*f as f64, value, target),
        Value::Float64(f) => saturate_f64_to_i64(*f, value, target),
        Value::Decimal(d) => match round_decimal(d).to_i64() {
            Some(i) => Ok((i, InRange)),
            None if d.is_negative() => Ok((i64::MIN, OutOfRange)),
            None => Ok((i64::MAX, OutOfRange)),
        },
        Value::Text(s) => text_to_i64(s, target),
        Value::Bytes(b) => Ok((bytes_to_u64(b, value, target)? as i64, InRange)),
        Value::Datetime(t) => Ok((datetime_to_number(t), InRange)),
        Value::Time(t) => Ok((t.to_number(), InRange)),
        Value::Json(serde_json::Value::Bool(b)) => Ok((*b as i64, InRange)),
        Value::Json(serde_json::Value::Number(n)) => match n.as_i64() {
            Some(i) => Ok((i, InRange)),
            None => saturate_f64_to_i64(n.as_f64().unwrap_or(f64::NAN), value, target),
        },
        Value::Json(serde_json::Value::String(s)) => text_to_i64(s, target),
        Value::Json(_) | Value::Tuple(_) => Err(TypeError::invalid(value, target)),
    }
}

fn text_to_i64(s: &str, target: &SqlType) -> TypeResult<(i64, ConvertInRange)> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Ok((i, InRange));
    }
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() => {
            let truncated = f.trunc();
            if truncated >= i64::MAX as f64 {
                Ok((i64::MAX, OutOfRange))
            } else if truncated < i64::MIN as f64 {
                Ok((i64::MIN, OutOfRange))
            } else {
                Ok((truncated as i64, InRange))
            }
        }
        _ => Err(TypeError::invalid(s, target)),
    }
}

fn to_u64(value: &Value, target: &SqlType) -> TypeResult<(u64, ConvertInRange)> {
    let from_signed = |i: i64| {
        if i < 0 {
            (i as u64, OutOfRange)
        } else {
            (i as u64, InRange)
        }
    };
    match value {
        Value::Null => Ok((0, InRange)),
        Value::Boolean(b) => Ok((*b as u64, InRange)),
        Value::Int8(v) => Ok(from_signed(*v as i64)),
        Value::Int16(v) => Ok(from_signed(*v as i64)),
        Value::Int32(v) => Ok(from_signed(*v as i64)),
        Value::Int64(v) => Ok(from_signed(*v)),
        Value::Uint8(v) => Ok((*v as u64, InRange)),
        Value::Uint16(v) => Ok((*v as u64, InRange)),
        Value::Uint32(v) => Ok((*v as u64, InRange)),
        Value::Uint64(v) | Value::Set(v) => Ok((*v, InRange)),
        Value::Enum(v) => Ok((*v as u64, InRange)),
        Value::Float32(f) => float_to_u64(*f as f64, value, target),
        Value::Float64(f) => float_to_u64(*f, value, target),
        Value::Decimal(d) => {
            let rounded = round_decimal(d);
            match rounded.to_u64() {
                Some(u) => Ok((u, InRange)),
                None if rounded.is_negative() => match rounded.to_i64() {
                    Some(i) => Ok(from_signed(i)),
                    None => Ok((i64::MIN as u64, OutOfRange)),
                },
                None => Ok((u64::MAX, OutOfRange)),
            }
        }
        Value::Text(s) => text_to_u64(s, target),
        Value::Json(serde_json::Value::String(s)) => text_to_u64(s, target),
        Value::Bytes(b) => Ok((bytes_to_u64(b, value, target)?, InRange)),
        Value::Json(serde_json::Value::Number(n)) => match n.as_u64() {
            Some(u) => Ok((u, InRange)),
            None => match n.as_i64() {
                Some(i) => Ok(from_signed(i)),
                None => float_to_u64(n.as_f64().unwrap_or(f64::NAN), value, target),
            },
        },
        other => {
            let (i, r) = to_i64(other, target)?;
            let (u, wrapped) = from_signed(i);
            Ok((u, r.and(wrapped)))
        }
    }
}

fn text_to_u64(s: &str, target: &SqlType) -> TypeResult<(u64, ConvertInRange)> {
    let trimmed = s.trim();
    if let Ok(u) = trimmed.parse::<u64>() {
        return Ok((u, InRange));
    }
    let (i, _) = text_to_i64(trimmed, target)?;
    Ok((i as u64, if i < 0 { OutOfRange } else { InRange }))
}

fn float_to_u64(f: f64, value: &Value, target: &SqlType) -> TypeResult<(u64, ConvertInRange)> {
    if f.is_nan() {
        return Err(TypeError::invalid(value, target));
    }
    let rounded = f.round();
    if rounded < 0.0 {
        let (i, _) = saturate_f64_to_i64(rounded, value, target)?;
        Ok((i as u64, OutOfRange))
    } else if rounded >= u64::MAX as f64 {
        Ok((u64::MAX, if rounded > u64::MAX as f64 { OutOfRange } else { InRange }))
    } else {
        Ok((rounded as u64, InRange))
    }
}

pub(crate) fn to_f64(value: &Value, target: &SqlType) -> TypeResult<f64> {
    match value {
        Value::Null => Ok(0.0),
        Value::Boolean(b) => Ok(*b as i64 as f64),
        Value::Int8(v) => Ok(*v as f64),
        Value::Int16(v) => Ok(*v as f64),
        Value::Int32(v) => Ok(*v as f64),
        Value::Int64(v) => Ok(*v as f64),
        Value::Uint8(v) => Ok(*v as f64),
        Value::Uint16(v) => Ok(*v as f64),
        Value::Uint32(v) => Ok(*v as f64),
        Value::Uint64(v) | Value::Set(v) => Ok(*v as f64),
        Value::Enum(v) => Ok(*v as f64),
        Value::Float32(f) => Ok(*f as f64),
        Value::Float64(f) => Ok(*f),
        Value::Decimal(d) => d
            .to_f64()
            .ok_or_else(|| TypeError::invalid(format_decimal(d), target)),
        Value::Text(s) => text_to_f64(s, target),
        Value::Json(serde_json::Value::String(s)) => text_to_f64(s, target),
        Value::Bytes(b) => match std::str::from_utf8(b) {
            Ok(s) if s.trim().parse::<f64>().is_ok() => text_to_f64(s, target),
            _ => Ok(bytes_to_u64(b, value, target)? as f64),
        },
        Value::Datetime(t) => {
            let micros = t.nanosecond() / 1_000;
            Ok(datetime_to_number(t) as f64 + micros as f64 / 1e6)
        }
        Value::Time(t) => Ok(t.to_number() as f64),
        Value::Json(serde_json::Value::Bool(b)) => Ok(*b as i64 as f64),
        Value::Json(serde_json::Value::Number(n)) => {
            n.as_f64().ok_or_else(|| TypeError::invalid(n, target))
        }
        Value::Json(_) | Value::Tuple(_) => Err(TypeError::invalid(value, target)),
    }
}

fn text_to_f64(s: &str, target: &SqlType) -> TypeResult<f64> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .ok_or_else(|| TypeError::invalid(s, target))
}

pub(crate) fn to_decimal(value: &Value, target: &SqlType) -> TypeResult<Decimal> {
    match value {
        Value::Null => Ok(Decimal::from(0i64)),
        Value::Boolean(b) => Ok(Decimal::from(*b as i64)),
        Value::Int8(v) => Ok(Decimal::from(*v)),
        Value::Int16(v) => Ok(Decimal::from(*v)),
        Value::Int32(v) => Ok(Decimal::from(*v)),
        Value::Int64(v) => Ok(Decimal::from(*v)),
        Value::Uint8(v) => Ok(Decimal::from(*v)),
        Value::Uint16(v) => Ok(Decimal::from(*v)),
        Value::Uint32(v) => Ok(Decimal::from(*v)),
        Value::Uint64(v) | Value::Set(v) => Ok(Decimal::from(*v)),
        Value::Enum(v) => Ok(Decimal::from(*v)),
        Value::Float32(f) => {
            decimal_from_f64(*f as f64).ok_or_else(|| TypeError::invalid(f, target))
        }
        Value::Float64(f) => decimal_from_f64(*f).ok_or_else(|| TypeError::invalid(f, target)),
        Value::Decimal(d) => Ok(d.clone()),
        Value::Text(s) | Value::Json(serde_json::Value::String(s)) => {
            parse_decimal(s).ok_or_else(|| TypeError::invalid(s, target))
        }
        Value::Bytes(b) => {
            let s = String::from_utf8_lossy(b);
            parse_decimal(&s).ok_or_else(|| TypeError::invalid(&s, target))
        }
        Value::Datetime(t) => Ok(Decimal::from(datetime_to_number(t))),
        Value::Time(t) => Ok(Decimal::from(t.to_number())),
        Value::Json(serde_json::Value::Bool(b)) => Ok(Decimal::from(*b as i64)),
        Value::Json(serde_json::Value::Number(n)) => {
            parse_decimal(&n.to_string()).ok_or_else(|| TypeError::invalid(n, target))
        }
        Value::Json(_) | Value::Tuple(_) => Err(TypeError::invalid(value, target)),
    }
}

fn to_year(value: &Value, target: &SqlType) -> TypeResult<i16> {
    if let Value::Datetime(t) = value {
        return Ok(chrono::Datelike::year(t) as i16);
    }
    let (y, _) = to_i64(value, target)?;
    match y {
        0 => Ok(0),
        1..=69 => Ok(2000 + y as i16),
        70..=99 => Ok(1900 + y as i16),
        1901..=2155 => Ok(y as i16),
        _ => Err(TypeError::out_of_range(y, target)),
    }
}

/// Convert a value into a datetime. Only text, binary and time values carry
/// a date; numeric zero is the zero datetime.
pub(crate) fn to_datetime(value: &Value) -> TypeResult<NaiveDateTime> {
    match value {
        Value::Datetime(t) => Ok(*t),
        Value::Text(s) | Value::Json(serde_json::Value::String(s)) => parse_datetime(s),
        Value::Bytes(b) => parse_datetime(&String::from_utf8_lossy(b)),
        Value::Time(t) => {
            let midnight = Utc::now().date_naive().and_time(NaiveTime::MIN);
            midnight
                .checked_add_signed(Duration::microseconds(t.micros()))
                .ok_or_else(|| TypeError::InvalidDatetime(t.to_string()))
        }
        other => match to_f64(other, &SqlType::Datetime) {
            Ok(f) if f == 0.0 => Ok(zero_datetime()),
            _ => Err(TypeError::InvalidDatetime(other.to_string())),
        },
    }
}

fn to_timespan(value: &Value) -> TypeResult<Timespan> {
    match value {
        Value::Time(t) => Ok(*t),
        Value::Text(s) | Value::Json(serde_json::Value::String(s)) => Timespan::parse(s),
        Value::Bytes(b) => Timespan::parse(&String::from_utf8_lossy(b)),
        Value::Datetime(t) => Ok(Timespan::from_time_of_day(&t.time())),
        Value::Float32(_) | Value::Float64(_) | Value::Decimal(_) => {
            let d = to_decimal(value, &SqlType::Time)?;
            let total = truncate_to_scale(&(&d * Decimal::from(1_000_000i64)), 0)
                .to_i64()
                .ok_or_else(|| TypeError::invalid(format_decimal(&d), "time"))?;
            let base = Timespan::from_number(total / 1_000_000)?;
            Ok(Timespan(base.micros() + total % 1_000_000))
        }
        other => {
            let (n, _) = to_i64(other, &SqlType::Time)?;
            Timespan::from_number(n)
        }
    }
}

/// MySQL text rendering of a value.
pub(crate) fn to_text(value: &Value) -> String {
    match value {
        Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        other => other.to_string(),
    }
}

fn to_bytes(value: &Value) -> Vec<u8> {
    match value {
        Value::Bytes(b) => b.clone(),
        other => to_text(other).into_bytes(),
    }
}

fn to_json(value: &Value) -> TypeResult<serde_json::Value> {
    use serde_json::Value as Json;
    Ok(match value {
        Value::Null => Json::Null,
        Value::Json(j) => j.clone(),
        Value::Text(s) => {
            serde_json::from_str(s).map_err(|e| TypeError::InvalidJson(e.to_string()))?
        }
        Value::Bytes(b) => {
            serde_json::from_slice(b).map_err(|e| TypeError::InvalidJson(e.to_string()))?
        }
        Value::Boolean(b) => Json::Bool(*b),
        Value::Int8(_) | Value::Int16(_) | Value::Int32(_) | Value::Int64(_) => {
            let (i, _) = to_i64(value, &SqlType::Json)?;
            Json::from(i)
        }
        Value::Uint8(_) | Value::Uint16(_) | Value::Uint32(_) | Value::Uint64(_) => {
            let (u, _) = to_u64(value, &SqlType::Json)?;
            Json::from(u)
        }
        Value::Float32(_) | Value::Float64(_) => {
            let f = to_f64(value, &SqlType::Json)?;
            serde_json::Number::from_f64(f)
                .map(Json::Number)
                .ok_or_else(|| TypeError::invalid(f, "json"))?
        }
        Value::Decimal(d) => {
            serde_json::from_str(&format_decimal(d))
                .map_err(|e| TypeError::InvalidJson(e.to_string()))?
        }
        Value::Tuple(values) => {
            let items = values.iter().map(to_json).collect::<TypeResult<Vec<_>>>()?;
            Json::Array(items)
        }
        other => Json::String(other.to_string()),
    })
}
