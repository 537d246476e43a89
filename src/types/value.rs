//! Runtime values.

use crate::types::collation::Collation;
use crate::types::datetime::{format_datetime, is_zero_datetime, Timespan};
use crate::types::decimal::{format_decimal, normalized_string, precision_and_scale, Decimal};
use crate::types::sql_type::SqlType;
use bytes::{BufMut, Bytes, BytesMut};
use chrono::NaiveDateTime;
use std::fmt;

/// A row is a slice of values, one per column.
pub type Row = Vec<Value>;

/// Values produced by evaluating expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    /// DATE, DATETIME and TIMESTAMP values.
    Datetime(NaiveDateTime),
    Time(Timespan),
    /// 1-based ENUM index.
    Enum(u16),
    /// SET bitmask.
    Set(u64),
    Json(serde_json::Value),
    Tuple(Vec<Value>),
}

// Hash key tags. Values are normalised to a common type before hashing, so
// the tag only separates families.
const TAG_NULL: u8 = 0;
const TAG_INT: u8 = 1;
const TAG_UINT: u8 = 2;
const TAG_FLOAT: u8 = 3;
const TAG_DECIMAL: u8 = 4;
const TAG_TEXT: u8 = 5;
const TAG_BYTES: u8 = 6;
const TAG_DATETIME: u8 = 7;
const TAG_TIME: u8 = 8;
const TAG_JSON: u8 = 9;
const TAG_TUPLE: u8 = 10;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// NULL itself, or a row value with a NULL at any depth.
    pub fn contains_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Tuple(values) => values.iter().any(Value::contains_null),
            _ => false,
        }
    }

    /// Approximate type of a value seen without a column definition.
    pub fn sql_type(&self) -> SqlType {
        match self {
            Value::Null => SqlType::Null,
            Value::Boolean(_) => SqlType::Boolean,
            Value::Int8(_) => SqlType::Int8,
            Value::Int16(_) => SqlType::Int16,
            Value::Int32(_) => SqlType::Int32,
            Value::Int64(_) => SqlType::Int64,
            Value::Uint8(_) => SqlType::Uint8,
            Value::Uint16(_) => SqlType::Uint16,
            Value::Uint32(_) => SqlType::Uint32,
            Value::Uint64(_) => SqlType::Uint64,
            Value::Float32(_) => SqlType::Float32,
            Value::Float64(_) => SqlType::Float64,
            Value::Decimal(d) => {
                let (precision, scale) = precision_and_scale(d);
                SqlType::decimal(precision, scale)
            }
            Value::Text(_) => SqlType::long_text(),
            Value::Bytes(_) => SqlType::long_blob(),
            Value::Datetime(_) => SqlType::Datetime,
            Value::Time(_) => SqlType::Time,
            Value::Enum(_) => SqlType::Uint16,
            Value::Set(_) => SqlType::Uint64,
            Value::Json(_) => SqlType::Json,
            Value::Tuple(values) => SqlType::Tuple(values.iter().map(Value::sql_type).collect()),
        }
    }

    /// Canonical byte encoding used for hash lookups.
    pub fn hash_key(&self) -> Bytes {
        self.hash_key_with(None)
    }

    /// Like [`Value::hash_key`], folding text through `collation` so that
    /// strings which compare equal hash equal.
    pub fn hash_key_with(&self, collation: Option<Collation>) -> Bytes {
        let mut buf = BytesMut::new();
        self.write_hash_key(&mut buf, collation);
        buf.freeze()
    }

    fn write_hash_key(&self, buf: &mut BytesMut, collation: Option<Collation>) {
        match self {
            Value::Null => buf.put_u8(TAG_NULL),
            Value::Boolean(b) => {
                buf.put_u8(TAG_INT);
                buf.put_i64(*b as i64);
            }
            Value::Int8(v) => put_int(buf, *v as i64),
            Value::Int16(v) => put_int(buf, *v as i64),
            Value::Int32(v) => put_int(buf, *v as i64),
            Value::Int64(v) => put_int(buf, *v),
            Value::Uint8(v) => put_uint(buf, *v as u64),
            Value::Uint16(v) => put_uint(buf, *v as u64),
            Value::Uint32(v) => put_uint(buf, *v as u64),
            Value::Uint64(v) | Value::Set(v) => put_uint(buf, *v),
            Value::Enum(v) => put_uint(buf, *v as u64),
            Value::Float32(f) => put_float(buf, *f as f64),
            Value::Float64(f) => put_float(buf, *f),
            Value::Decimal(d) => {
                buf.put_u8(TAG_DECIMAL);
                put_str(buf, &normalized_string(d));
            }
            Value::Text(s) => {
                buf.put_u8(TAG_TEXT);
                match collation {
                    Some(c) => put_str(buf, &c.sort_key(s)),
                    None => put_str(buf, s),
                }
            }
            Value::Bytes(b) => {
                buf.put_u8(TAG_BYTES);
                buf.put_u32(b.len() as u32);
                buf.put_slice(b);
            }
            Value::Datetime(t) => {
                buf.put_u8(TAG_DATETIME);
                put_str(buf, &format_datetime(t));
            }
            Value::Time(t) => {
                buf.put_u8(TAG_TIME);
                buf.put_i64(t.micros());
            }
            Value::Json(j) => {
                buf.put_u8(TAG_JSON);
                put_str(buf, &j.to_string());
            }
            Value::Tuple(values) => {
                buf.put_u8(TAG_TUPLE);
                buf.put_u32(values.len() as u32);
                for v in values {
                    v.write_hash_key(buf, collation);
                }
            }
        }
    }
}

fn put_int(buf: &mut BytesMut, v: i64) {
    buf.put_u8(TAG_INT);
    buf.put_i64(v);
}

fn put_uint(buf: &mut BytesMut, v: u64) {
    buf.put_u8(TAG_UINT);
    buf.put_u64(v);
}

fn put_float(buf: &mut BytesMut, f: f64) {
    buf.put_u8(TAG_FLOAT);
    // -0.0 and 0.0 compare equal
    let f = if f == 0.0 { 0.0 } else { f };
    buf.put_u64(f.to_bits());
}

fn put_str(buf: &mut BytesMut, s: &str) {
    buf.put_u32(s.len() as u32);
    buf.put_slice(s.as_bytes());
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Boolean(b) => f.write_str(if *b { "1" } else { "0" }),
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Uint8(v) => write!(f, "{}", v),
            Value::Uint16(v) => write!(f, "{}", v),
            Value::Uint32(v) => write!(f, "{}", v),
            Value::Uint64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Decimal(d) => f.write_str(&format_decimal(d)),
            Value::Text(s) => f.write_str(s),
            Value::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            Value::Datetime(t) => f.write_str(&format_datetime(t)),
            Value::Time(t) => write!(f, "{}", t),
            Value::Enum(i) => write!(f, "{}", i),
            Value::Set(bits) => write!(f, "{}", bits),
            Value::Json(serde_json::Value::String(s)) => f.write_str(s),
            Value::Json(j) => write!(f, "{}", j),
            Value::Tuple(values) => {
                let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
        }
    }
}

impl Value {
    /// Whether the value is the zero datetime; used by date conversions.
    pub fn is_zero_datetime(&self) -> bool {
        matches!(self, Value::Datetime(t) if is_zero_datetime(t))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
