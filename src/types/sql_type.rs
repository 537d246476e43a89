//! Semantic SQL types.

use crate::types::collation::Collation;
use crate::types::datetime::{zero_datetime, Timespan};
use crate::types::decimal::{Decimal, DecimalType};
use crate::types::value::Value;
use std::fmt;
use std::sync::Arc;

/// Storage class of a text or binary type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringKind {
    Char,
    Varchar,
    Text,
    LongText,
    Binary,
    VarBinary,
    Blob,
    LongBlob,
}

/// Text or binary string type: kind, declared length in characters and
/// collation (`Binary` for binary strings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StringType {
    pub kind: StringKind,
    pub length: u32,
    pub collation: Collation,
}

impl StringType {
    pub const LONG_LENGTH: u32 = u32::MAX;

    pub fn new(kind: StringKind, length: u32, collation: Collation) -> Self {
        Self {
            kind,
            length,
            collation,
        }
    }

    /// Whether values shorter than `length` are padded (CHAR/BINARY).
    pub fn is_fixed(&self) -> bool {
        matches!(self.kind, StringKind::Char | StringKind::Binary)
    }
}

/// ENUM('a', 'b', ...). Values are stored by 1-based index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumType {
    values: Arc<[String]>,
    pub collation: Collation,
}

impl EnumType {
    pub fn new(values: Vec<String>, collation: Collation) -> Self {
        Self {
            values: values.into(),
            collation,
        }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// 1-based index of `s`, honouring the collation.
    pub fn index_of(&self, s: &str) -> Option<u16> {
        self.values
            .iter()
            .position(|v| self.collation.compare(v, s).is_eq())
            .map(|i| (i + 1) as u16)
    }

    /// Member at a 1-based index; index 0 is the empty error value.
    pub fn at(&self, index: u16) -> Option<&str> {
        if index == 0 {
            return Some("");
        }
        self.values.get(index as usize - 1).map(String::as_str)
    }
}

/// SET('a', 'b', ...). Values are stored as a bitmask.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SetType {
    values: Arc<[String]>,
    pub collation: Collation,
}

impl SetType {
    pub fn new(values: Vec<String>, collation: Collation) -> Self {
        Self {
            values: values.into(),
            collation,
        }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Bitmask for a comma separated member list.
    pub fn bits_of(&self, s: &str) -> Option<u64> {
        let mut bits = 0u64;
        for member in s.split(',').filter(|m| !m.is_empty()) {
            let pos = self
                .values
                .iter()
                .position(|v| self.collation.compare(v, member).is_eq())?;
            bits |= 1 << pos;
        }
        Some(bits)
    }

    /// Comma separated member list for a bitmask.
    pub fn members_of(&self, bits: u64) -> String {
        self.values
            .iter()
            .enumerate()
            .filter(|(i, _)| *i < 64 && bits & (1 << i) != 0)
            .map(|(_, v)| v.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn max_bits(&self) -> u64 {
        if self.values.len() >= 64 {
            u64::MAX
        } else {
            (1u64 << self.values.len()) - 1
        }
    }
}

/// A semantic SQL type descriptor. Immutable and cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SqlType {
    Null,
    Boolean,
    Int8,
    Int16,
    Int24,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint24,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Decimal(DecimalType),
    Year,
    Date,
    Datetime,
    Timestamp,
    Time,
    Text(StringType),
    Binary(StringType),
    Enum(EnumType),
    Set(SetType),
    Json,
    Tuple(Vec<SqlType>),
    /// Type of an unbound placeholder; known only once the plan is bound.
    Deferred,
}

impl SqlType {
    pub fn decimal(precision: u32, scale: u32) -> Self {
        SqlType::Decimal(DecimalType::clamped(precision, scale))
    }

    pub fn varchar(length: u32) -> Self {
        SqlType::Text(StringType::new(
            StringKind::Varchar,
            length,
            Collation::default(),
        ))
    }

    pub fn long_text() -> Self {
        Self::long_text_with(Collation::default())
    }

    pub fn long_text_with(collation: Collation) -> Self {
        SqlType::Text(StringType::new(
            StringKind::LongText,
            StringType::LONG_LENGTH,
            collation,
        ))
    }

    pub fn varbinary(length: u32) -> Self {
        SqlType::Binary(StringType::new(
            StringKind::VarBinary,
            length,
            Collation::Binary,
        ))
    }

    pub fn long_blob() -> Self {
        SqlType::Binary(StringType::new(
            StringKind::LongBlob,
            StringType::LONG_LENGTH,
            Collation::Binary,
        ))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlType::Null)
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, SqlType::Deferred)
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            SqlType::Boolean
                | SqlType::Int8
                | SqlType::Int16
                | SqlType::Int24
                | SqlType::Int32
                | SqlType::Int64
        )
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            SqlType::Uint8 | SqlType::Uint16 | SqlType::Uint24 | SqlType::Uint32 | SqlType::Uint64
        )
    }

    pub fn is_integer(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, SqlType::Float32 | SqlType::Float64)
    }

    pub fn is_decimal(&self) -> bool {
        matches!(self, SqlType::Decimal(_))
    }

    pub fn is_number(&self) -> bool {
        self.is_integer() || self.is_float() || self.is_decimal()
    }

    /// Text, binary, enum and set types.
    pub fn is_text(&self) -> bool {
        self.is_text_only() || self.is_binary() || self.is_enum() || self.is_set()
    }

    /// Text types with a character set (not binary strings).
    pub fn is_text_only(&self) -> bool {
        matches!(self, SqlType::Text(_))
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, SqlType::Binary(_))
    }

    pub fn is_enum(&self) -> bool {
        matches!(self, SqlType::Enum(_))
    }

    pub fn is_set(&self) -> bool {
        matches!(self, SqlType::Set(_))
    }

    /// Date, datetime and timestamp. TIME is a duration and is not included.
    pub fn is_time(&self) -> bool {
        matches!(self, SqlType::Date | SqlType::Datetime | SqlType::Timestamp)
    }

    pub fn is_json(&self) -> bool {
        matches!(self, SqlType::Json)
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self, SqlType::Tuple(_))
    }

    /// Collation of text-like types.
    pub fn collation(&self) -> Option<Collation> {
        match self {
            SqlType::Text(s) | SqlType::Binary(s) => Some(s.collation),
            SqlType::Enum(e) => Some(e.collation),
            SqlType::Set(s) => Some(s.collation),
            _ => None,
        }
    }

    /// The same text type under `collation`. Types without a character set
    /// become LONGTEXT; binary strings have only the binary collation.
    pub fn with_collation(&self, collation: Collation) -> SqlType {
        match self {
            SqlType::Text(s) => SqlType::Text(StringType { collation, ..*s }),
            SqlType::Enum(e) => SqlType::Enum(EnumType {
                collation,
                ..e.clone()
            }),
            SqlType::Set(s) => SqlType::Set(SetType {
                collation,
                ..s.clone()
            }),
            SqlType::Binary(_) | SqlType::Deferred => self.clone(),
            _ => SqlType::long_text_with(collation),
        }
    }

    /// Number of columns a value of this type spans.
    pub fn num_columns(&self) -> usize {
        match self {
            SqlType::Tuple(types) => types.len(),
            _ => 1,
        }
    }

    /// Widest type of the same family.
    pub fn promote(&self) -> SqlType {
        match self {
            t if t.is_signed() => SqlType::Int64,
            t if t.is_unsigned() => SqlType::Uint64,
            SqlType::Float32 | SqlType::Float64 => SqlType::Float64,
            SqlType::Decimal(_) => SqlType::Decimal(DecimalType::max()),
            SqlType::Text(s) => SqlType::long_text_with(s.collation),
            SqlType::Binary(_) => SqlType::long_blob(),
            SqlType::Date | SqlType::Datetime | SqlType::Timestamp => SqlType::Datetime,
            other => other.clone(),
        }
    }

    /// Zero value of this type.
    pub fn zero(&self) -> Value {
        match self {
            SqlType::Null | SqlType::Deferred => Value::Null,
            SqlType::Boolean => Value::Boolean(false),
            SqlType::Int8 => Value::Int8(0),
            SqlType::Int16 | SqlType::Year => Value::Int16(0),
            SqlType::Int24 | SqlType::Int32 => Value::Int32(0),
            SqlType::Int64 => Value::Int64(0),
            SqlType::Uint8 => Value::Uint8(0),
            SqlType::Uint16 => Value::Uint16(0),
            SqlType::Uint24 | SqlType::Uint32 => Value::Uint32(0),
            SqlType::Uint64 => Value::Uint64(0),
            SqlType::Float32 => Value::Float32(0.0),
            SqlType::Float64 => Value::Float64(0.0),
            SqlType::Decimal(d) => Value::Decimal(Decimal::new(0.into(), d.scale() as i64)),
            SqlType::Date | SqlType::Datetime | SqlType::Timestamp => {
                Value::Datetime(zero_datetime())
            }
            SqlType::Time => Value::Time(Timespan(0)),
            SqlType::Text(_) => Value::Text(String::new()),
            SqlType::Binary(_) => Value::Bytes(Vec::new()),
            SqlType::Enum(e) => Value::Enum(if e.values().is_empty() { 0 } else { 1 }),
            SqlType::Set(_) => Value::Set(0),
            SqlType::Json => Value::Json(serde_json::Value::Null),
            SqlType::Tuple(types) => Value::Tuple(types.iter().map(SqlType::zero).collect()),
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Null => f.write_str("null"),
            SqlType::Boolean => f.write_str("tinyint(1)"),
            SqlType::Int8 => f.write_str("tinyint"),
            SqlType::Int16 => f.write_str("smallint"),
            SqlType::Int24 => f.write_str("mediumint"),
            SqlType::Int32 => f.write_str("int"),
            SqlType::Int64 => f.write_str("bigint"),
            SqlType::Uint8 => f.write_str("tinyint unsigned"),
            SqlType::Uint16 => f.write_str("smallint unsigned"),
            SqlType::Uint24 => f.write_str("mediumint unsigned"),
            SqlType::Uint32 => f.write_str("int unsigned"),
            SqlType::Uint64 => f.write_str("bigint unsigned"),
            SqlType::Float32 => f.write_str("float"),
            SqlType::Float64 => f.write_str("double"),
            SqlType::Decimal(d) => write!(f, "{}", d),
            SqlType::Year => f.write_str("year"),
            SqlType::Date => f.write_str("date"),
            SqlType::Datetime => f.write_str("datetime"),
            SqlType::Timestamp => f.write_str("timestamp"),
            SqlType::Time => f.write_str("time"),
            SqlType::Text(s) | SqlType::Binary(s) => match s.kind {
                StringKind::Char => write!(f, "char({})", s.length),
                StringKind::Varchar => write!(f, "varchar({})", s.length),
                StringKind::Text => f.write_str("text"),
                StringKind::LongText => f.write_str("longtext"),
                StringKind::Binary => write!(f, "binary({})", s.length),
                StringKind::VarBinary => write!(f, "varbinary({})", s.length),
                StringKind::Blob => f.write_str("blob"),
                StringKind::LongBlob => f.write_str("longblob"),
            },
            SqlType::Enum(e) => write!(f, "enum({})", quoted_list(e.values())),
            SqlType::Set(s) => write!(f, "set({})", quoted_list(s.values())),
            SqlType::Json => f.write_str("json"),
            SqlType::Tuple(types) => {
                let parts: Vec<String> = types.iter().map(|t| t.to_string()).collect();
                write!(f, "tuple({})", parts.join(", "))
            }
            SqlType::Deferred => f.write_str("deferred"),
        }
    }
}

fn quoted_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("'{}'", v.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        assert!(SqlType::Int32.is_signed());
        assert!(SqlType::Boolean.is_integer());
        assert!(SqlType::Uint8.is_unsigned());
        assert!(!SqlType::Uint8.is_signed());
        assert!(SqlType::Float32.is_number());
        assert!(SqlType::decimal(10, 2).is_decimal());
        assert!(SqlType::long_text().is_text());
        assert!(SqlType::long_blob().is_text());
        assert!(!SqlType::long_blob().is_text_only());
        assert!(SqlType::Datetime.is_time());
        assert!(!SqlType::Time.is_time());
        assert!(!SqlType::long_text().is_number());
    }

    #[test]
    fn test_promote() {
        assert_eq!(SqlType::Int8.promote(), SqlType::Int64);
        assert_eq!(SqlType::Uint24.promote(), SqlType::Uint64);
        assert_eq!(SqlType::Float32.promote(), SqlType::Float64);
        assert_eq!(SqlType::decimal(5, 1).promote(), SqlType::decimal(65, 30));
        assert_eq!(SqlType::varchar(10).promote(), SqlType::long_text());
        assert_eq!(SqlType::Date.promote(), SqlType::Datetime);
    }

    #[test]
    fn test_display() {
        assert_eq!(SqlType::Int64.to_string(), "bigint");
        assert_eq!(SqlType::Uint64.to_string(), "bigint unsigned");
        assert_eq!(SqlType::decimal(10, 2).to_string(), "decimal(10,2)");
        assert_eq!(SqlType::varchar(20).to_string(), "varchar(20)");
        let e = SqlType::Enum(EnumType::new(
            vec!["a".into(), "b".into()],
            Collation::default(),
        ));
        assert_eq!(e.to_string(), "enum('a','b')");
    }

    #[test]
    fn test_with_collation() {
        let bin = SqlType::varchar(10).with_collation(Collation::Utf8mb4_bin);
        assert_eq!(bin.collation(), Some(Collation::Utf8mb4_bin));
        let SqlType::Text(s) = bin else {
            panic!("expected text, got {:?}", bin);
        };
        assert_eq!((s.kind, s.length), (StringKind::Varchar, 10));

        assert_eq!(
            SqlType::Int64.with_collation(Collation::Utf8mb4_bin),
            SqlType::long_text_with(Collation::Utf8mb4_bin)
        );
        assert_eq!(
            SqlType::long_blob().with_collation(Collation::Utf8mb4_bin),
            SqlType::long_blob()
        );
        assert_eq!(
            SqlType::Deferred.with_collation(Collation::Latin1_bin),
            SqlType::Deferred
        );
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(SqlType::Int64.zero(), Value::Int64(0));
        assert_eq!(SqlType::decimal(10, 2).zero().to_string(), "0.00");
        assert_eq!(SqlType::long_text().zero(), Value::Text(String::new()));
        assert_eq!(
            SqlType::Tuple(vec![SqlType::Int8, SqlType::Float64]).zero(),
            Value::Tuple(vec![Value::Int8(0), Value::Float64(0.0)])
        );
    }

    #[test]
    fn test_enum_and_set_lookup() {
        let e = EnumType::new(vec!["small".into(), "large".into()], Collation::default());
        assert_eq!(e.index_of("LARGE"), Some(2));
        assert_eq!(e.index_of("medium"), None);
        assert_eq!(e.at(1), Some("small"));

        let s = SetType::new(vec!["a".into(), "b".into(), "c".into()], Collation::default());
        assert_eq!(s.bits_of("a,c"), Some(0b101));
        assert_eq!(s.members_of(0b011), "a,b");
        assert_eq!(s.bits_of("d"), None);
        assert_eq!(s.max_bits(), 0b111);
    }
}
