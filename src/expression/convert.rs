//! `CONVERT(x, type)` / `CAST(x AS type)`.

use crate::expression::error::{ExpressionError, ExpressionResult};
use crate::expression::expr::{take_children, Expression, ExpressionOps};
use crate::session::Context;
use crate::types::convert::to_text;
use crate::types::decimal::round_to_scale;
use crate::types::{Collation, ConvertInRange, SqlType, Value};
use std::fmt;
use std::sync::OnceLock;

const DEFAULT_DECIMAL_PRECISION: u32 = 10;

/// Target of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertTarget {
    Binary,
    Char,
    Date,
    Datetime,
    Decimal,
    Float,
    Double,
    Json,
    Signed,
    Time,
    Unsigned,
    Year,
}

impl ConvertTarget {
    /// Parse a target tag, case-insensitively.
    pub fn parse(tag: &str) -> ExpressionResult<Self> {
        let normalized = tag.trim().to_ascii_lowercase();
        let target = match normalized.as_str() {
            "binary" => ConvertTarget::Binary,
            "char" | "nchar" => ConvertTarget::Char,
            "date" => ConvertTarget::Date,
            "datetime" => ConvertTarget::Datetime,
            "decimal" => ConvertTarget::Decimal,
            "float" => ConvertTarget::Float,
            "double" | "real" => ConvertTarget::Double,
            "json" => ConvertTarget::Json,
            "signed" | "signed integer" => ConvertTarget::Signed,
            "time" => ConvertTarget::Time,
            "unsigned" | "unsigned integer" => ConvertTarget::Unsigned,
            "year" => ConvertTarget::Year,
            _ => return Err(ExpressionError::InvalidConvertTarget(tag.to_string())),
        };
        Ok(target)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConvertTarget::Binary => "binary",
            ConvertTarget::Char => "char",
            ConvertTarget::Date => "date",
            ConvertTarget::Datetime => "datetime",
            ConvertTarget::Decimal => "decimal",
            ConvertTarget::Float => "float",
            ConvertTarget::Double => "double",
            ConvertTarget::Json => "json",
            ConvertTarget::Signed => "signed",
            ConvertTarget::Time => "time",
            ConvertTarget::Unsigned => "unsigned",
            ConvertTarget::Year => "year",
        }
    }
}

impl fmt::Display for ConvertTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn decimal_type(length: Option<u32>, scale: Option<u32>) -> SqlType {
    SqlType::decimal(
        length.unwrap_or(DEFAULT_DECIMAL_PRECISION),
        scale.unwrap_or(0),
    )
}

fn target_type(target: ConvertTarget, length: Option<u32>, scale: Option<u32>) -> SqlType {
    match target {
        ConvertTarget::Binary => SqlType::long_blob(),
        ConvertTarget::Char => SqlType::long_text(),
        ConvertTarget::Date => SqlType::Date,
        ConvertTarget::Datetime => SqlType::Datetime,
        ConvertTarget::Decimal => decimal_type(length, scale),
        ConvertTarget::Float => SqlType::Float32,
        ConvertTarget::Double => SqlType::Float64,
        ConvertTarget::Json => SqlType::Json,
        ConvertTarget::Signed => SqlType::Int64,
        ConvertTarget::Time => SqlType::Time,
        ConvertTarget::Unsigned => SqlType::Uint64,
        ConvertTarget::Year => SqlType::Year,
    }
}

/// Conversion parameters shared by the node and [`convert_value`].
struct Cast<'a> {
    target: ConvertTarget,
    length: Option<u32>,
    scale: Option<u32>,
    typ: &'a SqlType,
    /// Collation text sources are encoded with for `binary`.
    source_collation: Collation,
}

impl Cast<'_> {
    fn apply(&self, ctx: &Context, value: Value) -> ExpressionResult<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match self.target {
            ConvertTarget::Binary => {
                let mut bytes = match value {
                    Value::Text(s) => self.source_collation.character_set().encode(&s),
                    Value::Bytes(b) => b,
                    other => to_text(&other).into_bytes(),
                };
                if let Some(length) = self.length {
                    bytes.truncate(length as usize);
                }
                Ok(Value::Bytes(bytes))
            }
            ConvertTarget::Char => {
                let text = to_text(&value);
                Ok(Value::Text(match self.length {
                    Some(length) => text.chars().take(length as usize).collect(),
                    None => text,
                }))
            }
            ConvertTarget::Date | ConvertTarget::Datetime => match value {
                Value::Text(_) | Value::Bytes(_) | Value::Time(_) | Value::Datetime(_) => {
                    match self.typ.convert(&value) {
                        Ok((converted, _)) => Ok(converted),
                        Err(_) => {
                            ctx.warn_truncated(self.typ, &value);
                            Ok(Value::Null)
                        }
                    }
                }
                _ => Ok(Value::Null),
            },
            ConvertTarget::Decimal => {
                let scale = self.scale.unwrap_or(0);
                match self.typ.convert(&value) {
                    Ok((Value::Decimal(d), _)) => Ok(Value::Decimal(round_to_scale(&d, scale))),
                    _ => Ok(self.typ.zero()),
                }
            }
            ConvertTarget::Float
            | ConvertTarget::Double
            | ConvertTarget::Signed => Ok(self
                .typ
                .convert(&value)
                .map(|(v, _)| v)
                .unwrap_or_else(|_| self.typ.zero())),
            ConvertTarget::Unsigned => {
                if let Ok((unsigned, ConvertInRange::InRange)) = SqlType::Uint64.convert(&value) {
                    return Ok(unsigned);
                }
                Ok(match SqlType::Int64.convert(&value) {
                    Ok((Value::Int64(i), _)) => Value::Uint64(i as u64),
                    _ => Value::Uint64(0),
                })
            }
            ConvertTarget::Time | ConvertTarget::Year => {
                Ok(self.typ.convert(&value).map(|(v, _)| v).unwrap_or(Value::Null))
            }
            ConvertTarget::Json => match self.typ.convert(&value) {
                Ok((converted, _)) => Ok(converted),
                Err(_) => Err(ExpressionError::ConvertExpression {
                    value: value.to_string(),
                    target: self.target.to_string(),
                }),
            },
        }
    }
}

/// Convert `value` as `CONVERT(value, tag)` would, without building a tree.
pub fn convert_value(
    ctx: &Context,
    value: Value,
    tag: &str,
    length: Option<u32>,
    scale: Option<u32>,
) -> ExpressionResult<Value> {
    let target = ConvertTarget::parse(tag)?;
    let typ = target_type(target, length, scale);
    Cast {
        target,
        length,
        scale,
        typ: &typ,
        source_collation: ctx.config().default_collation,
    }
    .apply(ctx, value)
}

#[derive(Debug, Clone)]
pub struct Convert {
    child: Box<Expression>,
    target: ConvertTarget,
    length: Option<u32>,
    scale: Option<u32>,
    decimal_type: OnceLock<SqlType>,
}

impl Convert {
    pub fn new(child: Expression, target: &str) -> ExpressionResult<Self> {
        Self::with_length_and_scale(child, target, None, None)
    }

    pub fn with_length_and_scale(
        child: Expression,
        target: &str,
        length: Option<u32>,
        scale: Option<u32>,
    ) -> ExpressionResult<Self> {
        Ok(Self {
            child: Box::new(child),
            target: ConvertTarget::parse(target)?,
            length,
            scale,
            decimal_type: OnceLock::new(),
        })
    }

    pub fn target(&self) -> ConvertTarget {
        self.target
    }

    pub fn child(&self) -> &Expression {
        &self.child
    }
}

impl ExpressionOps for Convert {
    fn eval(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Value> {
        let value = self.child.eval(ctx, row)?;
        let typ = self.sql_type();
        let source_collation = self
            .child
            .sql_type()
            .collation()
            .unwrap_or(ctx.config().default_collation);
        Cast {
            target: self.target,
            length: self.length,
            scale: self.scale,
            typ: &typ,
            source_collation,
        }
        .apply(ctx, value)
    }

    fn sql_type(&self) -> SqlType {
        match self.target {
            ConvertTarget::Decimal => self
                .decimal_type
                .get_or_init(|| decimal_type(self.length, self.scale))
                .clone(),
            target => target_type(target, self.length, self.scale),
        }
    }

    fn is_nullable(&self) -> bool {
        self.child.is_nullable()
            || matches!(
                self.target,
                ConvertTarget::Date
                    | ConvertTarget::Datetime
                    | ConvertTarget::Time
                    | ConvertTarget::Year
            )
    }

    fn children(&self) -> Vec<&Expression> {
        vec![&self.child]
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        let [child] = take_children::<1>(self, children)?;
        Ok(Expression::Convert(Convert {
            child: Box::new(child),
            target: self.target,
            length: self.length,
            scale: self.scale,
            decimal_type: OnceLock::new(),
        }))
    }

    fn debug_string(&self) -> String {
        format!("convert({}, {})", self.child.debug_string(), self.target)
    }
}

impl fmt::Display for Convert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "convert({}, {})", self.child, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ER_TRUNCATED_WRONG_VALUE;
    use crate::types::{Decimal, StringKind, StringType};
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn cast(value: impl Into<Value>, tag: &str) -> Value {
        Convert::new(Expression::literal(value), tag)
            .unwrap()
            .eval(&Context::default(), &[])
            .unwrap()
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(ConvertTarget::parse("SIGNED").unwrap(), ConvertTarget::Signed);
        assert_eq!(ConvertTarget::parse("unsigned integer").unwrap(), ConvertTarget::Unsigned);
        assert_eq!(ConvertTarget::parse("nchar").unwrap(), ConvertTarget::Char);
        assert_eq!(ConvertTarget::parse("Real").unwrap(), ConvertTarget::Double);
        assert_eq!(
            ConvertTarget::parse("blob").unwrap_err(),
            ExpressionError::InvalidConvertTarget("blob".to_string())
        );
    }

    #[test]
    fn test_types() {
        let one = Expression::literal(1i64);
        let expr = Convert::with_length_and_scale(one, "decimal", Some(8), Some(3)).unwrap();
        assert_eq!(expr.sql_type(), SqlType::decimal(8, 3));
        let expr = Convert::new(Expression::literal(1i64), "decimal").unwrap();
        assert_eq!(expr.sql_type(), SqlType::decimal(10, 0));
        let expr = Convert::new(Expression::literal(1i64), "char").unwrap();
        assert_eq!(expr.sql_type(), SqlType::long_text());
        assert_eq!(expr.to_string(), "convert(1, char)");
    }

    #[test]
    fn test_signed_and_unsigned() {
        assert_eq!(cast("42", "signed"), Value::Int64(42));
        assert_eq!(cast("abc", "signed"), Value::Int64(0));
        assert_eq!(cast(-5i64, "unsigned"), Value::Uint64(18446744073709551611));
        assert_eq!(cast(7i64, "unsigned"), Value::Uint64(7));
        assert_eq!(cast(Value::Bytes(vec![0x01, 0x00]), "signed"), Value::Int64(256));
    }

    #[test]
    fn test_decimal() {
        let expr = Convert::with_length_and_scale(
            Expression::literal(Decimal::from_str("1.5").unwrap()),
            "decimal",
            Some(10),
            Some(2),
        )
        .unwrap();
        assert_eq!(
            expr.eval(&Context::default(), &[]).unwrap().to_string(),
            "1.50"
        );
        let x = Expression::literal("x");
        let bad = Convert::with_length_and_scale(x, "decimal", Some(5), Some(2)).unwrap();
        assert_eq!(bad.eval(&Context::default(), &[]).unwrap().to_string(), "0.00");
    }

    #[test]
    fn test_floats() {
        assert_eq!(cast("2.5", "double"), Value::Float64(2.5));
        assert_eq!(cast("nope", "double"), Value::Float64(0.0));
        assert_eq!(cast(1.5f64, "float"), Value::Float32(1.5));
    }

    #[test]
    fn test_dates() {
        let expected = NaiveDate::from_ymd_opt(2021, 3, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(cast("2021-03-04 10:11:12", "date"), Value::Datetime(expected));
        assert_eq!(cast(20210304i64, "date"), Value::Null);

        let ctx = Context::default();
        let bad = Convert::new(Expression::literal("not a date"), "datetime").unwrap();
        assert_eq!(bad.eval(&ctx, &[]).unwrap(), Value::Null);
        assert_eq!(ctx.session.warnings()[0].code, ER_TRUNCATED_WRONG_VALUE);
    }

    #[test]
    fn test_char_and_binary() {
        let text = Expression::literal("héllo");
        let expr = Convert::with_length_and_scale(text, "char", Some(2), None).unwrap();
        assert_eq!(expr.eval(&Context::default(), &[]).unwrap(), Value::from("hé"));

        let latin1 = SqlType::Text(StringType::new(
            StringKind::Varchar,
            10,
            Collation::Latin1_swedish_ci,
        ));
        let expr = Convert::new(Expression::column(0, latin1, "s"), "binary").unwrap();
        assert_eq!(
            expr.eval(&Context::default(), &[Value::from("caf\u{e9}")]).unwrap(),
            Value::Bytes(vec![b'c', b'a', b'f', 0xE9])
        );
        assert_eq!(cast("caf\u{e9}", "binary"), Value::Bytes("caf\u{e9}".as_bytes().to_vec()));
    }

    #[test]
    fn test_json() {
        assert_eq!(
            cast("{\"a\": 1}", "json"),
            Value::Json(serde_json::json!({"a": 1}))
        );
        let err = Convert::new(Expression::literal("{oops"), "json")
            .unwrap()
            .eval(&Context::default(), &[])
            .unwrap_err();
        assert!(matches!(err, ExpressionError::ConvertExpression { .. }));
    }

    #[test]
    fn test_time_and_year_failures() {
        assert_eq!(cast("garbage", "time"), Value::Null);
        assert_eq!(cast(3000i64, "year"), Value::Null);
        assert_eq!(cast(Value::Null, "signed"), Value::Null);
    }

    #[test]
    fn test_convert_value_helper() {
        let ctx = Context::default();
        assert_eq!(
            convert_value(&ctx, Value::from("12"), "unsigned", None, None).unwrap(),
            Value::Uint64(12)
        );
        assert!(convert_value(&ctx, Value::Int64(1), "bogus", None, None).is_err());
    }
}
