//! Ordering of values under a [`SqlType`].

use crate::types::error::{TypeError, TypeResult};
use crate::types::sql_type::SqlType;
use crate::types::value::Value;
use std::cmp::Ordering;

/// How a NULL inside a row value affects a three-valued row comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowNulls {
    /// `=` and `IN`: an unknown pair is passed over and a later mismatch
    /// still decides; otherwise the result is unknown.
    Skip,
    /// `<`, `<=`, `>` and `>=`: an unknown pair before the first mismatch
    /// makes the result unknown.
    Stop,
}

impl SqlType {
    /// Compare two values after converting both to this type. NULL sorts
    /// before everything else.
    pub fn compare(&self, a: &Value, b: &Value) -> TypeResult<Ordering> {
        match (a.is_null(), b.is_null()) {
            (true, true) => return Ok(Ordering::Equal),
            (true, false) => return Ok(Ordering::Less),
            (false, true) => return Ok(Ordering::Greater),
            _ => {}
        }
        let (a, _) = self.convert(a)?;
        let (b, _) = self.convert(b)?;
        self.compare_converted(&a, &b)
    }

    /// Compare two values already converted to this type.
    pub(crate) fn compare_converted(&self, a: &Value, b: &Value) -> TypeResult<Ordering> {
        let ordering = match (a, b) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
            (Value::Int8(x), Value::Int8(y)) => x.cmp(y),
            (Value::Int16(x), Value::Int16(y)) => x.cmp(y),
            (Value::Int32(x), Value::Int32(y)) => x.cmp(y),
            (Value::Int64(x), Value::Int64(y)) => x.cmp(y),
            (Value::Uint8(x), Value::Uint8(y)) => x.cmp(y),
            (Value::Uint16(x), Value::Uint16(y)) => x.cmp(y),
            (Value::Uint32(x), Value::Uint32(y)) => x.cmp(y),
            (Value::Uint64(x), Value::Uint64(y)) => x.cmp(y),
            (Value::Float32(x), Value::Float32(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
            (Value::Float64(x), Value::Float64(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
            (Value::Decimal(x), Value::Decimal(y)) => x.cmp(y),
            (Value::Text(x), Value::Text(y)) => self.collation().unwrap_or_default().compare(x, y),
            (Value::Bytes(x), Value::Bytes(y)) => x.cmp(y),
            (Value::Datetime(x), Value::Datetime(y)) => x.cmp(y),
            (Value::Time(x), Value::Time(y)) => x.cmp(y),
            (Value::Enum(x), Value::Enum(y)) => x.cmp(y),
            (Value::Set(x), Value::Set(y)) => x.cmp(y),
            (Value::Json(x), Value::Json(y)) => compare_json(x, y),
            (Value::Tuple(xs), Value::Tuple(ys)) => {
                for ((t, x), y) in self.element_types(xs).iter().zip(xs).zip(ys) {
                    let ordering = t.compare_converted(x, y)?;
                    if ordering != Ordering::Equal {
                        return Ok(ordering);
                    }
                }
                xs.len().cmp(&ys.len())
            }
            (a, b) => {
                return Err(TypeError::UnsupportedConversion {
                    from: a.sql_type().to_string(),
                    to: b.sql_type().to_string(),
                })
            }
        };
        Ok(ordering)
    }

    /// Three-valued ordering of two values already converted to this type.
    /// `None` means unknown: a scalar NULL on either side, or a NULL element
    /// of a row value as `nulls` describes.
    pub fn compare_nullable(
        &self,
        a: &Value,
        b: &Value,
        nulls: RowNulls,
    ) -> TypeResult<Option<Ordering>> {
        match (a, b) {
            (Value::Null, _) | (_, Value::Null) => Ok(None),
            (Value::Tuple(xs), Value::Tuple(ys)) => {
                let mut unknown = false;
                for ((t, x), y) in self.element_types(xs).iter().zip(xs).zip(ys) {
                    match t.compare_nullable(x, y, nulls)? {
                        Some(Ordering::Equal) => {}
                        Some(ordering) => return Ok(Some(ordering)),
                        None if nulls == RowNulls::Skip => unknown = true,
                        None => return Ok(None),
                    }
                }
                if unknown {
                    Ok(None)
                } else {
                    Ok(Some(xs.len().cmp(&ys.len())))
                }
            }
            _ => self.compare_converted(a, b).map(Some),
        }
    }

    fn element_types(&self, values: &[Value]) -> Vec<SqlType> {
        match self {
            SqlType::Tuple(types) => types.clone(),
            _ => values.iter().map(Value::sql_type).collect(),
        }
    }
}

/// JSON ordering: numbers numerically, everything else by its serialised text.
fn compare_json(a: &serde_json::Value, b: &serde_json::Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::collation::Collation;

    #[test]
    fn test_compare_numbers() {
        assert_eq!(
            SqlType::Int64.compare(&Value::Int64(1), &Value::from("2")).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            SqlType::Float64.compare(&Value::Float64(2.0), &Value::Int64(2)).unwrap(),
            Ordering::Equal
        );
        assert_eq!(
            SqlType::decimal(65, 30)
                .compare(&Value::from("1.50"), &Value::Float64(1.5))
                .unwrap(),
            Ordering::Equal
        );
    }

    #[test]
    fn test_compare_nulls_first() {
        assert_eq!(SqlType::Int64.compare(&Value::Null, &Value::Int64(0)).unwrap(), Ordering::Less);
        assert_eq!(SqlType::Int64.compare(&Value::Null, &Value::Null).unwrap(), Ordering::Equal);
        assert_eq!(
            SqlType::Int64.compare(&Value::Int64(0), &Value::Null).unwrap(),
            Ordering::Greater
        );
    }

    #[test]
    fn test_compare_text_uses_collation() {
        let ci = SqlType::long_text_with(Collation::Utf8mb4_0900_ai_ci);
        let bin = SqlType::long_text_with(Collation::Utf8mb4_bin);
        let (a, b) = (Value::from("abc"), Value::from("ABC"));
        assert_eq!(ci.compare(&a, &b).unwrap(), Ordering::Equal);
        assert_eq!(bin.compare(&a, &b).unwrap(), Ordering::Greater);
    }

    #[test]
    fn test_compare_tuples() {
        let t = SqlType::Tuple(vec![SqlType::Int64, SqlType::Int64]);
        let a = Value::Tuple(vec![Value::Int64(1), Value::Int64(2)]);
        let b = Value::Tuple(vec![Value::Int64(1), Value::Int64(3)]);
        assert_eq!(t.compare(&a, &b).unwrap(), Ordering::Less);
    }

    #[test]
    fn test_row_comparison_with_null_elements() {
        let t = SqlType::Tuple(vec![SqlType::Int64, SqlType::Int64]);
        let row = |a: Option<i64>, b: Option<i64>| {
            Value::Tuple(vec![Value::from(a), Value::from(b)])
        };
        let cmp = |a: &Value, b: &Value, nulls| t.compare_nullable(a, b, nulls).unwrap();

        let one_null = row(Some(1), None);
        assert_eq!(cmp(&one_null, &one_null, RowNulls::Skip), None);
        assert_eq!(cmp(&row(Some(1), Some(2)), &one_null, RowNulls::Skip), None);
        // a mismatch after the NULL still decides equality
        assert_eq!(
            cmp(&row(None, Some(1)), &row(None, Some(2)), RowNulls::Skip),
            Some(Ordering::Less)
        );
        assert_eq!(cmp(&row(None, Some(1)), &row(None, Some(2)), RowNulls::Stop), None);
        // but not an ordering whose first pair already differs
        assert_eq!(
            cmp(&row(Some(1), None), &row(Some(2), None), RowNulls::Stop),
            Some(Ordering::Less)
        );
        assert_eq!(
            cmp(&row(Some(1), Some(2)), &row(Some(1), Some(2)), RowNulls::Stop),
            Some(Ordering::Equal)
        );
        assert_eq!(
            SqlType::Int64
                .compare_nullable(&Value::Null, &Value::Int64(1), RowNulls::Skip)
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_compare_unconvertible_fails() {
        assert!(SqlType::Int64.compare(&Value::from("abc"), &Value::Int64(1)).is_err());
    }
}
