//! Binary comparisons and the comparison-type rules shared with `BETWEEN`
//! and `IN`.

use crate::expression::arithmetic::resolve_type;
use crate::expression::collated::explicit_collation;
use crate::expression::error::{ExpressionError, ExpressionResult};
use crate::expression::expr::{take_children, Expression, ExpressionOps};
use crate::expression::operator::ComparisonOperator;
use crate::session::Context;
use crate::types::convert::parse_float_prefix;
use crate::types::{Collation, DecimalType, RowNulls, SqlType, Value};
use std::cmp::Ordering;
use std::fmt;

/// `left op right`
#[derive(Debug, Clone)]
pub struct Comparison {
    op: ComparisonOperator,
    left: Box<Expression>,
    right: Box<Expression>,
}

impl Comparison {
    pub fn new(op: ComparisonOperator, left: Expression, right: Expression) -> Self {
        Self {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn op(&self) -> ComparisonOperator {
        self.op
    }

    pub fn left(&self) -> &Expression {
        &self.left
    }

    pub fn right(&self) -> &Expression {
        &self.right
    }

    /// Ordering of the two operands on `row`, or `None` if either is NULL
    /// or a NULL inside a row value comes before the first mismatch.
    pub fn compare_value(
        &self,
        ctx: &Context,
        row: &[Value],
    ) -> ExpressionResult<Option<Ordering>> {
        let l = self.left.eval(ctx, row)?;
        let r = self.right.eval(ctx, row)?;
        if l.is_null() || r.is_null() {
            return Ok(None);
        }
        compare_rows_with_types(ctx, &self.left, &self.right, &l, &r, RowNulls::Stop)
    }
}

/// Whether `expr` is a column-like reference whose own type should drive
/// the comparison.
fn pins_type(expr: &Expression, typ: &SqlType) -> bool {
    matches!(expr, Expression::GetField(_) | Expression::ProcedureParam(_))
        && (typ.is_enum() || typ.is_set() || typ.is_time())
}

/// Compare two non-NULL operand values, picking the comparison type from
/// the operand expressions.
pub(crate) fn compare_with_types(
    ctx: &Context,
    left: &Expression,
    right: &Expression,
    l: &Value,
    r: &Value,
) -> ExpressionResult<Ordering> {
    let typ = operand_type(left, right, l, r)?;
    compare_as(ctx, &typ, l, r)
}

/// Three-valued form of [`compare_with_types`] for `=` and the orderings:
/// NULL elements of row values make the result unknown as `nulls` says.
pub(crate) fn compare_rows_with_types(
    ctx: &Context,
    left: &Expression,
    right: &Expression,
    l: &Value,
    r: &Value,
    nulls: RowNulls,
) -> ExpressionResult<Option<Ordering>> {
    let typ = operand_type(left, right, l, r)?;
    let l = convert_for_compare(ctx, &typ, l)?;
    let r = convert_for_compare(ctx, &typ, r)?;
    Ok(typ.compare_nullable(&l, &r, nulls)?)
}

fn operand_type(
    left: &Expression,
    right: &Expression,
    l: &Value,
    r: &Value,
) -> ExpressionResult<SqlType> {
    let lt = resolve_type(left.sql_type(), l);
    let rt = resolve_type(right.sql_type(), r);
    if lt.num_columns() != rt.num_columns() {
        return Err(ExpressionError::InvalidOperandColumns {
            expected: lt.num_columns(),
            got: rt.num_columns(),
        });
    }

    let typ = if lt == rt || pins_type(left, &lt) {
        lt
    } else if pins_type(right, &rt) {
        rt
    } else {
        comparison_type(&lt, &rt)
    };
    Ok(match explicit_collation(left).or_else(|| explicit_collation(right)) {
        Some(collation) if typ.is_text_only() => typ.with_collation(collation),
        _ => typ,
    })
}

/// Convert both values to `typ` and order them.
pub(crate) fn compare_as(
    ctx: &Context,
    typ: &SqlType,
    l: &Value,
    r: &Value,
) -> ExpressionResult<Ordering> {
    let l = convert_for_compare(ctx, typ, l)?;
    let r = convert_for_compare(ctx, typ, r)?;
    Ok(typ.compare_converted(&l, &r)?)
}

/// Convert a comparison operand. Text that does not read as the numeric
/// target is compared through its numeric prefix, with a warning.
pub(crate) fn convert_for_compare(
    ctx: &Context,
    typ: &SqlType,
    value: &Value,
) -> ExpressionResult<Value> {
    match typ.convert(value) {
        Ok((converted, _)) => Ok(converted),
        Err(_) if typ.is_number() && matches!(value, Value::Text(_) | Value::Bytes(_)) => {
            let text = match value {
                Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
                other => other.to_string(),
            };
            ctx.warn_truncated(typ, value);
            let (prefix, _) = parse_float_prefix(&text);
            Ok(typ.convert(&Value::Float64(prefix))?.0)
        }
        Err(_) => Err(ExpressionError::UnableToCast {
            left: value.sql_type().to_string(),
            right: typ.to_string(),
        }),
    }
}

/// Type two operands of different types are compared as.
pub fn comparison_type(lt: &SqlType, rt: &SqlType) -> SqlType {
    if let (SqlType::Tuple(ls), SqlType::Tuple(rs)) = (lt, rt) {
        if ls.len() != rs.len() {
            return lt.clone();
        }
        let pairs = ls.iter().zip(rs).map(|(l, r)| {
            if r.is_null() || l == r {
                l.clone()
            } else if l.is_null() {
                r.clone()
            } else {
                comparison_type(l, r)
            }
        });
        return SqlType::Tuple(pairs.collect());
    }
    if (lt.is_time() || rt.is_time()) && !lt.is_integer() && !rt.is_integer() {
        return SqlType::Datetime;
    }
    if lt.is_binary() || rt.is_binary() {
        return SqlType::long_blob();
    }
    if lt.is_number() && rt.is_number() {
        return if lt.is_decimal() || rt.is_decimal() {
            SqlType::Decimal(DecimalType::max())
        } else if lt.is_float() || rt.is_float() {
            SqlType::Float64
        } else if lt.is_signed() && rt.is_signed() {
            SqlType::Int64
        } else if lt.is_unsigned() && rt.is_unsigned() {
            SqlType::Uint64
        } else {
            SqlType::Float64
        };
    }
    if lt.is_number() || rt.is_number() {
        return SqlType::Float64;
    }
    let collation = lt.collation().or_else(|| rt.collation()).unwrap_or(Collation::default());
    SqlType::long_text_with(collation)
}

impl ExpressionOps for Comparison {
    fn eval(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Value> {
        let l = self.left.eval(ctx, row)?;
        let r = self.right.eval(ctx, row)?;
        match (l.is_null(), r.is_null()) {
            (false, false) => {}
            (true, true) if self.op == ComparisonOperator::NullSafeEquals => {
                return Ok(Value::Boolean(true))
            }
            _ if self.op == ComparisonOperator::NullSafeEquals => {
                return Ok(Value::Boolean(false))
            }
            _ => return Ok(Value::Null),
        }
        if self.op == ComparisonOperator::NullSafeEquals {
            let ordering = compare_with_types(ctx, &self.left, &self.right, &l, &r)?;
            return Ok(Value::Boolean(self.op.matches(ordering)));
        }
        let nulls = if self.op == ComparisonOperator::Equals {
            RowNulls::Skip
        } else {
            RowNulls::Stop
        };
        match compare_rows_with_types(ctx, &self.left, &self.right, &l, &r, nulls)? {
            Some(ordering) => Ok(Value::Boolean(self.op.matches(ordering))),
            None => Ok(Value::Null),
        }
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Boolean
    }

    fn is_nullable(&self) -> bool {
        self.op != ComparisonOperator::NullSafeEquals
            && (self.left.is_nullable() || self.right.is_nullable())
    }

    fn children(&self) -> Vec<&Expression> {
        vec![&self.left, &self.right]
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        let [left, right] = take_children::<2>(self, children)?;
        Ok(Expression::Comparison(Comparison::new(self.op, left, right)))
    }

    fn debug_string(&self) -> String {
        format!(
            "{} {} {}",
            self.left.debug_string(),
            self.op,
            self.right.debug_string()
        )
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op, self.right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ER_TRUNCATED_WRONG_VALUE;
    use crate::types::{Decimal, EnumType, StringKind, StringType};
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn eval(expr: &Expression) -> Value {
        expr.eval(&Context::default(), &[]).unwrap()
    }

    #[test]
    fn test_comparison_type_rules() {
        let text = SqlType::varchar(10);
        let dec = SqlType::decimal(5, 2);
        assert_eq!(comparison_type(&SqlType::Int64, &SqlType::Uint64), SqlType::Float64);
        assert_eq!(comparison_type(&SqlType::Int8, &SqlType::Int64), SqlType::Int64);
        assert_eq!(comparison_type(&SqlType::Uint8, &SqlType::Uint32), SqlType::Uint64);
        assert_eq!(
            comparison_type(&SqlType::Int64, &dec),
            SqlType::Decimal(DecimalType::max())
        );
        assert_eq!(comparison_type(&SqlType::Float32, &SqlType::Int64), SqlType::Float64);
        assert_eq!(comparison_type(&text, &SqlType::Int64), SqlType::Float64);
        assert_eq!(comparison_type(&SqlType::Date, &text), SqlType::Datetime);
        assert_eq!(comparison_type(&SqlType::Date, &SqlType::Int64), SqlType::Float64);
        assert_eq!(comparison_type(&SqlType::varbinary(4), &text), SqlType::long_blob());
        assert_eq!(comparison_type(&text, &SqlType::long_text()), SqlType::long_text());

        let left = SqlType::Tuple(vec![SqlType::Int64, SqlType::Null]);
        let right = SqlType::Tuple(vec![SqlType::Float64, SqlType::Int64]);
        assert_eq!(
            comparison_type(&left, &right),
            SqlType::Tuple(vec![SqlType::Float64, SqlType::Int64])
        );
    }

    #[test]
    fn test_numeric_comparisons() {
        let one = || Expression::literal(1i64);
        assert_eq!(eval(&Expression::lt(one(), Expression::literal(2i64))), Value::Boolean(true));
        assert_eq!(eval(&Expression::eq(one(), Expression::literal(1.0f64))), Value::Boolean(true));
        assert_eq!(
            eval(&Expression::eq(
                Expression::literal(Decimal::from_str("1.10").unwrap()),
                Expression::literal(Decimal::from_str("1.1").unwrap())
            )),
            Value::Boolean(true)
        );
        assert_eq!(
            eval(&Expression::gt(Expression::literal(u64::MAX), Expression::literal(-1i64))),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_text_and_number() {
        let ctx = Context::default();
        let expr = Expression::eq(Expression::literal("1abc"), Expression::literal(1i64));
        assert_eq!(expr.eval(&ctx, &[]).unwrap(), Value::Boolean(true));
        let warnings = ctx.session.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, ER_TRUNCATED_WRONG_VALUE);

        let expr = Expression::eq(Expression::literal("10"), Expression::literal(9i64));
        assert_eq!(eval(&expr), Value::Boolean(false));
    }

    #[test]
    fn test_text_collation() {
        let text_with = |collation| {
            SqlType::Text(StringType::new(StringKind::Varchar, 10, collation))
        };
        let ctx = Context::default();
        let row = [Value::from("abc")];

        let ci = Expression::column(0, text_with(Collation::Utf8mb4_general_ci), "name");
        let expr = Expression::eq(ci, Expression::literal("ABC"));
        assert_eq!(expr.eval(&ctx, &row).unwrap(), Value::Boolean(true));

        let bin = Expression::column(0, text_with(Collation::Utf8mb4_bin), "name");
        let expr = Expression::eq(bin, Expression::literal("ABC"));
        assert_eq!(expr.eval(&ctx, &row).unwrap(), Value::Boolean(false));
    }

    #[test]
    fn test_datetime_against_text() {
        let col = Expression::column(0, SqlType::Datetime, "created");
        let expr = Expression::ge(col, Expression::literal("2020-01-01"));
        let t = NaiveDate::from_ymd_opt(2020, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            expr.eval(&Context::default(), &[Value::Datetime(t)]).unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_enum_column_uses_its_type() {
        let typ = SqlType::Enum(EnumType::new(
            vec!["small".into(), "large".into()],
            Collation::default(),
        ));
        let col = Expression::column(0, typ, "size");
        let expr = Expression::eq(col, Expression::literal("large"));
        assert_eq!(
            expr.eval(&Context::default(), &[Value::Enum(2)]).unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_nulls() {
        let null_eq = Expression::eq(Expression::null(), Expression::literal(1i64));
        assert_eq!(eval(&null_eq), Value::Null);
        let safe = Expression::null_safe_eq(Expression::null(), Expression::null());
        assert_eq!(eval(&safe), Value::Boolean(true));
        let safe = Expression::null_safe_eq(Expression::literal(1i64), Expression::null());
        assert_eq!(eval(&safe), Value::Boolean(false));
        assert!(!safe.is_nullable());
    }

    #[test]
    fn test_tuple_comparison() {
        let left = Expression::tuple(vec![Expression::literal(1i64), Expression::literal("a")]);
        let right = Expression::tuple(vec![Expression::literal(1i64), Expression::literal("b")]);
        assert_eq!(eval(&Expression::lt(left.clone(), right)), Value::Boolean(true));

        let short = Expression::tuple(vec![Expression::literal(1i64)]);
        let err = Expression::eq(left, short)
            .eval(&Context::default(), &[])
            .unwrap_err();
        assert_eq!(
            err,
            ExpressionError::InvalidOperandColumns {
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn test_row_values_with_null_elements() {
        let row = |a: Option<i64>, b: Option<i64>| {
            Expression::tuple(vec![Expression::literal(a), Expression::literal(b)])
        };
        let cases = [
            (Expression::eq(row(Some(1), None), row(Some(1), None)), Value::Null),
            (Expression::eq(row(Some(1), Some(2)), row(Some(1), None)), Value::Null),
            (Expression::eq(row(Some(1), None), row(Some(2), None)), Value::Boolean(false)),
            (Expression::eq(row(None, Some(1)), row(None, Some(2))), Value::Boolean(false)),
            (Expression::ne(row(Some(1), None), row(Some(2), None)), Value::Boolean(true)),
            (Expression::lt(row(Some(1), None), row(Some(2), None)), Value::Boolean(true)),
            (Expression::lt(row(None, Some(1)), row(Some(2), Some(1))), Value::Null),
            (Expression::le(row(Some(1), Some(2)), row(Some(1), None)), Value::Null),
            (
                Expression::null_safe_eq(row(Some(1), None), row(Some(1), None)),
                Value::Boolean(true),
            ),
        ];
        for (expr, expected) in cases {
            assert_eq!(eval(&expr), expected, "{}", expr);
        }
    }

    #[test]
    fn test_compare_value() {
        let Expression::Comparison(cmp) =
            Expression::lt(Expression::literal(3i64), Expression::literal(2i64))
        else {
            unreachable!()
        };
        let ctx = Context::default();
        assert_eq!(cmp.compare_value(&ctx, &[]).unwrap(), Some(Ordering::Greater));
        assert_eq!(cmp.to_string(), "3 < 2");
    }
}
