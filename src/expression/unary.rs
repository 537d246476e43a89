//! Unary nodes: negation, `IS NULL` and `IS [NOT] TRUE/FALSE`.

use crate::expression::arithmetic::resolve_type;
use crate::expression::error::{ExpressionError, ExpressionResult};
use crate::expression::expr::{take_children, Expression, ExpressionOps};
use crate::session::Context;
use crate::types::decimal::parse_decimal;
use crate::types::{SqlType, Value};
use num_traits::ToPrimitive;
use std::fmt;

/// `-x`
#[derive(Debug, Clone)]
pub struct UnaryMinus {
    child: Box<Expression>,
}

impl UnaryMinus {
    pub fn new(child: Expression) -> Self {
        Self {
            child: Box::new(child),
        }
    }

    pub fn child(&self) -> &Expression {
        &self.child
    }
}

/// Result type of negating a value of type `t`.
fn negated_type(t: SqlType) -> SqlType {
    match t {
        SqlType::Deferred => SqlType::Deferred,
        t if !t.is_number() => SqlType::Float64,
        SqlType::Uint8 => SqlType::Int8,
        SqlType::Uint16 => SqlType::Int16,
        SqlType::Uint24 => SqlType::Int24,
        SqlType::Uint32 => SqlType::Int32,
        SqlType::Uint64 | SqlType::Boolean => SqlType::Int64,
        t => t,
    }
}

fn text_as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Text(s) => parse_decimal(s)?.to_f64(),
        Value::Bytes(b) => parse_decimal(&String::from_utf8_lossy(b))?.to_f64(),
        other => match SqlType::Float64.convert(other).ok()?.0 {
            Value::Float64(f) => Some(f),
            _ => None,
        },
    }
}

impl ExpressionOps for UnaryMinus {
    fn eval(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Value> {
        let v = self.child.eval(ctx, row)?;
        if v.is_null() {
            return Ok(Value::Null);
        }
        let source = resolve_type(self.child.sql_type(), &v);
        if !source.is_number() {
            return Ok(Value::Float64(text_as_float(&v).map(|f| -f).unwrap_or(0.0)));
        }
        let typ = negated_type(source);
        if typ.is_integer() {
            let (i, _) = SqlType::Int64.convert(&v)?;
            let Value::Int64(i) = i else {
                return unreachable_type(&typ, &i);
            };
            let (negated, _) = typ.convert(&Value::Int64(i.wrapping_neg()))?;
            return Ok(negated);
        }
        match typ.convert(&v)?.0 {
            Value::Float32(f) => Ok(Value::Float32(-f)),
            Value::Float64(f) => Ok(Value::Float64(-f)),
            Value::Decimal(d) => Ok(Value::Decimal(-d)),
            other => unreachable_type(&typ, &other),
        }
    }

    fn sql_type(&self) -> SqlType {
        negated_type(self.child.sql_type())
    }

    fn is_nullable(&self) -> bool {
        self.child.is_nullable()
    }

    fn children(&self) -> Vec<&Expression> {
        vec![&self.child]
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        let [child] = take_children::<1>(self, children)?;
        Ok(Expression::UnaryMinus(UnaryMinus::new(child)))
    }

    fn debug_string(&self) -> String {
        format!("-{}", self.child.debug_string())
    }
}

fn unreachable_type(typ: &SqlType, value: &Value) -> ExpressionResult<Value> {
    Err(ExpressionError::UnableToEval {
        left: String::new(),
        op: "-".to_string(),
        right: format!("{} ({})", value, typ),
    })
}

impl fmt::Display for UnaryMinus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-{}", self.child)
    }
}

/// `x IS NULL`
#[derive(Debug, Clone)]
pub struct IsNull {
    child: Box<Expression>,
}

impl IsNull {
    pub fn new(child: Expression) -> Self {
        Self {
            child: Box::new(child),
        }
    }
}

impl ExpressionOps for IsNull {
    fn eval(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Value> {
        let is_null = match self.child.eval(ctx, row)? {
            Value::Null => true,
            // a row is NULL only when every column is
            Value::Tuple(values) => values.iter().all(Value::is_null),
            _ => false,
        };
        Ok(Value::Boolean(is_null))
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Boolean
    }

    fn is_nullable(&self) -> bool {
        false
    }

    fn children(&self) -> Vec<&Expression> {
        vec![&self.child]
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        let [child] = take_children::<1>(self, children)?;
        Ok(Expression::IsNull(IsNull::new(child)))
    }

    fn debug_string(&self) -> String {
        format!("{} IS NULL", self.child.debug_string())
    }
}

impl fmt::Display for IsNull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} IS NULL", self.child)
    }
}

/// `x IS [NOT] TRUE` and `x IS [NOT] FALSE`. Never NULL.
#[derive(Debug, Clone)]
pub struct IsTrue {
    child: Box<Expression>,
    target: bool,
    negated: bool,
}

impl IsTrue {
    pub fn new(child: Expression, target: bool) -> Self {
        Self {
            child: Box::new(child),
            target,
            negated: false,
        }
    }

    /// `IS NOT TRUE` / `IS NOT FALSE`
    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }
}

impl ExpressionOps for IsTrue {
    fn eval(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Value> {
        let truth = self.child.eval(ctx, row)?.truthiness();
        let matched = truth == Some(self.target);
        Ok(Value::Boolean(matched != self.negated))
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Boolean
    }

    fn is_nullable(&self) -> bool {
        false
    }

    fn children(&self) -> Vec<&Expression> {
        vec![&self.child]
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        let [child] = take_children::<1>(self, children)?;
        Ok(Expression::IsTrue(IsTrue {
            child: Box::new(child),
            target: self.target,
            negated: self.negated,
        }))
    }

    fn debug_string(&self) -> String {
        format!("{} {}", self.child.debug_string(), self.suffix())
    }
}

impl IsTrue {
    fn suffix(&self) -> &'static str {
        match (self.negated, self.target) {
            (false, true) => "IS TRUE",
            (false, false) => "IS FALSE",
            (true, true) => "IS NOT TRUE",
            (true, false) => "IS NOT FALSE",
        }
    }
}

impl fmt::Display for IsTrue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.child, self.suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Decimal;
    use std::str::FromStr;

    fn eval(expr: &dyn ExpressionOps) -> Value {
        expr.eval(&Context::default(), &[]).unwrap()
    }

    #[test]
    fn test_unary_minus_numbers() {
        assert_eq!(eval(&UnaryMinus::new(Expression::literal(5i64))), Value::Int64(-5));
        assert_eq!(eval(&UnaryMinus::new(Expression::literal(2.5f64))), Value::Float64(-2.5));
        assert_eq!(
            eval(&UnaryMinus::new(Expression::literal(Decimal::from_str("1.50").unwrap()))),
            Value::Decimal(Decimal::from_str("-1.50").unwrap())
        );
        assert_eq!(eval(&UnaryMinus::new(Expression::null())), Value::Null);
    }

    #[test]
    fn test_unary_minus_unsigned_becomes_signed() {
        let expr = UnaryMinus::new(Expression::literal(7u64));
        assert_eq!(expr.sql_type(), SqlType::Int64);
        assert_eq!(eval(&expr), Value::Int64(-7));

        let col = UnaryMinus::new(Expression::column(0, SqlType::Uint8, "a"));
        assert_eq!(col.sql_type(), SqlType::Int8);
        assert_eq!(
            col.eval(&Context::default(), &[Value::Uint8(100)]).unwrap(),
            Value::Int8(-100)
        );
    }

    #[test]
    fn test_unary_minus_wraps_min() {
        let expr = UnaryMinus::new(Expression::literal(i64::MIN));
        assert_eq!(eval(&expr), Value::Int64(i64::MIN));
    }

    #[test]
    fn test_unary_minus_text() {
        let expr = UnaryMinus::new(Expression::literal("2.5"));
        assert_eq!(expr.sql_type(), SqlType::Float64);
        assert_eq!(eval(&expr), Value::Float64(-2.5));
        assert_eq!(eval(&UnaryMinus::new(Expression::literal("abc"))), Value::Float64(0.0));
        assert_eq!(expr.to_string(), "-'2.5'");
    }

    #[test]
    fn test_is_null() {
        assert_eq!(eval(&IsNull::new(Expression::null())), Value::Boolean(true));
        assert_eq!(eval(&IsNull::new(Expression::literal(0i64))), Value::Boolean(false));

        let all_null = Expression::tuple(vec![Expression::null(), Expression::null()]);
        assert_eq!(eval(&IsNull::new(all_null)), Value::Boolean(true));
        let partly = Expression::tuple(vec![Expression::null(), Expression::literal(1i64)]);
        assert_eq!(eval(&IsNull::new(partly)), Value::Boolean(false));
    }

    #[test]
    fn test_is_true_and_false() {
        let cases = [
            (Expression::literal(1i64), true, false),
            (Expression::literal(0i64), false, true),
            (Expression::literal("0.5"), true, false),
            (Expression::null(), false, false),
        ];
        for (child, is_true, is_false) in cases {
            assert_eq!(eval(&IsTrue::new(child.clone(), true)), Value::Boolean(is_true));
            assert_eq!(eval(&IsTrue::new(child, false)), Value::Boolean(is_false));
        }

        let not_true = IsTrue::new(Expression::null(), true).negate();
        assert_eq!(eval(&not_true), Value::Boolean(true));
        assert_eq!(not_true.to_string(), "NULL IS NOT TRUE");
    }
}
