//! `x BETWEEN lower AND upper`

use crate::expression::comparison::compare_with_types;
use crate::expression::error::ExpressionResult;
use crate::expression::expr::{take_children, Expression, ExpressionOps};
use crate::session::Context;
use crate::types::{SqlType, Value};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone)]
pub struct Between {
    value: Box<Expression>,
    lower: Box<Expression>,
    upper: Box<Expression>,
}

impl Between {
    pub fn new(value: Expression, lower: Expression, upper: Expression) -> Self {
        Self {
            value: Box::new(value),
            lower: Box::new(lower),
            upper: Box::new(upper),
        }
    }
}

impl ExpressionOps for Between {
    fn eval(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Value> {
        let v = self.value.eval(ctx, row)?;
        if v.is_null() {
            return Ok(Value::Null);
        }
        let lower = self.lower.eval(ctx, row)?;
        let upper = self.upper.eval(ctx, row)?;

        let above_lower = if lower.is_null() {
            None
        } else {
            Some(compare_with_types(ctx, &self.value, &self.lower, &v, &lower)? != Ordering::Less)
        };
        let below_upper = if upper.is_null() {
            None
        } else {
            Some(
                compare_with_types(ctx, &self.value, &self.upper, &v, &upper)?
                    != Ordering::Greater,
            )
        };

        // one failed bound decides the result even when the other is NULL
        Ok(match (above_lower, below_upper) {
            (Some(a), Some(b)) => Value::Boolean(a && b),
            (Some(false), None) | (None, Some(false)) => Value::Boolean(false),
            _ => Value::Null,
        })
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Boolean
    }

    fn is_nullable(&self) -> bool {
        self.value.is_nullable() || self.lower.is_nullable() || self.upper.is_nullable()
    }

    fn children(&self) -> Vec<&Expression> {
        vec![&self.value, &self.lower, &self.upper]
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        let [value, lower, upper] = take_children::<3>(self, children)?;
        Ok(Expression::Between(Between::new(value, lower, upper)))
    }

    fn debug_string(&self) -> String {
        format!(
            "{} BETWEEN {} AND {}",
            self.value.debug_string(),
            self.lower.debug_string(),
            self.upper.debug_string()
        )
    }
}

impl fmt::Display for Between {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BETWEEN {} AND {}", self.value, self.lower, self.upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn between(v: Expression, lo: Expression, hi: Expression) -> Value {
        Between::new(v, lo, hi).eval(&Context::default(), &[]).unwrap()
    }

    fn int(v: i64) -> Expression {
        Expression::literal(v)
    }

    #[test]
    fn test_inclusive_bounds() {
        assert_eq!(between(int(1), int(1), int(3)), Value::Boolean(true));
        assert_eq!(between(int(3), int(1), int(3)), Value::Boolean(true));
        assert_eq!(between(int(4), int(1), int(3)), Value::Boolean(false));
        assert_eq!(
            between(Expression::literal("b"), Expression::literal("a"), Expression::literal("c")),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_null_bounds() {
        let null = Expression::null;
        assert_eq!(between(null(), int(1), int(3)), Value::Null);
        assert_eq!(between(int(2), null(), int(3)), Value::Null);
        assert_eq!(between(int(5), null(), int(3)), Value::Boolean(false));
        assert_eq!(between(int(0), int(1), null()), Value::Boolean(false));
        assert_eq!(between(int(2), int(1), null()), Value::Null);
    }

    #[test]
    fn test_rendering() {
        let expr = Between::new(Expression::column(0, SqlType::Int64, "a"), int(1), int(2));
        assert_eq!(expr.to_string(), "a BETWEEN 1 AND 2");
        let err = expr.with_children(vec![int(1)]).unwrap_err();
        assert!(err.to_string().contains("expected 3"));
    }
}
