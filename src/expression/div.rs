//! Decimal division (`/`).
//!
//! MySQL widens the scale of a quotient by `div_precision_increment` digits
//! per division, but a chain like `((a / b) / c) / d` is rounded only once,
//! at the outermost division. Inner divisions keep extra digits in groups
//! of nine and hand their bookkeeping up through [`DivScratch`]; nothing is
//! stored on the node, so a tree can be evaluated from several threads.

use crate::expression::arithmetic::{
    coerce_operand, division_by_zero, is_zero_value, resolve_type, subtree_has_float_field,
    unable_to_cast, Coerced,
};
use crate::expression::error::{ExpressionError, ExpressionResult};
use crate::expression::expr::{take_children, Expression, ExpressionOps};
use crate::session::Context;
use crate::types::decimal::{
    decimal_scale, div_to_scale, format_decimal, is_integral, round_to_scale, truncate_to_scale,
    DECIMAL_MAX_SCALE,
};
use crate::types::{DecimalType, SqlType, Value};
use std::fmt;

/// Digits carried per precision increment of an intermediate quotient.
const DIGITS_PER_INCREMENT: u32 = 9;

/// `left / right`
#[derive(Debug, Clone)]
pub struct Div {
    left: Box<Expression>,
    right: Box<Expression>,
    /// Number of divisions along the left spine, this one included.
    div_scale: u32,
}

/// Per-evaluation state passed from inner divisions to their parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DivScratch {
    precision_inc: u32,
    leftmost_scale: u32,
}

impl Div {
    pub fn new(left: Expression, right: Expression) -> Self {
        let div_scale = match &left {
            Expression::Div(inner) => inner.div_scale + 1,
            _ => 1,
        };
        Self {
            left: Box::new(left),
            right: Box::new(right),
            div_scale,
        }
    }

    pub fn left(&self) -> &Expression {
        &self.left
    }

    pub fn right(&self) -> &Expression {
        &self.right
    }

    pub fn div_scale(&self) -> u32 {
        self.div_scale
    }

    fn is_float(&self, lt: &SqlType, rt: &SqlType) -> bool {
        lt.is_float()
            || rt.is_float()
            || !lt.is_number()
            || !rt.is_number()
            || subtree_has_float_field(&self.left)
            || subtree_has_float_field(&self.right)
    }

    fn type_for(&self, lt: &SqlType, rt: &SqlType) -> SqlType {
        if self.is_float(lt, rt) {
            SqlType::Float64
        } else {
            SqlType::Decimal(DecimalType::max())
        }
    }

    /// Evaluate without the final rounding.
    fn eval_chain(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<(Value, DivScratch)> {
        let (l, left_scratch) = eval_child(ctx, &self.left, row)?;
        let (r, right_scratch) = eval_child(ctx, &self.right, row)?;
        if l.is_null() || r.is_null() {
            return Ok((Value::Null, DivScratch::default()));
        }

        let lt = resolve_type(self.left.sql_type(), &l);
        let rt = resolve_type(self.right.sql_type(), &r);
        let typ = self.type_for(&lt, &rt);

        let dividend = match coerce_div_operand(ctx, &typ, l)? {
            Coerced::Value(v) => Some(v),
            Coerced::Absent => None,
            Coerced::Null => return Ok((Value::Null, DivScratch::default())),
        };
        let divisor = match coerce_div_operand(ctx, &typ, r)? {
            Coerced::Value(v) if is_zero_value(&v) => {
                return division_by_zero(ctx).map(|v| (v, DivScratch::default()))
            }
            Coerced::Value(v) => v,
            _ => return Ok((Value::Null, DivScratch::default())),
        };
        let Some(dividend) = dividend else {
            return Ok((typ.zero(), DivScratch::default()));
        };

        match (dividend, divisor) {
            (Value::Float64(a), Value::Float64(b)) => {
                Ok((Value::Float64(a / b), DivScratch::default()))
            }
            (Value::Decimal(a), Value::Decimal(b)) => {
                let mut inc = left_scratch.precision_inc.max(right_scratch.precision_inc);
                if inc == 0 && !is_integral(&a) {
                    inc = increments_for(decimal_scale(&a));
                }
                let b_scale = decimal_scale(&b);
                inc += if b_scale == 0 { 1 } else { increments_for(b_scale) };

                let stored = inc * DIGITS_PER_INCREMENT;
                // One guard digit below the rounding position, which itself
                // sits two digits below the stored scale.
                let quotient = div_to_scale(
                    &truncate_to_scale(&a, stored),
                    &truncate_to_scale(&b, stored),
                    stored + 3,
                )
                .ok_or_else(|| ExpressionError::ValueOutOfRange {
                    value: format!("({} / {})", format_decimal(&a), format_decimal(&b)),
                    target: typ.to_string(),
                })?;
                let quotient = truncate_to_scale(&round_to_scale(&quotient, stored + 2), stored);

                let leftmost_scale = match *self.left {
                    Expression::Div(_) => left_scratch.leftmost_scale,
                    _ => decimal_scale(&a),
                };
                Ok((
                    Value::Decimal(quotient),
                    DivScratch {
                        precision_inc: inc,
                        leftmost_scale,
                    },
                ))
            }
            (l, r) => Err(unable_to_cast(&l, &r)),
        }
    }
}

fn eval_child(
    ctx: &Context,
    expr: &Expression,
    row: &[Value],
) -> ExpressionResult<(Value, DivScratch)> {
    match expr {
        Expression::Div(div) => div.eval_chain(ctx, row),
        other => Ok((other.eval(ctx, row)?, DivScratch::default())),
    }
}

/// Decimal operands, inner quotients included, keep every stored digit;
/// only other values are read as DECIMAL(65, 30).
fn coerce_div_operand(ctx: &Context, typ: &SqlType, value: Value) -> ExpressionResult<Coerced> {
    match value {
        Value::Decimal(_) if typ.is_decimal() => Ok(Coerced::Value(value)),
        other => coerce_operand(ctx, typ, &other),
    }
}

/// `ceil(scale / 9)`
fn increments_for(scale: u32) -> u32 {
    scale.div_ceil(DIGITS_PER_INCREMENT)
}

impl ExpressionOps for Div {
    fn eval(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Value> {
        let (value, scratch) = self.eval_chain(ctx, row)?;
        match value {
            Value::Decimal(d) => {
                let scale = (self.div_scale * ctx.config().div_precision_increment
                    + scratch.leftmost_scale)
                    .min(DECIMAL_MAX_SCALE as u32);
                Ok(Value::Decimal(round_to_scale(&d, scale)))
            }
            other => Ok(other),
        }
    }

    fn sql_type(&self) -> SqlType {
        let lt = self.left.sql_type();
        if lt.is_deferred() {
            return lt;
        }
        let rt = self.right.sql_type();
        if rt.is_deferred() {
            return rt;
        }
        self.type_for(&lt, &rt)
    }

    fn is_nullable(&self) -> bool {
        true
    }

    fn children(&self) -> Vec<&Expression> {
        vec![&self.left, &self.right]
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        let [left, right] = take_children::<2>(self, children)?;
        Ok(Expression::Div(Div::new(left, right)))
    }

    fn debug_string(&self) -> String {
        format!(
            "({} / {})",
            self.left.debug_string(),
            self.right.debug_string()
        )
    }
}

impl fmt::Display for Div {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} / {})", self.left, self.right)
    }
}
