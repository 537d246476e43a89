//! Bitwise operators: `&`, `|`, `^`, `<<` and `>>`.

use crate::expression::arithmetic::{coerce_operand, resolve_type, Coerced};
use crate::expression::error::ExpressionResult;
use crate::expression::expr::{take_children, Expression, ExpressionOps};
use crate::expression::operator::BitOperator;
use crate::session::Context;
use crate::types::{SqlType, Value};
use std::fmt;

/// Bitwise operation. The result is always BIGINT UNSIGNED.
#[derive(Debug, Clone)]
pub struct BitOp {
    op: BitOperator,
    left: Box<Expression>,
    right: Box<Expression>,
}

impl BitOp {
    pub fn new(op: BitOperator, left: Expression, right: Expression) -> Self {
        Self {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn op(&self) -> BitOperator {
        self.op
    }

    /// Operand bit pattern, or `None` when the operand is NULL or unreadable.
    fn bits(
        &self,
        ctx: &Context,
        target: &SqlType,
        value: &Value,
    ) -> ExpressionResult<Option<u64>> {
        if value.is_null() {
            ctx.warn_truncated(target, value);
            return Ok(None);
        }
        Ok(match coerce_operand(ctx, target, value)? {
            Coerced::Value(Value::Uint64(u)) => Some(u),
            Coerced::Value(Value::Int64(i)) => Some(i as u64),
            // half away from zero, then two's complement
            Coerced::Value(Value::Float64(f)) => Some(f.round() as i64 as u64),
            _ => None,
        })
    }
}

/// Type both operands are read as before taking their bits.
fn conversion_type(lt: &SqlType, rt: &SqlType) -> SqlType {
    if lt.is_unsigned() && rt.is_unsigned() {
        SqlType::Uint64
    } else if lt.is_signed() && rt.is_signed() {
        SqlType::Int64
    } else {
        SqlType::Float64
    }
}

impl ExpressionOps for BitOp {
    fn eval(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Value> {
        let l = self.left.eval(ctx, row)?;
        let r = self.right.eval(ctx, row)?;
        let target = conversion_type(
            &resolve_type(self.left.sql_type(), &l),
            &resolve_type(self.right.sql_type(), &r),
        );
        let l = self.bits(ctx, &target, &l)?;
        let r = self.bits(ctx, &target, &r)?;

        let result = match (self.op, l, r) {
            (BitOperator::And, Some(l), Some(r)) => l & r,
            (BitOperator::And, _, _) => 0,
            (BitOperator::Or, Some(l), Some(r)) => l | r,
            (BitOperator::Xor, Some(l), Some(r)) => l ^ r,
            (BitOperator::Or | BitOperator::Xor, l, r) => l.or(r).unwrap_or(0),
            // Shifting by the full width or more clears every bit.
            (BitOperator::ShiftLeft, Some(l), Some(r)) => {
                l.checked_shl(shift_amount(r)).unwrap_or(0)
            }
            (BitOperator::ShiftRight, Some(l), Some(r)) => {
                l.checked_shr(shift_amount(r)).unwrap_or(0)
            }
            (_, None, _) => 0,
            (_, Some(l), None) => l,
        };
        Ok(Value::Uint64(result))
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
        SqlType::Uint64
    }

    fn is_nullable(&self) -> bool {
        false
    }

    fn children(&self) -> Vec<&Expression> {
        vec![&self.left, &self.right]
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        let [left, right] = take_children::<2>(self, children)?;
        Ok(Expression::BitOp(BitOp::new(self.op, left, right)))
    }

    fn debug_string(&self) -> String {
        format!(
            "({} {} {})",
            self.left.debug_string(),
            self.op,
            self.right.debug_string()
        )
    }
}

/// Shift count for the checked shifts, saturating at `u32::MAX`.
fn shift_amount(r: u64) -> u32 {
    u32::try_from(r).unwrap_or(u32::MAX)
}

impl fmt::Display for BitOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.left, self.op, self.right)
    }
}
