//! Arithmetic operators: `+`, `-`, `*`, `DIV` and `%`.
//!
//! The result type follows MySQL's promotion rules (see [`Arithmetic`]'s
//! `sql_type`). Operands that cannot be read as the result type are replaced
//! by an "absent" marker and a 1292 warning instead of failing the query.

use crate::expression::error::{ExpressionError, ExpressionResult};
use crate::expression::expr::{take_children, Expression, ExpressionOps};
use crate::expression::interval::TimeDelta;
use crate::expression::operator::ArithmeticOperator;
use crate::expression::transform::exists;
use crate::session::{Context, ER_DATETIME_FUNCTION_OVERFLOW, ER_DIVISION_BY_ZERO};
use crate::types::convert::to_decimal;
use crate::types::datetime::validate_time;
use crate::types::decimal::{
    decimal_rem, decimal_scale, div_to_scale, fits_decimal_range, format_decimal,
    precision_and_scale, round_to_scale, Decimal, DECIMAL_MAX_SCALE,
};
use crate::types::{DecimalType, SqlType, Value};
use num_traits::Zero;
use std::fmt;

/// Binary arithmetic over two operands.
#[derive(Debug, Clone)]
pub struct Arithmetic {
    op: ArithmeticOperator,
    left: Box<Expression>,
    right: Box<Expression>,
}

/// An evaluated operand. Interval children produce an offset, not a value.
enum Operand {
    Value(Value),
    Delta(TimeDelta),
}

/// Outcome of converting an operand to the operation's type.
pub(crate) enum Coerced {
    Value(Value),
    /// Conversion failed; the operator decides what an absent side means.
    Absent,
    /// Conversion failed and the whole result is NULL.
    Null,
}

impl Arithmetic {
    pub fn new(op: ArithmeticOperator, left: Expression, right: Expression) -> Self {
        Self {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn op(&self) -> ArithmeticOperator {
        self.op
    }

    pub fn left(&self) -> &Expression {
        &self.left
    }

    pub fn right(&self) -> &Expression {
        &self.right
    }

    fn has_interval(&self) -> bool {
        matches!(*self.left, Expression::Interval(_))
            || matches!(*self.right, Expression::Interval(_))
    }

    fn has_float_field(&self) -> bool {
        subtree_has_float_field(&self.left) || subtree_has_float_field(&self.right)
    }

    /// Result type for the given operand types.
    fn type_for(&self, lt: &SqlType, rt: &SqlType) -> SqlType {
        match self.op {
            ArithmeticOperator::Plus | ArithmeticOperator::Minus | ArithmeticOperator::Mult => {
                if self.has_interval() {
                    return SqlType::Datetime;
                }
                if lt.is_time() && rt.is_time() {
                    return SqlType::Int64;
                }
                if lt.is_integer() && rt.is_integer() {
                    return integer_type(lt, rt);
                }
                if !lt.is_number() || !rt.is_number() {
                    return SqlType::Float64;
                }
                if lt.is_float() || rt.is_float() || self.has_float_field() {
                    return SqlType::Float64;
                }
                if self.op == ArithmeticOperator::Mult {
                    let (lw, ls) = operand_digits(&self.left, lt);
                    let (rw, rs) = operand_digits(&self.right, rt);
                    SqlType::decimal(lw + rw + ls + rs, ls + rs)
                } else {
                    let mut digits = (0, 0);
                    additive_digits(&self.left, &mut digits);
                    additive_digits(&self.right, &mut digits);
                    let (whole, scale) = digits;
                    SqlType::decimal(whole + scale + 1, scale)
                }
            }
            ArithmeticOperator::IntDiv => integer_type(lt, rt),
            ArithmeticOperator::Mod => {
                if lt.is_integer() && rt.is_integer() {
                    return integer_type(lt, rt);
                }
                if !lt.is_number()
                    || !rt.is_number()
                    || lt.is_float()
                    || rt.is_float()
                    || self.has_float_field()
                {
                    return SqlType::Float64;
                }
                let (lw, ls) = operand_digits(&self.left, lt);
                let (rw, rs) = operand_digits(&self.right, rt);
                let scale = ls.max(rs);
                SqlType::decimal(lw.max(rw) + scale, scale)
            }
        }
    }

    fn eval_values(&self, ctx: &Context, l: Value, r: Value) -> ExpressionResult<Value> {
        let lt = resolve_type(self.left.sql_type(), &l);
        let rt = resolve_type(self.right.sql_type(), &r);
        let typ = self.type_for(&lt, &rt);
        match self.op {
            ArithmeticOperator::IntDiv => self.eval_int_div(ctx, &lt, &rt, &typ, l, r),
            ArithmeticOperator::Mod => self.eval_mod(ctx, &typ, l, r),
            _ => {
                let target = if lt.is_time() && rt.is_time() {
                    SqlType::Datetime
                } else {
                    widen(&typ)
                };
                self.eval_additive(ctx, &target, &typ, l, r)
            }
        }
    }

    fn eval_additive(
        &self,
        ctx: &Context,
        target: &SqlType,
        typ: &SqlType,
        l: Value,
        r: Value,
    ) -> ExpressionResult<Value> {
        let l = match coerce_operand(ctx, target, &l)? {
            Coerced::Value(v) => Some(v),
            Coerced::Absent => None,
            Coerced::Null => return Ok(Value::Null),
        };
        let r = match coerce_operand(ctx, target, &r)? {
            Coerced::Value(v) => Some(v),
            Coerced::Absent => None,
            Coerced::Null => return Ok(Value::Null),
        };

        match (self.op, l, r) {
            (_, Some(l), Some(r)) => self.combine(l, r),
            (ArithmeticOperator::Mult, _, _) => Ok(typ.zero()),
            (_, Some(l), None) => Ok(l),
            (ArithmeticOperator::Plus, None, Some(r)) => Ok(r),
            (ArithmeticOperator::Minus, None, Some(r)) => negate(r),
            _ => Ok(typ.zero()),
        }
    }

    fn combine(&self, l: Value, r: Value) -> ExpressionResult<Value> {
        use ArithmeticOperator::*;
        let op = self.op;
        match (l, r) {
            (Value::Uint64(a), Value::Uint64(b)) => Ok(Value::Uint64(match op {
                Plus => a.wrapping_add(b),
                Minus => a.wrapping_sub(b),
                _ => a.wrapping_mul(b),
            })),
            (Value::Int64(a), Value::Int64(b)) => Ok(Value::Int64(match op {
                Plus => a.wrapping_add(b),
                Minus => a.wrapping_sub(b),
                _ => a.wrapping_mul(b),
            })),
            (Value::Float64(a), Value::Float64(b)) => Ok(Value::Float64(match op {
                Plus => a + b,
                Minus => a - b,
                _ => a * b,
            })),
            (Value::Decimal(a), Value::Decimal(b)) => {
                let result = match op {
                    Plus => &a + &b,
                    Minus => &a - &b,
                    _ => &a * &b,
                };
                if !fits_decimal_range(&result) {
                    return Err(ExpressionError::ValueOutOfRange {
                        value: format!("({} {} {})", format_decimal(&a), op, format_decimal(&b)),
                        target: "decimal".to_string(),
                    });
                }
                Ok(Value::Decimal(cap_scale(result)))
            }
            (Value::Datetime(a), Value::Datetime(b)) if op != Mult => {
                let (a, b) = (a.and_utc().timestamp(), b.and_utc().timestamp());
                Ok(Value::Int64(if op == Plus { a + b } else { a - b }))
            }
            (l, r) => Err(unable_to_cast(&l, &r)),
        }
    }

    fn eval_interval(
        &self,
        ctx: &Context,
        value: Value,
        delta: TimeDelta,
        delta_first: bool,
    ) -> ExpressionResult<Value> {
        let subtract = match self.op {
            ArithmeticOperator::Plus => false,
            ArithmeticOperator::Minus if !delta_first => true,
            _ => {
                return Err(ExpressionError::UnableToCast {
                    left: if delta_first {
                        "interval".into()
                    } else {
                        value.sql_type().to_string()
                    },
                    right: if delta_first {
                        value.sql_type().to_string()
                    } else {
                        "interval".into()
                    },
                })
            }
        };

        let t = match coerce_operand(ctx, &SqlType::Datetime, &value)? {
            Coerced::Value(Value::Datetime(t)) => t,
            _ => return Ok(Value::Null),
        };
        let result = if subtract { delta.sub(t)? } else { delta.add(t)? };
        match validate_time(result) {
            Some(t) => Ok(Value::Datetime(t)),
            None => {
                ctx.warn(
                    ER_DATETIME_FUNCTION_OVERFLOW,
                    "Datetime function: datetime field overflow",
                );
                Ok(Value::Null)
            }
        }
    }

    fn eval_int_div(
        &self,
        ctx: &Context,
        lt: &SqlType,
        rt: &SqlType,
        typ: &SqlType,
        l: Value,
        r: Value,
    ) -> ExpressionResult<Value> {
        let integral = lt.is_integer() && rt.is_integer();
        let target = if integral {
            typ.clone()
        } else {
            SqlType::Decimal(DecimalType::max())
        };

        let (l, r) = match coerce_pair(ctx, &target, &l, &r)? {
            Some(pair) => pair,
            None => return Ok(Value::Null),
        };
        let (l, r) = match (l, r) {
            (_, None) => return Ok(Value::Null),
            (None, Some(_)) => return Ok(typ.zero()),
            (Some(l), Some(r)) => (l, r),
        };
        if is_zero_value(&r) {
            return division_by_zero(ctx);
        }

        match (l, r) {
            (Value::Uint64(a), Value::Uint64(b)) => Ok(Value::Uint64(a / b)),
            (Value::Int64(a), Value::Int64(b)) => Ok(Value::Int64(a.wrapping_div(b))),
            (Value::Decimal(a), Value::Decimal(b)) => {
                let quotient = div_to_scale(&a, &b, 0).ok_or_else(|| {
                    ExpressionError::ValueOutOfRange {
                        value: format!("({} div {})", format_decimal(&a), format_decimal(&b)),
                        target: typ.to_string(),
                    }
                })?;
                let (v, _) = typ.convert(&Value::Decimal(quotient))?;
                Ok(v)
            }
            (l, r) => Err(unable_to_cast(&l, &r)),
        }
    }

    fn eval_mod(
        &self,
        ctx: &Context,
        typ: &SqlType,
        l: Value,
        r: Value,
    ) -> ExpressionResult<Value> {
        let (l, r) = match coerce_pair(ctx, &widen(typ), &l, &r)? {
            Some(pair) => pair,
            None => return Ok(Value::Null),
        };
        let (l, r) = match (l, r) {
            (_, None) => return Ok(Value::Null),
            (None, Some(_)) => return Ok(typ.zero()),
            (Some(l), Some(r)) => (l, r),
        };
        if is_zero_value(&r) {
            return division_by_zero(ctx);
        }

        match (l, r) {
            (Value::Uint64(a), Value::Uint64(b)) => Ok(Value::Uint64(a % b)),
            (Value::Int64(a), Value::Int64(b)) => Ok(Value::Int64(a.wrapping_rem(b))),
            (Value::Float64(a), Value::Float64(b)) => Ok(Value::Float64(a % b)),
            (Value::Decimal(a), Value::Decimal(b)) => decimal_rem(&a, &b)
                .map(Value::Decimal)
                .ok_or_else(|| ExpressionError::ValueOutOfRange {
                    value: format!("({} % {})", format_decimal(&a), format_decimal(&b)),
                    target: typ.to_string(),
                }),
            (l, r) => Err(unable_to_cast(&l, &r)),
        }
    }
}

impl ExpressionOps for Arithmetic {
    fn eval(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Value> {
        let left = eval_operand(ctx, &self.left, row)?;
        let right = eval_operand(ctx, &self.right, row)?;
        match (left, right) {
            (Operand::Value(Value::Null), _) | (_, Operand::Value(Value::Null)) => Ok(Value::Null),
            (Operand::Value(l), Operand::Value(r)) => self.eval_values(ctx, l, r),
            (Operand::Value(v), Operand::Delta(d)) => self.eval_interval(ctx, v, d, false),
            (Operand::Delta(d), Operand::Value(v)) => self.eval_interval(ctx, v, d, true),
            (Operand::Delta(_), Operand::Delta(_)) => Err(ExpressionError::UnableToCast {
                left: "interval".to_string(),
                right: "interval".to_string(),
            }),
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
        self.left.is_nullable()
            || self.right.is_nullable()
            || self.has_interval()
            || matches!(self.op, ArithmeticOperator::IntDiv | ArithmeticOperator::Mod)
    }

    fn children(&self) -> Vec<&Expression> {
        vec![&self.left, &self.right]
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        let [left, right] = take_children::<2>(self, children)?;
        Ok(Expression::Arithmetic(Arithmetic::new(self.op, left, right)))
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

impl fmt::Display for Arithmetic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.left, self.op, self.right)
    }
}

fn eval_operand(ctx: &Context, expr: &Expression, row: &[Value]) -> ExpressionResult<Operand> {
    match expr {
        Expression::Interval(interval) => Ok(match interval.eval_delta(ctx, row)? {
            Some(delta) => Operand::Delta(delta),
            None => Operand::Value(Value::Null),
        }),
        other => other.eval(ctx, row).map(Operand::Value),
    }
}

/// Convert `value` for an arithmetic operator. Failures warn with 1292; a
/// JSON target raises and a date target makes the result NULL.
pub(crate) fn coerce_operand(
    ctx: &Context,
    target: &SqlType,
    value: &Value,
) -> ExpressionResult<Coerced> {
    match target.convert(value) {
        Ok((converted, _)) => Ok(Coerced::Value(converted)),
        Err(err) if target.is_json() => Err(err.into()),
        Err(err) => {
            log::debug!("cannot use {} as {}: {}", value, target, err);
            ctx.warn_truncated(target, value);
            if matches!(target, SqlType::Date | SqlType::Datetime) {
                Ok(Coerced::Null)
            } else {
                Ok(Coerced::Absent)
            }
        }
    }
}

/// Coerce both operands; `None` when either side forces a NULL result.
fn coerce_pair(
    ctx: &Context,
    target: &SqlType,
    l: &Value,
    r: &Value,
) -> ExpressionResult<Option<(Option<Value>, Option<Value>)>> {
    let l = match coerce_operand(ctx, target, l)? {
        Coerced::Value(v) => Some(v),
        Coerced::Absent => None,
        Coerced::Null => return Ok(None),
    };
    let r = match coerce_operand(ctx, target, r)? {
        Coerced::Value(v) => Some(v),
        Coerced::Absent => None,
        Coerced::Null => return Ok(None),
    };
    Ok(Some((l, r)))
}

/// Emit the 1365 warning and return NULL.
pub(crate) fn division_by_zero(ctx: &Context) -> ExpressionResult<Value> {
    ctx.warn(ER_DIVISION_BY_ZERO, "Division by 0");
    Ok(Value::Null)
}

/// Products carry the sum of both scales; keep at most the widest DECIMAL
/// scale.
fn cap_scale(d: Decimal) -> Decimal {
    if decimal_scale(&d) > DECIMAL_MAX_SCALE as u32 {
        round_to_scale(&d, DECIMAL_MAX_SCALE as u32)
    } else {
        d
    }
}

pub(crate) fn is_zero_value(value: &Value) -> bool {
    match value {
        Value::Int64(v) => *v == 0,
        Value::Uint64(v) => *v == 0,
        Value::Float64(f) => *f == 0.0,
        Value::Decimal(d) => d.is_zero(),
        _ => false,
    }
}

pub(crate) fn subtree_has_float_field(expr: &Expression) -> bool {
    exists(expr, Expression::is_float_field)
}

pub(crate) fn unable_to_cast(l: &Value, r: &Value) -> ExpressionError {
    ExpressionError::UnableToCast {
        left: l.sql_type().to_string(),
        right: r.sql_type().to_string(),
    }
}

/// Static type, or the value's own type when the static one is unknown.
pub(crate) fn resolve_type(static_type: SqlType, value: &Value) -> SqlType {
    if static_type.is_deferred() || static_type.is_null() {
        value.sql_type()
    } else {
        static_type
    }
}

fn integer_type(lt: &SqlType, rt: &SqlType) -> SqlType {
    if lt.is_unsigned() && rt.is_unsigned() {
        SqlType::Uint64
    } else {
        SqlType::Int64
    }
}

/// Operands are converted at full decimal width so they keep their own
/// scale; the declared result type only describes the column.
fn widen(typ: &SqlType) -> SqlType {
    match typ {
        SqlType::Decimal(_) => SqlType::Decimal(DecimalType::max()),
        other => other.clone(),
    }
}

fn negate(value: Value) -> ExpressionResult<Value> {
    Ok(match value {
        Value::Int64(v) => Value::Int64(v.wrapping_neg()),
        Value::Uint64(v) => Value::Uint64(v.wrapping_neg()),
        Value::Float64(f) => Value::Float64(-f),
        Value::Decimal(d) => Value::Decimal(-d),
        other => {
            return Err(ExpressionError::UnableToEval {
                left: String::new(),
                op: "-".to_string(),
                right: other.to_string(),
            })
        }
    })
}

/// Whole and fractional digits of an operand: a literal's own value, or
/// the width of its declared type.
fn operand_digits(expr: &Expression, typ: &SqlType) -> (u32, u32) {
    if let Expression::Literal(lit) = expr {
        if let Ok(d) = to_decimal(&lit.value, typ) {
            let (precision, scale) = precision_and_scale(&d);
            return (precision - scale, scale);
        }
    }
    type_digits(typ)
}

fn type_digits(typ: &SqlType) -> (u32, u32) {
    match typ {
        SqlType::Decimal(d) => ((d.precision() - d.scale()) as u32, d.scale() as u32),
        SqlType::Boolean => (1, 0),
        SqlType::Int8 | SqlType::Uint8 => (3, 0),
        SqlType::Int16 | SqlType::Uint16 => (5, 0),
        SqlType::Int24 | SqlType::Uint24 => (8, 0),
        SqlType::Int32 | SqlType::Uint32 => (10, 0),
        SqlType::Int64 => (19, 0),
        SqlType::Uint64 => (20, 0),
        _ => (0, 0),
    }
}

/// Maximum whole and fractional digits over the operands of a `+`/`-`
/// chain.
fn additive_digits(expr: &Expression, acc: &mut (u32, u32)) {
    match expr {
        Expression::Arithmetic(a)
            if matches!(a.op, ArithmeticOperator::Plus | ArithmeticOperator::Minus) =>
        {
            additive_digits(&a.left, acc);
            additive_digits(&a.right, acc);
        }
        other => {
            let (whole, scale) = operand_digits(other, &other.sql_type());
            acc.0 = acc.0.max(whole);
            acc.1 = acc.1.max(scale);
        }
    }
}
