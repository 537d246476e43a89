//! Expression tree definitions.
//!
//! Every node kind is its own struct implementing [`ExpressionOps`];
//! [`Expression`] is the closed sum over all of them and forwards each call
//! to the wrapped node.

use crate::expression::arithmetic::Arithmetic;
use crate::expression::between::Between;
use crate::expression::bit_ops::BitOp;
use crate::expression::collated::Collated;
use crate::expression::comparison::Comparison;
use crate::expression::convert::Convert;
use crate::expression::div::Div;
use crate::expression::error::{ExpressionError, ExpressionResult};
use crate::expression::get_field::GetField;
use crate::expression::in_tuple::{HashInTuple, InTuple};
use crate::expression::interval::Interval;
use crate::expression::like::Like;
use crate::expression::literal::Literal;
use crate::expression::logic::{Logic, Not};
use crate::expression::operator::{
    ArithmeticOperator, BitOperator, ComparisonOperator, LogicOperator,
};
use crate::expression::procedure::{ProcedureParam, UnresolvedProcedureParam};
use crate::expression::tuple::Tuple;
use crate::expression::unary::{IsNull, IsTrue, UnaryMinus};
use crate::expression::unresolved::{UnresolvedColumn, UnresolvedFunction};
use crate::session::Context;
use crate::types::{SqlType, Value};
use std::fmt;

/// Operations shared by every expression node.
pub trait ExpressionOps: fmt::Display {
    /// Evaluate against a row.
    fn eval(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Value>;

    /// Static result type, derived from the children without evaluating.
    fn sql_type(&self) -> SqlType;

    fn is_nullable(&self) -> bool;

    /// Whether the subtree is free of placeholders.
    fn resolved(&self) -> bool {
        self.children().iter().all(|c| c.resolved())
    }

    fn children(&self) -> Vec<&Expression>;

    /// Rebuild the node over new children. The count must match exactly.
    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression>;

    /// Verbose rendering including child types, used in plan dumps.
    fn debug_string(&self) -> String;
}

/// Expression tree node
#[derive(Debug, Clone)]
pub enum Expression {
    Literal(Literal),
    GetField(GetField),
    Tuple(Tuple),
    /// `+`, `-`, `*`, `DIV` and `%`
    Arithmetic(Arithmetic),
    Div(Div),
    BitOp(BitOp),
    UnaryMinus(UnaryMinus),
    Comparison(Comparison),
    Between(Between),
    InTuple(InTuple),
    HashInTuple(HashInTuple),
    Like(Like),
    /// `expr COLLATE name`
    Collated(Collated),
    IsNull(IsNull),
    IsTrue(IsTrue),
    Not(Not),
    Logic(Logic),
    Convert(Convert),
    Interval(Interval),
    ProcedureParam(ProcedureParam),
    UnresolvedProcedureParam(UnresolvedProcedureParam),
    UnresolvedColumn(UnresolvedColumn),
    UnresolvedFunction(UnresolvedFunction),
}

macro_rules! dispatch {
    ($self:ident, $node:ident => $body:expr) => {
        match $self {
            Expression::Literal($node) => $body,
            Expression::GetField($node) => $body,
            Expression::Tuple($node) => $body,
            Expression::Arithmetic($node) => $body,
            Expression::Div($node) => $body,
            Expression::BitOp($node) => $body,
            Expression::UnaryMinus($node) => $body,
            Expression::Comparison($node) => $body,
            Expression::Between($node) => $body,
            Expression::InTuple($node) => $body,
            Expression::HashInTuple($node) => $body,
            Expression::Like($node) => $body,
            Expression::Collated($node) => $body,
            Expression::IsNull($node) => $body,
            Expression::IsTrue($node) => $body,
            Expression::Not($node) => $body,
            Expression::Logic($node) => $body,
            Expression::Convert($node) => $body,
            Expression::Interval($node) => $body,
            Expression::ProcedureParam($node) => $body,
            Expression::UnresolvedProcedureParam($node) => $body,
            Expression::UnresolvedColumn($node) => $body,
            Expression::UnresolvedFunction($node) => $body,
        }
    };
}

impl ExpressionOps for Expression {
    fn eval(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Value> {
        dispatch!(self, node => node.eval(ctx, row))
    }

    fn sql_type(&self) -> SqlType {
        dispatch!(self, node => node.sql_type())
    }

    fn is_nullable(&self) -> bool {
        dispatch!(self, node => node.is_nullable())
    }

    fn resolved(&self) -> bool {
        dispatch!(self, node => node.resolved())
    }

    fn children(&self) -> Vec<&Expression> {
        dispatch!(self, node => node.children())
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        dispatch!(self, node => node.with_children(children))
    }

    fn debug_string(&self) -> String {
        dispatch!(self, node => node.debug_string())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, node => fmt::Display::fmt(node, f))
    }
}

/// Move exactly `N` children out of `children`, or fail with
/// [`ExpressionError::InvalidChildrenNumber`] naming `expr`.
pub(crate) fn take_children<const N: usize>(
    expr: &dyn fmt::Display,
    children: Vec<Expression>,
) -> ExpressionResult<[Expression; N]> {
    let got = children.len();
    children
        .try_into()
        .map_err(|_| ExpressionError::InvalidChildrenNumber {
            expression: expr.to_string(),
            got,
            expected: N,
        })
}

impl Expression {
    /// Create a literal expression typed from its value
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(Literal::new(value.into()))
    }

    /// Create a literal with an explicit type
    pub fn typed_literal(value: Value, sql_type: SqlType) -> Self {
        Expression::Literal(Literal::with_type(value, sql_type))
    }

    pub fn null() -> Self {
        Expression::Literal(Literal::new(Value::Null))
    }

    /// Create a column reference expression
    pub fn column(index: usize, sql_type: SqlType, name: impl Into<String>) -> Self {
        Expression::GetField(GetField::new(index, sql_type, name))
    }

    pub fn tuple(elements: Vec<Expression>) -> Self {
        Expression::Tuple(Tuple::new(elements))
    }

    pub fn arithmetic(op: ArithmeticOperator, left: Expression, right: Expression) -> Self {
        Expression::Arithmetic(Arithmetic::new(op, left, right))
    }

    pub fn plus(left: Expression, right: Expression) -> Self {
        Self::arithmetic(ArithmeticOperator::Plus, left, right)
    }

    pub fn minus(left: Expression, right: Expression) -> Self {
        Self::arithmetic(ArithmeticOperator::Minus, left, right)
    }

    pub fn mult(left: Expression, right: Expression) -> Self {
        Self::arithmetic(ArithmeticOperator::Mult, left, right)
    }

    pub fn int_div(left: Expression, right: Expression) -> Self {
        Self::arithmetic(ArithmeticOperator::IntDiv, left, right)
    }

    pub fn modulo(left: Expression, right: Expression) -> Self {
        Self::arithmetic(ArithmeticOperator::Mod, left, right)
    }

    /// Create a decimal division expression (`/`)
    pub fn div_expr(left: Expression, right: Expression) -> Self {
        Expression::Div(Div::new(left, right))
    }

    pub fn bit_op(op: BitOperator, left: Expression, right: Expression) -> Self {
        Expression::BitOp(BitOp::new(op, left, right))
    }

    pub fn unary_minus(child: Expression) -> Self {
        Expression::UnaryMinus(UnaryMinus::new(child))
    }

    pub fn comparison(op: ComparisonOperator, left: Expression, right: Expression) -> Self {
        Expression::Comparison(Comparison::new(op, left, right))
    }

    /// Create an equality expression
    pub fn eq(left: Expression, right: Expression) -> Self {
        Self::comparison(ComparisonOperator::Equals, left, right)
    }

    /// Create a not-equal expression, `NOT(l = r)`
    pub fn ne(left: Expression, right: Expression) -> Self {
        Self::not_expr(Self::eq(left, right))
    }

    /// Create a NULL-safe equality expression (`<=>`)
    pub fn null_safe_eq(left: Expression, right: Expression) -> Self {
        Self::comparison(ComparisonOperator::NullSafeEquals, left, right)
    }

    pub fn lt(left: Expression, right: Expression) -> Self {
        Self::comparison(ComparisonOperator::LessThan, left, right)
    }

    pub fn le(left: Expression, right: Expression) -> Self {
        Self::comparison(ComparisonOperator::LessThanOrEqual, left, right)
    }

    pub fn gt(left: Expression, right: Expression) -> Self {
        Self::comparison(ComparisonOperator::GreaterThan, left, right)
    }

    pub fn ge(left: Expression, right: Expression) -> Self {
        Self::comparison(ComparisonOperator::GreaterThanOrEqual, left, right)
    }

    /// Create an AND expression
    pub fn and(left: Expression, right: Expression) -> Self {
        Expression::Logic(Logic::new(LogicOperator::And, left, right))
    }

    /// Create an OR expression
    pub fn or(left: Expression, right: Expression) -> Self {
        Expression::Logic(Logic::new(LogicOperator::Or, left, right))
    }

    pub fn xor(left: Expression, right: Expression) -> Self {
        Expression::Logic(Logic::new(LogicOperator::Xor, left, right))
    }

    /// Create a NOT expression
    pub fn not_expr(child: Expression) -> Self {
        Expression::Not(Not::new(child))
    }

    pub fn is_null(child: Expression) -> Self {
        Expression::IsNull(IsNull::new(child))
    }

    /// `NOT(x IS NULL)`
    pub fn is_not_null(child: Expression) -> Self {
        Self::not_expr(Self::is_null(child))
    }

    pub fn is_true(child: Expression) -> Self {
        Expression::IsTrue(IsTrue::new(child, true))
    }

    pub fn is_false(child: Expression) -> Self {
        Expression::IsTrue(IsTrue::new(child, false))
    }

    pub fn between(value: Expression, lower: Expression, upper: Expression) -> Self {
        Expression::Between(Between::new(value, lower, upper))
    }

    pub fn in_tuple(left: Expression, right: Expression) -> Self {
        Expression::InTuple(InTuple::new(left, right))
    }

    pub fn like(left: Expression, pattern: Expression) -> Self {
        Expression::Like(Like::new(left, pattern))
    }

    /// `child COLLATE name`; fails on unknown names and on a collation of
    /// another character set.
    pub fn collate(child: Expression, name: &str) -> ExpressionResult<Self> {
        Ok(Expression::Collated(Collated::from_name(child, name)?))
    }

    /// Whether this node is a column reference with a floating point type.
    pub(crate) fn is_float_field(&self) -> bool {
        matches!(self, Expression::GetField(f) if f.sql_type().is_float())
    }
}

impl From<Literal> for Expression {
    fn from(literal: Literal) -> Self {
        Expression::Literal(literal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_children_arity() {
        let node = Expression::literal(1i64);
        let children = vec![Expression::literal(1i64), Expression::literal(2i64)];
        let [a, b] = take_children::<2>(&node, children).unwrap();
        assert_eq!(a.to_string(), "1");
        assert_eq!(b.to_string(), "2");

        let err = take_children::<2>(&node, vec![Expression::null()]).unwrap_err();
        assert_eq!(
            err,
            ExpressionError::InvalidChildrenNumber {
                expression: "1".to_string(),
                got: 1,
                expected: 2,
            }
        );
    }

    #[test]
    fn test_builders_render() {
        let col = Expression::column(0, SqlType::Int64, "a");
        let expr = Expression::and(
            Expression::gt(col.clone(), Expression::literal(10i64)),
            Expression::is_not_null(col),
        );
        assert_eq!(expr.to_string(), "(a > 10 AND NOT(a IS NULL))");
        assert_eq!(expr.children().len(), 2);
        assert!(expr.resolved());
    }

    #[test]
    fn test_expression_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Expression>();
    }
}
