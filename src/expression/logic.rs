//! Three-valued boolean logic.

use crate::expression::error::ExpressionResult;
use crate::expression::expr::{take_children, Expression, ExpressionOps};
use crate::expression::operator::LogicOperator;
use crate::session::Context;
use crate::types::{SqlType, Value};
use std::fmt;

fn truth_value(truth: Option<bool>) -> Value {
    truth.map(Value::Boolean).unwrap_or(Value::Null)
}

/// `NOT x`
#[derive(Debug, Clone)]
pub struct Not {
    child: Box<Expression>,
}

impl Not {
    pub fn new(child: Expression) -> Self {
        Self {
            child: Box::new(child),
        }
    }

    pub fn child(&self) -> &Expression {
        &self.child
    }
}

impl ExpressionOps for Not {
    fn eval(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Value> {
        let truth = self.child.eval(ctx, row)?.truthiness();
        Ok(truth_value(truth.map(|b| !b)))
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Boolean
    }

    fn is_nullable(&self) -> bool {
        self.child.is_nullable()
    }

    fn children(&self) -> Vec<&Expression> {
        vec![&self.child]
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        let [child] = take_children::<1>(self, children)?;
        Ok(Expression::Not(Not::new(child)))
    }

    fn debug_string(&self) -> String {
        format!("NOT({})", self.child.debug_string())
    }
}

impl fmt::Display for Not {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NOT({})", self.child)
    }
}

/// `AND`, `OR` and `XOR`.
#[derive(Debug, Clone)]
pub struct Logic {
    op: LogicOperator,
    left: Box<Expression>,
    right: Box<Expression>,
}

impl Logic {
    pub fn new(op: LogicOperator, left: Expression, right: Expression) -> Self {
        Self {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn op(&self) -> LogicOperator {
        self.op
    }

    pub fn left(&self) -> &Expression {
        &self.left
    }

    pub fn right(&self) -> &Expression {
        &self.right
    }
}

impl ExpressionOps for Logic {
    fn eval(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Value> {
        let l = self.left.eval(ctx, row)?.truthiness();
        // the right side is skipped once the left decides the result
        match (self.op, l) {
            (LogicOperator::And, Some(false)) => return Ok(Value::Boolean(false)),
            (LogicOperator::Or, Some(true)) => return Ok(Value::Boolean(true)),
            _ => {}
        }
        let r = self.right.eval(ctx, row)?.truthiness();

        let truth = match (self.op, l, r) {
            (LogicOperator::And, _, Some(false)) => Some(false),
            (LogicOperator::And, Some(true), Some(true)) => Some(true),
            (LogicOperator::Or, _, Some(true)) => Some(true),
            (LogicOperator::Or, Some(false), Some(false)) => Some(false),
            (LogicOperator::Xor, Some(l), Some(r)) => Some(l ^ r),
            _ => None,
        };
        Ok(truth_value(truth))
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Boolean
    }

    fn is_nullable(&self) -> bool {
        self.left.is_nullable() || self.right.is_nullable()
    }

    fn children(&self) -> Vec<&Expression> {
        vec![&self.left, &self.right]
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        let [left, right] = take_children::<2>(self, children)?;
        Ok(Expression::Logic(Logic::new(self.op, left, right)))
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

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.left, self.op, self.right)
    }
}
