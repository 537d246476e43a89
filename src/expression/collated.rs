//! `expr COLLATE name`: overrides the collation used when the child is
//! compared or matched.

use crate::expression::error::{ExpressionError, ExpressionResult};
use crate::expression::expr::{take_children, Expression, ExpressionOps};
use crate::session::Context;
use crate::types::convert::to_text;
use crate::types::{Collation, SqlType, Value};
use std::fmt;

/// `child COLLATE collation`
#[derive(Debug, Clone)]
pub struct Collated {
    child: Box<Expression>,
    collation: Collation,
}

impl Collated {
    /// Fails when the child's character set does not match the collation's.
    pub fn new(child: Expression, collation: Collation) -> ExpressionResult<Self> {
        let charset = collation.character_set();
        if let Some(current) = child.sql_type().collation() {
            if current.character_set() != charset {
                return Err(ExpressionError::CollationMismatch {
                    collation: collation.name().to_string(),
                    charset: current.character_set().name().to_string(),
                });
            }
        }
        Ok(Self {
            child: Box::new(child),
            collation,
        })
    }

    pub fn from_name(child: Expression, name: &str) -> ExpressionResult<Self> {
        let collation = Collation::from_name(name)
            .ok_or_else(|| ExpressionError::UnknownCollation(name.to_string()))?;
        Self::new(child, collation)
    }

    pub fn child(&self) -> &Expression {
        &self.child
    }

    pub fn collation(&self) -> Collation {
        self.collation
    }
}

/// Collation named explicitly on `expr`, which wins over any collation
/// derived from operand types.
pub(crate) fn explicit_collation(expr: &Expression) -> Option<Collation> {
    match expr {
        Expression::Collated(c) => Some(c.collation),
        _ => None,
    }
}

impl ExpressionOps for Collated {
    fn eval(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Value> {
        let v = self.child.eval(ctx, row)?;
        Ok(match v {
            Value::Null | Value::Text(_) | Value::Bytes(_) => v,
            other => Value::Text(to_text(&other)),
        })
    }

    fn sql_type(&self) -> SqlType {
        self.child.sql_type().with_collation(self.collation)
    }

    fn is_nullable(&self) -> bool {
        self.child.is_nullable()
    }

    fn children(&self) -> Vec<&Expression> {
        vec![&self.child]
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        let [child] = take_children::<1>(self, children)?;
        Ok(Expression::Collated(Collated::new(child, self.collation)?))
    }

    fn debug_string(&self) -> String {
        format!("{} COLLATE {}", self.child.debug_string(), self.collation)
    }
}

impl fmt::Display for Collated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} COLLATE {}", self.child, self.collation)
    }
}
