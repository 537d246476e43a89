//! Placeholders the analyzer replaces before execution.

use crate::expression::error::{ExpressionError, ExpressionResult};
use crate::expression::expr::{take_children, Expression, ExpressionOps};
use crate::session::Context;
use crate::types::{SqlType, Value};
use std::fmt;

/// Column referenced by name, not yet mapped to a row index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedColumn {
    pub table: Option<String>,
    pub name: String,
}

impl UnresolvedColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }
}

impl ExpressionOps for UnresolvedColumn {
    fn eval(&self, _ctx: &Context, _row: &[Value]) -> ExpressionResult<Value> {
        Err(ExpressionError::NotEvaluable {
            expression: self.to_string(),
        })
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Deferred
    }

    fn is_nullable(&self) -> bool {
        true
    }

    fn resolved(&self) -> bool {
        false
    }

    fn children(&self) -> Vec<&Expression> {
        Vec::new()
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        take_children::<0>(self, children)?;
        Ok(Expression::UnresolvedColumn(self.clone()))
    }

    fn debug_string(&self) -> String {
        format!("{} (unresolved)", self)
    }
}

impl fmt::Display for UnresolvedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Function call whose implementation has not been looked up.
#[derive(Debug, Clone)]
pub struct UnresolvedFunction {
    pub name: String,
    args: Vec<Expression>,
}

impl UnresolvedFunction {
    pub fn new(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn args(&self) -> &[Expression] {
        &self.args
    }
}

impl ExpressionOps for UnresolvedFunction {
    fn eval(&self, _ctx: &Context, _row: &[Value]) -> ExpressionResult<Value> {
        Err(ExpressionError::NotEvaluable {
            expression: self.to_string(),
        })
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Deferred
    }

    fn is_nullable(&self) -> bool {
        true
    }

    fn resolved(&self) -> bool {
        false
    }

    fn children(&self) -> Vec<&Expression> {
        self.args.iter().collect()
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        if children.len() != self.args.len() {
            return Err(ExpressionError::InvalidChildrenNumber {
                expression: self.to_string(),
                got: children.len(),
                expected: self.args.len(),
            });
        }
        Ok(Expression::UnresolvedFunction(UnresolvedFunction::new(
            self.name.clone(),
            children,
        )))
    }

    fn debug_string(&self) -> String {
        let args: Vec<String> = self.args.iter().map(|a| a.debug_string()).collect();
        format!("{}({}) (unresolved)", self.name, args.join(", "))
    }
}

impl fmt::Display for UnresolvedFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
        write!(f, "{}({})", self.name, args.join(", "))
    }
}
