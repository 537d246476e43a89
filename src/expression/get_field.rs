//! Column references.

use crate::expression::error::{ExpressionError, ExpressionResult};
use crate::expression::expr::{take_children, Expression, ExpressionOps};
use crate::session::Context;
use crate::types::{SqlType, Value};
use std::fmt;

/// Reads the column at `index` of the current row.
#[derive(Debug, Clone, PartialEq)]
pub struct GetField {
    /// Column index in the row (0-based)
    pub index: usize,
    sql_type: SqlType,
    pub table: Option<String>,
    pub name: String,
    pub nullable: bool,
}

impl GetField {
    pub fn new(index: usize, sql_type: SqlType, name: impl Into<String>) -> Self {
        Self {
            index,
            sql_type,
            table: None,
            name: name.into(),
            nullable: true,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

impl ExpressionOps for GetField {
    fn eval(&self, _ctx: &Context, row: &[Value]) -> ExpressionResult<Value> {
        row.get(self.index)
            .cloned()
            .ok_or(ExpressionError::ColumnIndexOutOfBounds {
                index: self.index,
                row_len: row.len(),
            })
    }

    fn sql_type(&self) -> SqlType {
        self.sql_type.clone()
    }

    fn is_nullable(&self) -> bool {
        self.nullable
    }

    fn resolved(&self) -> bool {
        true
    }

    fn children(&self) -> Vec<&Expression> {
        Vec::new()
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        take_children::<0>(self, children)?;
        Ok(Expression::GetField(self.clone()))
    }

    fn debug_string(&self) -> String {
        format!(
            "[{}, idx={}, type={}, nullable={}]",
            self, self.index, self.sql_type, self.nullable
        )
    }
}

impl fmt::Display for GetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.name),
            None => f.write_str(&self.name),
        }
    }
}
