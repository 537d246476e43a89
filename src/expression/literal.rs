//! Literal constants.

use crate::expression::error::ExpressionResult;
use crate::expression::expr::{take_children, Expression, ExpressionOps};
use crate::session::Context;
use crate::types::datetime::format_datetime;
use crate::types::{SqlType, Value};
use std::fmt;

/// Literal value in an expression
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub value: Value,
    sql_type: SqlType,
}

impl Literal {
    /// Literal typed from its value, as the parser types constants.
    pub fn new(value: Value) -> Self {
        let sql_type = value.sql_type();
        Self { value, sql_type }
    }

    pub fn with_type(value: Value, sql_type: SqlType) -> Self {
        Self { value, sql_type }
    }

    pub fn null() -> Self {
        Self::new(Value::Null)
    }
}

impl ExpressionOps for Literal {
    fn eval(&self, _ctx: &Context, _row: &[Value]) -> ExpressionResult<Value> {
        Ok(self.value.clone())
    }

    fn sql_type(&self) -> SqlType {
        self.sql_type.clone()
    }

    fn is_nullable(&self) -> bool {
        self.value.is_null()
    }

    fn resolved(&self) -> bool {
        true
    }

    fn children(&self) -> Vec<&Expression> {
        Vec::new()
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        take_children::<0>(self, children)?;
        Ok(Expression::Literal(self.clone()))
    }

    fn debug_string(&self) -> String {
        format!("{} ({})", self, self.sql_type)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_literal(f, &self.value)
    }
}

/// MySQL literal syntax for a value.
fn write_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
        Value::Bytes(b) => write!(f, "0x{}", hex::encode_upper(b)),
        Value::Datetime(t) => write!(f, "'{}'", format_datetime(t)),
        Value::Time(t) => write!(f, "'{}'", t),
        Value::Json(j) => write!(f, "'{}'", j.to_string().replace('\'', "''")),
        Value::Tuple(values) => {
            f.write_str("(")?;
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_literal(f, v)?;
            }
            f.write_str(")")
        }
        other => write!(f, "{}", other),
    }
}
