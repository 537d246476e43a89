//! Row value constructors: `(a, b, ...)`.

use crate::expression::error::{ExpressionError, ExpressionResult};
use crate::expression::expr::{Expression, ExpressionOps};
use crate::session::Context;
use crate::types::{SqlType, Value};
use std::fmt;

/// A fixed-size sequence of expressions. A one-element tuple behaves as its
/// element.
#[derive(Debug, Clone)]
pub struct Tuple {
    elements: Vec<Expression>,
}

impl Tuple {
    pub fn new(elements: Vec<Expression>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[Expression] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl ExpressionOps for Tuple {
    fn eval(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Value> {
        if let [single] = self.elements.as_slice() {
            return single.eval(ctx, row);
        }
        let values = self
            .elements
            .iter()
            .map(|e| e.eval(ctx, row))
            .collect::<ExpressionResult<Vec<_>>>()?;
        Ok(Value::Tuple(values))
    }

    fn sql_type(&self) -> SqlType {
        if let [single] = self.elements.as_slice() {
            return single.sql_type();
        }
        SqlType::Tuple(self.elements.iter().map(|e| e.sql_type()).collect())
    }

    fn is_nullable(&self) -> bool {
        match self.elements.as_slice() {
            [single] => single.is_nullable(),
            _ => false,
        }
    }

    fn children(&self) -> Vec<&Expression> {
        self.elements.iter().collect()
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        if children.is_empty() {
            return Err(ExpressionError::InvalidChildrenNumber {
                expression: self.to_string(),
                got: 0,
                expected: 1,
            });
        }
        Ok(Expression::Tuple(Tuple::new(children)))
    }

    fn debug_string(&self) -> String {
        let parts: Vec<String> = self.elements.iter().map(|e| e.debug_string()).collect();
        format!("TUPLE({})", parts.join(", "))
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.elements.iter().map(|e| e.to_string()).collect();
        write!(f, "({})", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_element_tuple_is_its_element() {
        let ctx = Context::default();
        let tuple = Tuple::new(vec![Expression::literal(5i64)]);
        assert_eq!(tuple.eval(&ctx, &[]).unwrap(), Value::Int64(5));
        assert_eq!(tuple.sql_type(), SqlType::Int64);
    }

    #[test]
    fn test_tuple_eval() {
        let ctx = Context::default();
        let tuple = Tuple::new(vec![Expression::literal(1i64), Expression::literal("a")]);
        assert_eq!(
            tuple.eval(&ctx, &[]).unwrap(),
            Value::Tuple(vec![Value::Int64(1), Value::from("a")])
        );
        assert_eq!(
            tuple.sql_type(),
            SqlType::Tuple(vec![SqlType::Int64, SqlType::long_text()])
        );
        assert_eq!(tuple.to_string(), "(1, 'a')");
        assert!(!tuple.is_nullable());
    }

    #[test]
    fn test_tuple_with_children() {
        let tuple = Tuple::new(vec![Expression::literal(1i64)]);
        let rebuilt = tuple
            .with_children(vec![Expression::literal(1i64), Expression::literal(2i64)])
            .unwrap();
        assert_eq!(rebuilt.children().len(), 2);
        assert!(tuple.with_children(vec![]).is_err());
    }
}
