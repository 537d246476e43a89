//! Validation of expression trees against an input schema.

use crate::expression::transform::inspect;
use crate::expression::{Expression, ExpressionError, ExpressionOps, ExpressionResult};
use crate::types::SqlType;

/// Type checker for expressions
pub struct TypeChecker<'a> {
    /// Types of the input row's columns
    schema: &'a [SqlType],
}

impl<'a> TypeChecker<'a> {
    pub fn new(schema: &'a [SqlType]) -> Self {
        Self { schema }
    }

    /// Validate `expr` and return its result type.
    pub fn check(&self, expr: &Expression) -> ExpressionResult<SqlType> {
        if !expr.resolved() {
            return Err(ExpressionError::TypeCheckFailed {
                expression: expr.to_string(),
                reason: "expression contains unresolved references".to_string(),
            });
        }

        let mut failure = None;
        inspect(expr, |node| {
            if failure.is_none() {
                failure = self.check_node(node).err();
            }
            failure.is_none()
        });
        match failure {
            Some(err) => Err(err),
            None => Ok(expr.sql_type()),
        }
    }

    fn check_node(&self, node: &Expression) -> ExpressionResult<()> {
        match node {
            Expression::GetField(field) if field.index >= self.schema.len() => {
                Err(ExpressionError::ColumnIndexOutOfBounds {
                    index: field.index,
                    row_len: self.schema.len(),
                })
            }
            Expression::InTuple(in_tuple) => check_in_columns(in_tuple.left(), in_tuple.right()),
            Expression::HashInTuple(in_tuple) => {
                check_in_columns(in_tuple.left(), in_tuple.right())
            }
            _ => Ok(()),
        }
    }

    /// Check if an expression is valid for use as a filter predicate.
    /// Non-boolean scalars are accepted and read through their truthiness.
    pub fn check_filter_predicate(&self, expr: &Expression) -> ExpressionResult<()> {
        let output_type = self.check(expr)?;
        match output_type {
            SqlType::Boolean | SqlType::Null | SqlType::Deferred => Ok(()),
            SqlType::Tuple(types) => Err(ExpressionError::InvalidOperandColumns {
                expected: 1,
                got: types.len(),
            }),
            other => {
                log::debug!("filter predicate {} has non-boolean type {}", expr, other);
                Ok(())
            }
        }
    }
}

fn check_in_columns(left: &Expression, right: &Expression) -> ExpressionResult<()> {
    let Expression::Tuple(tuple) = right else {
        return Err(ExpressionError::UnsupportedInOperand(right.to_string()));
    };
    let expected = left.sql_type().num_columns();
    for element in tuple.elements() {
        let got = element.sql_type().num_columns();
        if got != expected {
            return Err(ExpressionError::InvalidOperandColumns { expected, got });
        }
    }
    Ok(())
}

/// Helper function to type check an expression
pub fn type_check_expression(expr: &Expression, schema: &[SqlType]) -> ExpressionResult<SqlType> {
    TypeChecker::new(schema).check(expr)
}

/// Helper function to validate a filter predicate
pub fn validate_filter_predicate(expr: &Expression, schema: &[SqlType]) -> ExpressionResult<()> {
    TypeChecker::new(schema).check_filter_predicate(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::UnresolvedColumn;

    fn schema() -> Vec<SqlType> {
        vec![SqlType::Int64, SqlType::varchar(20), SqlType::Boolean]
    }

    #[test]
    fn test_result_types() {
        let schema = schema();
        let checker = TypeChecker::new(&schema);
        let sum = Expression::plus(
            Expression::column(0, SqlType::Int64, "a"),
            Expression::literal(1i64),
        );
        assert_eq!(checker.check(&sum).unwrap(), SqlType::Int64);
        let cmp = Expression::eq(
            Expression::column(1, SqlType::varchar(20), "b"),
            Expression::literal("x"),
        );
        assert_eq!(checker.check(&cmp).unwrap(), SqlType::Boolean);
    }

    #[test]
    fn test_column_out_of_schema() {
        let schema = schema();
        let expr = Expression::is_null(Expression::column(3, SqlType::Int64, "d"));
        assert_eq!(
            TypeChecker::new(&schema).check(&expr).unwrap_err(),
            ExpressionError::ColumnIndexOutOfBounds {
                index: 3,
                row_len: 3
            }
        );
    }

    #[test]
    fn test_unresolved_is_rejected() {
        let expr = Expression::not_expr(Expression::UnresolvedColumn(UnresolvedColumn::new("x")));
        assert!(matches!(
            type_check_expression(&expr, &schema()),
            Err(ExpressionError::TypeCheckFailed { .. })
        ));
    }

    #[test]
    fn test_in_column_counts() {
        let left = Expression::tuple(vec![
            Expression::column(0, SqlType::Int64, "a"),
            Expression::column(2, SqlType::Boolean, "c"),
        ]);
        let right = Expression::tuple(vec![Expression::literal(1i64)]);
        let expr = Expression::in_tuple(left, right);
        assert_eq!(
            type_check_expression(&expr, &schema()).unwrap_err(),
            ExpressionError::InvalidOperandColumns {
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn test_filter_predicates() {
        let schema = schema();
        let checker = TypeChecker::new(&schema);
        assert!(checker
            .check_filter_predicate(&Expression::column(2, SqlType::Boolean, "c"))
            .is_ok());
        assert!(checker.check_filter_predicate(&Expression::null()).is_ok());
        // numeric predicates are allowed, only logged
        let column = Expression::column(0, SqlType::Int64, "a");
        assert!(validate_filter_predicate(&column, &schema).is_ok());

        let row = Expression::tuple(vec![Expression::literal(1i64), Expression::literal(2i64)]);
        assert!(checker.check_filter_predicate(&row).is_err());
    }
}
