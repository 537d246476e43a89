//! Row-at-a-time evaluation of an expression tree.

use crate::expression::{Expression, ExpressionOps, ExpressionResult};
use crate::session::Context;
use crate::types::{Row, Value};

/// Evaluator for one expression within one query.
///
/// The tree keeps no per-row state, so an evaluator can be shared across
/// threads; warnings still land in the single session of `ctx`.
pub struct ExpressionEvaluator<'a> {
    ctx: &'a Context,
    expr: &'a Expression,
}

impl<'a> ExpressionEvaluator<'a> {
    pub fn new(ctx: &'a Context, expr: &'a Expression) -> Self {
        Self { ctx, expr }
    }

    /// Evaluate the expression against a row
    pub fn evaluate(&self, row: &[Value]) -> ExpressionResult<Value> {
        self.expr.eval(self.ctx, row)
    }

    /// Evaluate every row, stopping early if the query is cancelled.
    pub fn evaluate_rows(&self, rows: &[Row]) -> ExpressionResult<Vec<Value>> {
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            self.ctx.check_cancelled()?;
            out.push(self.evaluate(row)?);
        }
        log::trace!(
            "query {}: evaluated {} over {} rows",
            self.ctx.query_id,
            self.expr,
            rows.len()
        );
        Ok(out)
    }

    /// Evaluate as a WHERE condition. NULL counts as false.
    pub fn evaluate_predicate(&self, row: &[Value]) -> ExpressionResult<bool> {
        Ok(self.evaluate(row)?.truthiness().unwrap_or(false))
    }
}

/// Helper function to evaluate an expression against a row
pub fn evaluate_expression(
    ctx: &Context,
    expr: &Expression,
    row: &[Value],
) -> ExpressionResult<Value> {
    ExpressionEvaluator::new(ctx, expr).evaluate(row)
}

/// Type alias for predicate functions
pub type Predicate = Box<dyn Fn(&[Value]) -> ExpressionResult<bool> + Send + Sync>;

/// Helper function to create a predicate function from an expression
pub fn expression_to_predicate(ctx: &Context, expr: Expression) -> Predicate {
    let ctx = ctx.clone();
    Box::new(move |row| ExpressionEvaluator::new(&ctx, &expr).evaluate_predicate(row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ExpressionError;
    use crate::types::SqlType;

    fn rows() -> Vec<Row> {
        vec![
            vec![Value::Int64(1), Value::from("a")],
            vec![Value::Int64(5), Value::from("b")],
            vec![Value::Null, Value::from("c")],
        ]
    }

    fn a() -> Expression {
        Expression::column(0, SqlType::Int64, "a")
    }

    #[test]
    fn test_evaluate_rows() {
        let ctx = Context::default();
        let expr = Expression::mult(a(), Expression::literal(2i64));
        let values = ExpressionEvaluator::new(&ctx, &expr)
            .evaluate_rows(&rows())
            .unwrap();
        assert_eq!(values, vec![Value::Int64(2), Value::Int64(10), Value::Null]);
    }

    #[test]
    fn test_evaluate_predicate() {
        let ctx = Context::default();
        let expr = Expression::gt(a(), Expression::literal(2i64));
        let evaluator = ExpressionEvaluator::new(&ctx, &expr);
        let results: Vec<bool> = rows()
            .iter()
            .map(|row| evaluator.evaluate_predicate(row).unwrap())
            .collect();
        assert_eq!(results, vec![false, true, false]);
    }

    #[test]
    fn test_expression_to_predicate() {
        let ctx = Context::default();
        let predicate = expression_to_predicate(&ctx, Expression::is_null(a()));
        let matched: Vec<bool> = rows().iter().map(|row| predicate(row).unwrap()).collect();
        assert_eq!(matched, vec![false, false, true]);

        let failing = expression_to_predicate(&ctx, Expression::column(9, SqlType::Int64, "z"));
        assert!(matches!(
            failing(&[]),
            Err(ExpressionError::ColumnIndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_cancellation_stops_evaluation() {
        let ctx = Context::default();
        let expr = a();
        ctx.cancel();
        let err = ExpressionEvaluator::new(&ctx, &expr)
            .evaluate_rows(&rows())
            .unwrap_err();
        assert_eq!(err, ExpressionError::Cancelled);
    }

    #[test]
    fn test_evaluate_expression_helper() {
        let ctx = Context::default();
        let row = vec![Value::Int64(3)];
        assert_eq!(
            evaluate_expression(&ctx, &Expression::unary_minus(a()), &row).unwrap(),
            Value::Int64(-3)
        );
    }
}
