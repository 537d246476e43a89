//! Expression evaluation framework for query execution.
//!
//! This module provides:
//! - The expression tree and its node kinds
//! - Type checking and validation against a row schema
//! - Row-at-a-time evaluation
//! - Tree rewriting helpers used by the analyzer

pub mod arithmetic;
pub mod between;
pub mod bit_ops;
pub mod collated;
pub mod comparison;
pub mod convert;
pub mod div;
pub mod error;
pub mod eval;
pub mod expr;
pub mod get_field;
pub mod in_tuple;
pub mod interval;
pub mod like;
pub mod literal;
pub mod logic;
pub mod operator;
pub mod procedure;
pub mod transform;
pub mod tuple;
pub mod type_checker;
pub mod unary;
pub mod unresolved;

pub use arithmetic::Arithmetic;
pub use between::Between;
pub use bit_ops::BitOp;
pub use collated::Collated;
pub use comparison::{comparison_type, Comparison};
pub use convert::{convert_value, Convert, ConvertTarget};
pub use div::Div;
pub use error::{ExpressionError, ExpressionResult};
pub use eval::{evaluate_expression, expression_to_predicate, ExpressionEvaluator, Predicate};
pub use expr::{Expression, ExpressionOps};
pub use get_field::GetField;
pub use in_tuple::{HashInTuple, InTuple};
pub use interval::{Interval, IntervalUnit, TimeDelta};
pub use like::Like;
pub use literal::Literal;
pub use logic::{Logic, Not};
pub use operator::{ArithmeticOperator, BitOperator, ComparisonOperator, LogicOperator};
pub use procedure::{
    bind_procedure_params, ProcedureParam, ProcedureReference, RowIter, RowSource,
    UnresolvedProcedureParam,
};
pub use transform::{exists, inspect, transform_up, TreeIdentity};
pub use tuple::Tuple;
pub use type_checker::{type_check_expression, validate_filter_predicate, TypeChecker};
pub use unary::{IsNull, IsTrue, UnaryMinus};
pub use unresolved::{UnresolvedColumn, UnresolvedFunction};
