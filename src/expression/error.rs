//! Error types for expression evaluation.

use crate::types::TypeError;
use thiserror::Error;

/// Errors that can occur while building, validating or evaluating expressions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    /// Operands have no common type for the operation
    #[error("unable to cast between types: {left}, {right}")]
    UnableToCast { left: String, right: String },

    #[error("unable to evaluate {left} {op} {right}")]
    UnableToEval {
        left: String,
        op: String,
        right: String,
    },

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("invalid type to convert to: {0}")]
    InvalidConvertTarget(String),

    #[error("cannot convert value {value} to {target}")]
    ConvertExpression { value: String, target: String },

    #[error("{expression}: invalid children number, got {got}, expected {expected}")]
    InvalidChildrenNumber {
        expression: String,
        got: usize,
        expected: usize,
    },

    /// Row value operands with mismatched column counts
    #[error("operand should contain {expected} column(s), got {got}")]
    InvalidOperandColumns { expected: usize, got: usize },

    #[error("unsupported IN operand: {0}")]
    UnsupportedInOperand(String),

    /// Placeholder nodes that must be replaced before execution
    #[error("{expression} cannot be evaluated")]
    NotEvaluable { expression: String },

    #[error("column index {index} out of bounds for row with {row_len} columns")]
    ColumnIndexOutOfBounds { index: usize, row_len: usize },

    #[error("invalid interval unit: {0}")]
    InvalidIntervalUnit(String),

    #[error("invalid interval format for {unit}: '{value}'")]
    InvalidIntervalFormat { unit: String, value: String },

    #[error("datetime value is out of range")]
    DatetimeOutOfRange,

    #[error("unknown collation: '{0}'")]
    UnknownCollation(String),

    #[error("COLLATION '{collation}' is not valid for CHARACTER SET '{charset}'")]
    CollationMismatch { collation: String, charset: String },

    #[error("invalid regular expression: {0}")]
    InvalidRegexp(String),

    #[error("cannot find value for parameter `{0}`")]
    UnknownProcedureVariable(String),

    #[error("cannot find cursor `{0}`")]
    UnknownCursor(String),

    #[error("cursor `{0}` is already open")]
    CursorAlreadyOpen(String),

    #[error("cursor `{0}` is not open")]
    CursorNotOpen(String),

    #[error("attempted to pop an empty scope")]
    EmptyScopeStack,

    /// Raised by EXIT handlers; the executor unwinds to the block at
    /// `scope_height`.
    #[error("exiting procedure block at scope height {scope_height}")]
    ProcedureBlockExit { scope_height: usize },

    #[error("value {value} is out of range for {target}")]
    ValueOutOfRange { value: String, target: String },

    #[error("type check failed for expression '{expression}': {reason}")]
    TypeCheckFailed { expression: String, reason: String },

    #[error("query execution was cancelled")]
    Cancelled,
}

/// Result type for expression operations
pub type ExpressionResult<T> = Result<T, ExpressionError>;
