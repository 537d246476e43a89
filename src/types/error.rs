//! Type system error types.

use thiserror::Error;

/// Errors raised while converting or comparing values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypeError {
    #[error("value '{value}' is not valid for type {target}")]
    InvalidValue { value: String, target: String },

    #[error("value {value} is out of range for type {target}")]
    OutOfRange { value: String, target: String },

    #[error("incorrect datetime value: '{0}'")]
    InvalidDatetime(String),

    #[error("invalid JSON text: {0}")]
    InvalidJson(String),

    #[error("cannot convert {from} to {to}")]
    UnsupportedConversion { from: String, to: String },
}

impl TypeError {
    pub(crate) fn invalid(value: impl ToString, target: impl ToString) -> Self {
        TypeError::InvalidValue {
            value: value.to_string(),
            target: target.to_string(),
        }
    }

    pub(crate) fn out_of_range(value: impl ToString, target: impl ToString) -> Self {
        TypeError::OutOfRange {
            value: value.to_string(),
            target: target.to_string(),
        }
    }
}

/// Result type for type system operations.
pub type TypeResult<T> = Result<T, TypeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TypeError::invalid("abc", "bigint");
        assert_eq!(err.to_string(), "value 'abc' is not valid for type bigint");

        let err = TypeError::out_of_range(300, "tinyint");
        assert_eq!(err.to_string(), "value 300 is out of range for type tinyint");

        let err = TypeError::InvalidDatetime("2020-13-45".to_string());
        assert_eq!(err.to_string(), "incorrect datetime value: '2020-13-45'");
    }
}
