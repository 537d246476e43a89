//! Operator definitions for expressions.

use std::fmt;

/// Operators evaluated by [`Arithmetic`](crate::expression::arithmetic::Arithmetic)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOperator {
    Plus,
    Minus,
    Mult,
    /// Integer division (`DIV`)
    IntDiv,
    Mod,
}

impl ArithmeticOperator {
    /// Get the display string for this operator
    pub fn as_str(&self) -> &'static str {
        match self {
            ArithmeticOperator::Plus => "+",
            ArithmeticOperator::Minus => "-",
            ArithmeticOperator::Mult => "*",
            ArithmeticOperator::IntDiv => "div",
            ArithmeticOperator::Mod => "%",
        }
    }

    /// `+`, `-` and `*` share the decimal and interval typing rules.
    pub fn is_additive_or_mult(&self) -> bool {
        matches!(
            self,
            ArithmeticOperator::Plus | ArithmeticOperator::Minus | ArithmeticOperator::Mult
        )
    }
}

/// Bitwise operators; results are always BIGINT UNSIGNED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitOperator {
    And,
    Or,
    Xor,
    ShiftLeft,
    ShiftRight,
}

impl BitOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BitOperator::And => "&",
            BitOperator::Or => "|",
            BitOperator::Xor => "^",
            BitOperator::ShiftLeft => "<<",
            BitOperator::ShiftRight => ">>",
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Equals,
    /// `<=>`: NULL-safe equality
    NullSafeEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl ComparisonOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::Equals => "=",
            ComparisonOperator::NullSafeEquals => "<=>",
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::LessThanOrEqual => "<=",
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::GreaterThanOrEqual => ">=",
        }
    }

    /// Whether `ordering` (left compared to right) satisfies this operator.
    pub fn matches(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            ComparisonOperator::Equals | ComparisonOperator::NullSafeEquals => ordering == Equal,
            ComparisonOperator::LessThan => ordering == Less,
            ComparisonOperator::LessThanOrEqual => ordering != Greater,
            ComparisonOperator::GreaterThan => ordering == Greater,
            ComparisonOperator::GreaterThanOrEqual => ordering != Less,
        }
    }
}

/// Logical connectives with three-valued semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicOperator {
    And,
    Or,
    Xor,
}

impl LogicOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicOperator::And => "AND",
            LogicOperator::Or => "OR",
            LogicOperator::Xor => "XOR",
        }
    }
}

macro_rules! impl_operator_display {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

impl_operator_display!(ArithmeticOperator, BitOperator, ComparisonOperator, LogicOperator);

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn test_operator_strings() {
        assert_eq!(ArithmeticOperator::IntDiv.to_string(), "div");
        assert_eq!(BitOperator::ShiftLeft.to_string(), "<<");
        assert_eq!(ComparisonOperator::NullSafeEquals.to_string(), "<=>");
        assert_eq!(LogicOperator::Xor.to_string(), "XOR");
    }

    #[test]
    fn test_comparison_matches() {
        assert!(ComparisonOperator::LessThanOrEqual.matches(Ordering::Equal));
        assert!(ComparisonOperator::LessThanOrEqual.matches(Ordering::Less));
        assert!(!ComparisonOperator::LessThan.matches(Ordering::Equal));
        assert!(ComparisonOperator::GreaterThanOrEqual.matches(Ordering::Greater));
        assert!(!ComparisonOperator::Equals.matches(Ordering::Greater));
    }

    #[test]
    fn test_additive_classification() {
        assert!(ArithmeticOperator::Mult.is_additive_or_mult());
        assert!(!ArithmeticOperator::Mod.is_additive_or_mult());
    }
}
