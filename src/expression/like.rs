//! `LIKE` pattern matching, compiled to an anchored regex.

use crate::expression::collated::explicit_collation;
use crate::expression::error::{ExpressionError, ExpressionResult};
use crate::expression::expr::{take_children, Expression, ExpressionOps};
use crate::expression::transform::exists;
use crate::session::Context;
use crate::types::convert::to_text;
use crate::types::{SqlType, Value};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

const DEFAULT_ESCAPE: char = '\\';

/// `left LIKE pattern [ESCAPE c]`
#[derive(Debug, Clone)]
pub struct Like {
    left: Box<Expression>,
    right: Box<Expression>,
    escape: char,
    /// Compiled pattern, kept only when the pattern does not depend on the row.
    cached: OnceLock<Regex>,
}

impl Like {
    pub fn new(left: Expression, pattern: Expression) -> Self {
        Self::with_escape(left, pattern, DEFAULT_ESCAPE)
    }

    pub fn with_escape(left: Expression, pattern: Expression, escape: char) -> Self {
        Self {
            left: Box::new(left),
            right: Box::new(pattern),
            escape,
            cached: OnceLock::new(),
        }
    }

    fn is_cacheable(&self) -> bool {
        !exists(&self.right, |e| {
            matches!(e, Expression::GetField(_) | Expression::ProcedureParam(_))
        })
    }

    fn case_insensitive(&self, ctx: &Context) -> bool {
        explicit_collation(&self.left)
            .or_else(|| explicit_collation(&self.right))
            .or_else(|| self.left.sql_type().collation())
            .or_else(|| self.right.sql_type().collation())
            .unwrap_or(ctx.config().default_collation)
            .is_case_insensitive()
    }

    fn compile(&self, ctx: &Context, pattern: &str) -> ExpressionResult<Regex> {
        let source = pattern_to_regex(pattern, self.escape, self.case_insensitive(ctx));
        Regex::new(&source).map_err(|e| ExpressionError::InvalidRegexp(e.to_string()))
    }
}

/// Translate a LIKE pattern: `%` matches any run, `_` one character, and
/// the escape character makes the next one literal.
pub fn pattern_to_regex(pattern: &str, escape: char, case_insensitive: bool) -> String {
    let mut out = String::from(if case_insensitive { "(?is)^" } else { "(?s)^" });
    let mut chars = pattern.chars();
    let mut buf = [0u8; 4];
    while let Some(c) = chars.next() {
        if c == escape {
            // a trailing escape matches itself
            let literal = chars.next().unwrap_or(c);
            out.push_str(&regex::escape(literal.encode_utf8(&mut buf)));
        } else if c == '%' {
            out.push_str(".*");
        } else if c == '_' {
            out.push('.');
        } else {
            out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
        }
    }
    out.push('$');
    out
}

impl ExpressionOps for Like {
    fn eval(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Value> {
        let l = self.left.eval(ctx, row)?;
        if l.is_null() {
            return Ok(Value::Null);
        }
        let r = self.right.eval(ctx, row)?;
        if r.is_null() {
            return Ok(Value::Null);
        }

        let text = to_text(&l);
        let matched = if self.is_cacheable() {
            let regex = match self.cached.get() {
                Some(regex) => regex,
                None => {
                    let compiled = self.compile(ctx, &to_text(&r))?;
                    self.cached.get_or_init(|| compiled)
                }
            };
            regex.is_match(&text)
        } else {
            self.compile(ctx, &to_text(&r))?.is_match(&text)
        };
        Ok(Value::Boolean(matched))
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Boolean
    }

    fn is_nullable(&self) -> bool {
        self.left.is_nullable() || self.right.is_nullable()
    }

    fn children(&self) -> Vec<&Expression> {
        vec![&self.left, &self.right]
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        let [left, right] = take_children::<2>(self, children)?;
        Ok(Expression::Like(Like::with_escape(left, right, self.escape)))
    }

    fn debug_string(&self) -> String {
        format!(
            "{} LIKE {}",
            self.left.debug_string(),
            self.right.debug_string()
        )
    }
}

impl fmt::Display for Like {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} LIKE {}", self.left, self.right)?;
        if self.escape != DEFAULT_ESCAPE {
            write!(f, " ESCAPE '{}'", self.escape)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Collation, StringKind, StringType};

    fn like(text: &str, pattern: &str) -> Value {
        Like::new(Expression::literal(text), Expression::literal(pattern))
            .eval(&Context::default(), &[])
            .unwrap()
    }

    #[test]
    fn test_wildcards() {
        assert_eq!(like("abc", "a%"), Value::Boolean(true));
        assert_eq!(like("abc", "a_c"), Value::Boolean(true));
        assert_eq!(like("abc", "a_"), Value::Boolean(false));
        assert_eq!(like("a\nb", "a%b"), Value::Boolean(true));
        assert_eq!(like("a.c", "a.c"), Value::Boolean(true));
        assert_eq!(like("abc", "a.c"), Value::Boolean(false));
    }

    #[test]
    fn test_escape() {
        assert_eq!(like("50%", "50\\%"), Value::Boolean(true));
        assert_eq!(like("500", "50\\%"), Value::Boolean(false));
        let custom = Like::with_escape(
            Expression::literal("a_b"),
            Expression::literal("a#_b"),
            '#',
        );
        assert_eq!(custom.eval(&Context::default(), &[]).unwrap(), Value::Boolean(true));
        assert_eq!(custom.to_string(), "'a_b' LIKE 'a#_b' ESCAPE '#'");
    }

    #[test]
    fn test_collation_controls_case() {
        // literals carry the default, case-insensitive collation
        assert_eq!(like("ABC", "abc"), Value::Boolean(true));

        let bin = SqlType::Text(StringType::new(StringKind::Varchar, 10, Collation::Utf8mb4_bin));
        let expr = Like::new(Expression::column(0, bin, "s"), Expression::literal("abc"));
        assert_eq!(
            expr.eval(&Context::default(), &[Value::from("ABC")]).unwrap(),
            Value::Boolean(false)
        );
    }

    #[test]
    fn test_pattern_from_row_is_not_cached() {
        let expr = Like::new(
            Expression::literal("abc"),
            Expression::column(0, SqlType::long_text(), "p"),
        );
        let ctx = Context::default();
        assert_eq!(expr.eval(&ctx, &[Value::from("a%")]).unwrap(), Value::Boolean(true));
        assert_eq!(expr.eval(&ctx, &[Value::from("b%")]).unwrap(), Value::Boolean(false));
        assert!(expr.cached.get().is_none());
    }

    #[test]
    fn test_nulls_and_numbers() {
        let expr = Like::new(Expression::null(), Expression::literal("%"));
        assert_eq!(expr.eval(&Context::default(), &[]).unwrap(), Value::Null);
        let expr = Like::new(Expression::literal(123i64), Expression::literal("1%"));
        assert_eq!(expr.eval(&Context::default(), &[]).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_pattern_translation() {
        assert_eq!(pattern_to_regex("a%_", '\\', false), "(?s)^a.*.$");
        assert_eq!(pattern_to_regex("x\\", '\\', true), "(?is)^x\\\\$");
    }
}
