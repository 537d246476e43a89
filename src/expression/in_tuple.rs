//! `x IN (a, b, ...)`, by linear scan or by hash lookup over constants.

use crate::expression::arithmetic::resolve_type;
use crate::expression::comparison::{comparison_type, convert_for_compare};
use crate::expression::error::{ExpressionError, ExpressionResult};
use crate::expression::expr::{take_children, Expression, ExpressionOps};
use crate::expression::transform::exists;
use crate::session::Context;
use crate::types::{RowNulls, SqlType, Value};
use bytes::{Bytes, BytesMut};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

/// Type the left operand and one list element are compared as.
pub fn in_comparison_type(lt: &SqlType, rt: &SqlType) -> SqlType {
    if (lt.is_text() && rt.is_number()) || (lt.is_number() && rt.is_text()) {
        SqlType::Float64
    } else if lt.is_enum() || lt.is_set() || lt.is_text() {
        lt.clone()
    } else {
        comparison_type(lt, rt)
    }
}

fn check_columns(left: &SqlType, element: &SqlType) -> ExpressionResult<()> {
    if left.num_columns() != element.num_columns() {
        return Err(ExpressionError::InvalidOperandColumns {
            expected: left.num_columns(),
            got: element.num_columns(),
        });
    }
    Ok(())
}

/// Convert a list element for comparison against an enum-typed left side.
/// Members the enum does not know can never match.
fn convert_element(
    ctx: &Context,
    lt: &SqlType,
    typ: &SqlType,
    value: &Value,
) -> ExpressionResult<Option<Value>> {
    match convert_for_compare(ctx, typ, value) {
        Ok(v) => Ok(Some(v)),
        Err(ExpressionError::UnableToCast { .. }) if lt.is_enum() || lt.is_set() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Compare the left value against one element value, both non-NULL.
/// `None` when a NULL inside a row value leaves the match unknown.
fn element_matches(
    ctx: &Context,
    lt: &SqlType,
    l: &Value,
    rt: &SqlType,
    r: &Value,
) -> ExpressionResult<Option<bool>> {
    let typ = in_comparison_type(lt, rt);
    let Some(r) = convert_element(ctx, lt, &typ, r)? else {
        return Ok(Some(false));
    };
    let l = convert_for_compare(ctx, &typ, l)?;
    Ok(typ
        .compare_nullable(&l, &r, RowNulls::Skip)?
        .map(|ordering| ordering == Ordering::Equal))
}

/// Scan `elements` for `l`: `Some(true)` on a match, `None` when nothing
/// matched but some comparison was unknown.
fn scan<'a>(
    ctx: &Context,
    lt: &SqlType,
    l: &Value,
    elements: impl IntoIterator<Item = &'a (SqlType, Value)>,
) -> ExpressionResult<Option<bool>> {
    let mut unknown = false;
    for (rt, r) in elements {
        check_columns(lt, rt)?;
        match element_matches(ctx, lt, l, rt, r)? {
            Some(true) => return Ok(Some(true)),
            Some(false) => {}
            None => unknown = true,
        }
    }
    Ok(if unknown { None } else { Some(false) })
}

fn tuple_of(right: &Expression) -> ExpressionResult<&[Expression]> {
    match right {
        Expression::Tuple(tuple) => Ok(tuple.elements()),
        other => Err(ExpressionError::UnsupportedInOperand(other.to_string())),
    }
}

/// `left IN (right...)`, comparing element by element.
#[derive(Debug, Clone)]
pub struct InTuple {
    left: Box<Expression>,
    right: Box<Expression>,
}

impl InTuple {
    pub fn new(left: Expression, right: Expression) -> Self {
        Self {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn left(&self) -> &Expression {
        &self.left
    }

    pub fn right(&self) -> &Expression {
        &self.right
    }
}

impl ExpressionOps for InTuple {
    fn eval(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Value> {
        let elements = tuple_of(&self.right)?;
        let l = self.left.eval(ctx, row)?;
        if l.is_null() {
            return Ok(Value::Null);
        }
        let lt = resolve_type(self.left.sql_type(), &l);

        let mut saw_null = false;
        for element in elements {
            check_columns(&lt, &element.sql_type())?;
            let r = element.eval(ctx, row)?;
            if r.is_null() {
                saw_null = true;
                continue;
            }
            let rt = resolve_type(element.sql_type(), &r);
            match element_matches(ctx, &lt, &l, &rt, &r)? {
                Some(true) => return Ok(Value::Boolean(true)),
                Some(false) => {}
                None => saw_null = true,
            }
        }
        Ok(if saw_null {
            Value::Null
        } else {
            Value::Boolean(false)
        })
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Boolean
    }

    fn is_nullable(&self) -> bool {
        self.left.is_nullable()
            || tuple_of(&self.right)
                .map(|elements| elements.iter().any(|e| e.is_nullable()))
                .unwrap_or(true)
    }

    fn children(&self) -> Vec<&Expression> {
        vec![&self.left, &self.right]
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        let [left, right] = take_children::<2>(self, children)?;
        Ok(Expression::InTuple(InTuple::new(left, right)))
    }

    fn debug_string(&self) -> String {
        format!("({} IN {})", self.left.debug_string(), self.right.debug_string())
    }
}

impl fmt::Display for InTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} IN {})", self.left, self.right)
    }
}

/// Hash key of a value already converted to `typ`. Equal keys mean the
/// values compare equal under `typ`.
fn hash_key_for(typ: &SqlType, value: &Value) -> Bytes {
    match (typ, value) {
        (SqlType::Tuple(types), Value::Tuple(values)) => {
            let mut buf = BytesMut::new();
            for (t, v) in types.iter().zip(values) {
                buf.extend_from_slice(&hash_key_for(t, v));
            }
            buf.freeze()
        }
        _ => value.hash_key_with(typ.collation()),
    }
}

/// `left IN (constants...)` answered from a prebuilt hash set. Returns the
/// same result as [`InTuple`] on every row.
///
/// Row-value elements holding a NULL never hash equal to anything, so they
/// are kept out of the set and scanned after a miss; a left row value with
/// a NULL inside is scanned against every element.
#[derive(Debug, Clone)]
pub struct HashInTuple {
    left: Box<Expression>,
    right: Box<Expression>,
    /// Element keys grouped by the type they were converted to. `None` when
    /// the left type is only known per row.
    groups: Option<Vec<(SqlType, HashSet<Bytes>)>>,
    /// Every non-NULL element with its type.
    elements: Vec<(SqlType, Value)>,
    has_null: bool,
}

impl HashInTuple {
    /// Build the lookup. Every leaf of `right` must be a literal.
    pub fn new(left: Expression, right: Expression) -> ExpressionResult<Self> {
        let elements = tuple_of(&right)?;
        if exists(&right, |e| !matches!(e, Expression::Tuple(_) | Expression::Literal(_))) {
            return Err(ExpressionError::UnsupportedInOperand(right.to_string()));
        }

        // literals read neither the row nor the session
        let ctx = Context::default();
        let lt = left.sql_type();
        let mut has_null = false;
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            check_columns(&lt, &element.sql_type())?;
            let value = element.eval(&ctx, &[])?;
            if value.is_null() {
                has_null = true;
            } else {
                values.push((resolve_type(element.sql_type(), &value), value));
            }
        }

        let groups = if lt.is_deferred() || lt.is_null() {
            None
        } else {
            let mut groups: Vec<(SqlType, HashSet<Bytes>)> = Vec::new();
            for (rt, value) in values.iter().filter(|(_, v)| !v.contains_null()) {
                let typ = in_comparison_type(&lt, rt);
                let Some(converted) = convert_element(&ctx, &lt, &typ, value)? else {
                    continue;
                };
                let key = hash_key_for(&typ, &converted);
                match groups.iter_mut().find(|(t, _)| *t == typ) {
                    Some((_, keys)) => {
                        keys.insert(key);
                    }
                    None => groups.push((typ, HashSet::from([key]))),
                }
            }
            Some(groups)
        };
        log::trace!("hash IN over {} elements built for {}", elements.len(), left);

        Ok(Self {
            left: Box::new(left),
            right: Box::new(right),
            groups,
            elements: values,
            has_null,
        })
    }

    pub fn left(&self) -> &Expression {
        &self.left
    }

    pub fn right(&self) -> &Expression {
        &self.right
    }
}

impl ExpressionOps for HashInTuple {
    fn eval(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Value> {
        let l = self.left.eval(ctx, row)?;
        if l.is_null() {
            return Ok(Value::Null);
        }

        let lt = resolve_type(self.left.sql_type(), &l);

        let found = match &self.groups {
            Some(groups) if !l.contains_null() => {
                let mut found = Some(false);
                for (typ, keys) in groups {
                    let converted = convert_for_compare(ctx, typ, &l)?;
                    if keys.contains(&hash_key_for(typ, &converted)) {
                        found = Some(true);
                        break;
                    }
                }
                if found == Some(false) {
                    let partial = self.elements.iter().filter(|(_, v)| v.contains_null());
                    found = scan(ctx, &lt, &l, partial)?;
                }
                found
            }
            _ => scan(ctx, &lt, &l, &self.elements)?,
        };

        Ok(match (found, self.has_null) {
            (Some(true), _) => Value::Boolean(true),
            (None, _) | (Some(false), true) => Value::Null,
            (Some(false), false) => Value::Boolean(false),
        })
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Boolean
    }

    fn is_nullable(&self) -> bool {
        self.left.is_nullable() || self.has_null
    }

    fn children(&self) -> Vec<&Expression> {
        vec![&self.left, &self.right]
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        let [left, right] = take_children::<2>(self, children)?;
        Ok(Expression::HashInTuple(HashInTuple::new(left, right)?))
    }

    fn debug_string(&self) -> String {
        format!(
            "({} HASH IN {})",
            self.left.debug_string(),
            self.right.debug_string()
        )
    }
}

impl fmt::Display for HashInTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} HASH IN {})", self.left, self.right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Collation, Decimal, EnumType, StringKind, StringType};
    use rand::Rng;
    use std::str::FromStr;

    fn list(values: Vec<Expression>) -> Expression {
        Expression::tuple(values)
    }

    fn both(left: Expression, right: Expression, row: &[Value]) -> (Value, Value) {
        let ctx = Context::default();
        let linear = InTuple::new(left.clone(), right.clone()).eval(&ctx, row).unwrap();
        let hashed = HashInTuple::new(left, right).unwrap().eval(&ctx, row).unwrap();
        (linear, hashed)
    }

    #[test]
    fn test_in_basic() {
        let right = list(vec![Expression::literal(1i64), Expression::literal(2i64)]);
        let (linear, hashed) = both(Expression::literal(2i64), right.clone(), &[]);
        assert_eq!(linear, Value::Boolean(true));
        assert_eq!(hashed, Value::Boolean(true));

        let (linear, hashed) = both(Expression::literal(3i64), right, &[]);
        assert_eq!(linear, Value::Boolean(false));
        assert_eq!(hashed, Value::Boolean(false));
    }

    #[test]
    fn test_in_with_null() {
        let right = list(vec![Expression::literal(1i64), Expression::null()]);
        assert_eq!(
            both(Expression::literal(1i64), right.clone(), &[]),
            (Value::Boolean(true), Value::Boolean(true))
        );
        assert_eq!(
            both(Expression::literal(5i64), right.clone(), &[]),
            (Value::Null, Value::Null)
        );
        assert_eq!(
            both(Expression::null(), right, &[]),
            (Value::Null, Value::Null)
        );
    }

    #[test]
    fn test_in_row_values_with_null_elements() {
        let row = |a: Option<i64>, b: Option<i64>| {
            list(vec![Expression::literal(a), Expression::literal(b)])
        };
        let cases = [
            // (1, 2) IN ((1, NULL))
            (row(Some(1), Some(2)), vec![row(Some(1), None)], Value::Null),
            // (1, NULL) IN ((1, 2))
            (row(Some(1), None), vec![row(Some(1), Some(2))], Value::Null),
            (row(Some(1), Some(2)), vec![row(Some(3), None)], Value::Boolean(false)),
            (
                row(Some(1), Some(2)),
                vec![row(Some(1), None), row(Some(1), Some(2))],
                Value::Boolean(true),
            ),
            (
                row(Some(1), None),
                vec![row(Some(2), Some(2)), row(Some(3), Some(3))],
                Value::Boolean(false),
            ),
            (
                row(Some(5), Some(6)),
                vec![row(Some(1), Some(2)), row(None, Some(7))],
                Value::Boolean(false),
            ),
        ];
        for (left, elements, expected) in cases {
            let (linear, hashed) = both(left, list(elements), &[]);
            assert_eq!(linear, expected);
            assert_eq!(hashed, expected);
        }
    }

    #[test]
    fn test_in_mixed_types() {
        let right = list(vec![
            Expression::literal("1"),
            Expression::literal(Decimal::from_str("2.50").unwrap()),
            Expression::literal(3.0f64),
        ]);
        for (left, expected) in [
            (Value::Int64(1), true),
            (Value::Float64(2.5), true),
            (Value::Int64(3), true),
            (Value::Int64(4), false),
        ] {
            let col = Expression::column(0, left.sql_type(), "a");
            let (linear, hashed) = both(col, right.clone(), &[left]);
            assert_eq!(linear, Value::Boolean(expected));
            assert_eq!(hashed, linear);
        }
    }

    #[test]
    fn test_in_case_insensitive_text() {
        let ci = SqlType::Text(StringType::new(
            StringKind::Varchar,
            20,
            Collation::Utf8mb4_general_ci,
        ));
        let col = Expression::column(0, ci, "name");
        let right = list(vec![Expression::literal("Alice"), Expression::literal("BOB")]);
        let (linear, hashed) = both(col, right, &[Value::from("bob")]);
        assert_eq!(linear, Value::Boolean(true));
        assert_eq!(hashed, Value::Boolean(true));
    }

    #[test]
    fn test_in_enum_skips_unknown_members() {
        let typ = SqlType::Enum(EnumType::new(
            vec!["red".into(), "green".into()],
            Collation::default(),
        ));
        let col = Expression::column(0, typ, "color");
        let right = list(vec![Expression::literal("blue"), Expression::literal("green")]);
        assert_eq!(
            both(col.clone(), right.clone(), &[Value::Enum(2)]),
            (Value::Boolean(true), Value::Boolean(true))
        );
        assert_eq!(
            both(col, right, &[Value::Enum(1)]),
            (Value::Boolean(false), Value::Boolean(false))
        );
    }

    #[test]
    fn test_in_row_values() {
        let left = list(vec![Expression::literal(1i64), Expression::literal("a")]);
        let right = list(vec![
            list(vec![Expression::literal(2i64), Expression::literal("b")]),
            list(vec![Expression::literal(1i64), Expression::literal("a")]),
        ]);
        assert_eq!(both(left, right, &[]), (Value::Boolean(true), Value::Boolean(true)));
    }

    #[test]
    fn test_column_count_mismatch() {
        let left = list(vec![Expression::literal(1i64), Expression::literal(2i64)]);
        let right = list(vec![Expression::literal(1i64), Expression::literal(2i64)]);
        let err = InTuple::new(left.clone(), right.clone())
            .eval(&Context::default(), &[])
            .unwrap_err();
        assert_eq!(err, ExpressionError::InvalidOperandColumns { expected: 2, got: 1 });
        assert!(HashInTuple::new(left, right).is_err());
    }

    #[test]
    fn test_unsupported_right_side() {
        let left = Expression::literal(1i64);
        let err = InTuple::new(left.clone(), Expression::literal(1i64))
            .eval(&Context::default(), &[])
            .unwrap_err();
        assert!(matches!(err, ExpressionError::UnsupportedInOperand(_)));

        let with_column = list(vec![Expression::column(0, SqlType::Int64, "b")]);
        assert!(matches!(
            HashInTuple::new(left, with_column),
            Err(ExpressionError::UnsupportedInOperand(_))
        ));
    }

    #[test]
    fn test_deferred_left_scans() {
        let left = Expression::column(0, SqlType::Deferred, "p");
        let right = list(vec![Expression::literal(10i64), Expression::literal("x")]);
        assert_eq!(
            both(left.clone(), right.clone(), &[Value::Int64(10)]),
            (Value::Boolean(true), Value::Boolean(true))
        );
        assert_eq!(
            both(left, right, &[Value::from("y")]),
            (Value::Boolean(false), Value::Boolean(false))
        );
    }

    #[test]
    fn test_hash_matches_linear_on_random_rows() {
        let mut rng = rand::thread_rng();
        let right = list((0..20).map(|_| Expression::literal(rng.gen_range(-50i64..50))).collect());
        let col = Expression::column(0, SqlType::Int64, "a");
        let linear = InTuple::new(col.clone(), right.clone());
        let hashed = HashInTuple::new(col, right).unwrap();
        let ctx = Context::default();
        for _ in 0..200 {
            let row = [Value::Int64(rng.gen_range(-60i64..60))];
            assert_eq!(hashed.eval(&ctx, &row).unwrap(), linear.eval(&ctx, &row).unwrap());
        }
    }

    #[test]
    fn test_rendering() {
        let right = list(vec![Expression::literal(1i64), Expression::literal(2i64)]);
        let left = Expression::column(0, SqlType::Int64, "a");
        assert_eq!(InTuple::new(left.clone(), right.clone()).to_string(), "(a IN (1, 2))");
        assert_eq!(HashInTuple::new(left, right).unwrap().to_string(), "(a HASH IN (1, 2))");
    }
}
