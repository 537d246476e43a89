//! Tree traversal and rewriting.
//!
//! Optimizer passes use [`walk`] and [`inspect`] to look at a tree and
//! [`transform_up`] to rebuild it bottom-up. Rewrites report through
//! [`TreeIdentity`] whether anything changed so callers can skip work when
//! nothing did.

use crate::expression::error::ExpressionResult;
use crate::expression::expr::{Expression, ExpressionOps};

/// Whether a rewrite produced a different tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeIdentity {
    SameTree,
    NewTree,
}

impl TreeIdentity {
    pub fn is_new(&self) -> bool {
        *self == TreeIdentity::NewTree
    }

    fn merge(self, other: TreeIdentity) -> TreeIdentity {
        if self.is_new() || other.is_new() {
            TreeIdentity::NewTree
        } else {
            TreeIdentity::SameTree
        }
    }
}

/// Pre-order visitor. Returning `None` stops descent into the node's
/// children; returning a visitor continues with it.
pub trait Visitor {
    fn visit<'a>(&'a mut self, expr: &Expression) -> Option<&'a mut dyn Visitor>;
}

/// Walk `expr` in pre-order with `visitor`.
pub fn walk(visitor: &mut dyn Visitor, expr: &Expression) {
    if let Some(child_visitor) = visitor.visit(expr) {
        for child in expr.children() {
            walk(child_visitor, child);
        }
    }
}

/// Call `f` on every node in pre-order. Returning false skips that node's
/// children.
pub fn inspect<F>(expr: &Expression, mut f: F)
where
    F: FnMut(&Expression) -> bool,
{
    inspect_inner(expr, &mut f);
}

fn inspect_inner<F>(expr: &Expression, f: &mut F)
where
    F: FnMut(&Expression) -> bool,
{
    if f(expr) {
        for child in expr.children() {
            inspect_inner(child, f);
        }
    }
}

/// Whether any node of the subtree satisfies `pred`.
pub fn exists<F>(expr: &Expression, mut pred: F) -> bool
where
    F: FnMut(&Expression) -> bool,
{
    let mut found = false;
    inspect(expr, |e| {
        if !found && pred(e) {
            found = true;
        }
        !found
    });
    found
}

/// Rewrite `expr` bottom-up. Children are transformed first and the node is
/// rebuilt only when one of them changed; `f` is then applied to the node.
pub fn transform_up<F>(expr: &Expression, f: &mut F) -> ExpressionResult<(Expression, TreeIdentity)>
where
    F: FnMut(Expression) -> ExpressionResult<(Expression, TreeIdentity)>,
{
    let (node, identity) = transform_children(expr, |child| transform_up(child, f))?;
    let (node, applied) = f(node)?;
    Ok((node, identity.merge(applied)))
}

/// Like [`transform_up`], also handing `f` the original parent of each node
/// and the node's index among its siblings. The root has no parent.
pub fn transform_up_with_node<F>(
    expr: &Expression,
    f: &mut F,
) -> ExpressionResult<(Expression, TreeIdentity)>
where
    F: FnMut(
        Expression,
        Option<&Expression>,
        usize,
    ) -> ExpressionResult<(Expression, TreeIdentity)>,
{
    transform_with_parent(expr, None, 0, f)
}

fn transform_with_parent<F>(
    expr: &Expression,
    parent: Option<&Expression>,
    index: usize,
    f: &mut F,
) -> ExpressionResult<(Expression, TreeIdentity)>
where
    F: FnMut(
        Expression,
        Option<&Expression>,
        usize,
    ) -> ExpressionResult<(Expression, TreeIdentity)>,
{
    let mut child_index = 0;
    let (node, identity) = transform_children(expr, |child| {
        let result = transform_with_parent(child, Some(expr), child_index, f);
        child_index += 1;
        result
    })?;
    let (node, applied) = f(node, parent, index)?;
    Ok((node, identity.merge(applied)))
}

fn transform_children<F>(
    expr: &Expression,
    mut transform_child: F,
) -> ExpressionResult<(Expression, TreeIdentity)>
where
    F: FnMut(&Expression) -> ExpressionResult<(Expression, TreeIdentity)>,
{
    let children = expr.children();
    if children.is_empty() {
        return Ok((expr.clone(), TreeIdentity::SameTree));
    }

    let mut identity = TreeIdentity::SameTree;
    let mut new_children = Vec::with_capacity(children.len());
    for child in children {
        let (new_child, child_identity) = transform_child(child)?;
        identity = identity.merge(child_identity);
        new_children.push(new_child);
    }

    if identity.is_new() {
        Ok((expr.with_children(new_children)?, TreeIdentity::NewTree))
    } else {
        Ok((expr.clone(), TreeIdentity::SameTree))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Context;
    use crate::types::{SqlType, Value};

    struct CountingVisitor {
        seen: Vec<String>,
    }

    impl Visitor for CountingVisitor {
        fn visit<'a>(&'a mut self, expr: &Expression) -> Option<&'a mut dyn Visitor> {
            self.seen.push(expr.to_string());
            // do not descend into comparisons
            if matches!(expr, Expression::Comparison(_)) {
                None
            } else {
                Some(self)
            }
        }
    }

    fn sample() -> Expression {
        Expression::and(
            Expression::eq(
                Expression::column(0, SqlType::Int64, "a"),
                Expression::literal(1i64),
            ),
            Expression::plus(Expression::literal(2i64), Expression::literal(3i64)),
        )
    }

    #[test]
    fn test_walk_pre_order_and_stop() {
        let mut visitor = CountingVisitor { seen: Vec::new() };
        walk(&mut visitor, &sample());
        assert_eq!(
            visitor.seen,
            vec!["(a = 1 AND (2 + 3))", "a = 1", "(2 + 3)", "2", "3"]
        );
    }

    #[test]
    fn test_inspect_and_exists() {
        let mut count = 0;
        inspect(&sample(), |_| {
            count += 1;
            true
        });
        assert_eq!(count, 7);

        assert!(exists(&sample(), |e| matches!(e, Expression::GetField(_))));
        assert!(!exists(&sample(), |e| matches!(e, Expression::Div(_))));
    }

    #[test]
    fn test_transform_up_same_tree() {
        let (out, identity) =
            transform_up(&sample(), &mut |e| Ok((e, TreeIdentity::SameTree))).unwrap();
        assert_eq!(identity, TreeIdentity::SameTree);
        assert_eq!(out.to_string(), sample().to_string());
    }

    #[test]
    fn test_transform_up_replaces_columns() {
        let (out, identity) = transform_up(&sample(), &mut |e| match e {
            Expression::GetField(_) => Ok((Expression::literal(1i64), TreeIdentity::NewTree)),
            other => Ok((other, TreeIdentity::SameTree)),
        })
        .unwrap();
        assert_eq!(identity, TreeIdentity::NewTree);
        assert_eq!(out.to_string(), "(1 = 1 AND (2 + 3))");
        let ctx = Context::default();
        assert_eq!(out.eval(&ctx, &[]).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_transform_up_propagates_errors() {
        let result = transform_up(&sample(), &mut |e| match e {
            Expression::Literal(_) => Err(crate::expression::ExpressionError::Cancelled),
            other => Ok((other, TreeIdentity::SameTree)),
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_transform_up_with_node_sees_parents() {
        let mut parents = Vec::new();
        transform_up_with_node(&sample(), &mut |e, parent, index| {
            if let Expression::Literal(_) = e {
                parents.push((parent.map(|p| p.to_string()), index));
            }
            Ok((e, TreeIdentity::SameTree))
        })
        .unwrap();
        assert_eq!(
            parents,
            vec![
                (Some("a = 1".to_string()), 1),
                (Some("(2 + 3)".to_string()), 0),
                (Some("(2 + 3)".to_string()), 1),
            ]
        );
    }
}
