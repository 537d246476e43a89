//! Stored-procedure parameters and the scope stack they read from.
//!
//! A [`ProcedureReference`] is created once per CALL and shared by every
//! [`ProcedureParam`] in the procedure body. It holds a stack of scopes,
//! one per `BEGIN ... END` block, each with its declared variables, cursors
//! and condition handlers.
//!
//! Row sources and iterators are user code: they are never called while
//! the scope lock is held, so a handler statement may itself read and set
//! procedure variables.

use crate::expression::error::{ExpressionError, ExpressionResult};
use crate::expression::expr::{take_children, Expression, ExpressionOps};
use crate::expression::transform::{transform_up, TreeIdentity};
use crate::session::Context;
use crate::types::{Row, SqlType, Value};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Iterator over the rows of an opened statement.
pub trait RowIter: Send {
    fn next(&mut self, ctx: &Context) -> ExpressionResult<Option<Row>>;

    fn close(&mut self, ctx: &Context) -> ExpressionResult<()>;
}

/// A statement that can be run repeatedly, such as a cursor's SELECT or a
/// handler body.
pub trait RowSource: Send + Sync {
    fn row_iter(&self, ctx: &Context, row: &[Value]) -> ExpressionResult<Box<dyn RowIter>>;

    /// Column types of the produced rows.
    fn schema(&self) -> Vec<SqlType>;
}

type SharedIter = Arc<Mutex<Box<dyn RowIter>>>;

struct Variable {
    value: Value,
    sql_type: SqlType,
    has_been_set: bool,
}

struct Cursor {
    source: Arc<dyn RowSource>,
    iter: Option<SharedIter>,
}

#[derive(Clone)]
struct Handler {
    statement: Arc<dyn RowSource>,
    is_exit: bool,
    scope_height: usize,
}

#[derive(Default)]
struct Scope {
    variables: HashMap<String, Variable>,
    cursors: HashMap<String, Cursor>,
    handlers: Vec<Handler>,
}

struct ScopeStack {
    scopes: Vec<Scope>,
    /// While a handler runs, only scopes below this height are visible.
    visible_height: Option<usize>,
}

impl ScopeStack {
    fn visible(&self) -> &[Scope] {
        let height = self
            .visible_height
            .unwrap_or(self.scopes.len())
            .min(self.scopes.len());
        &self.scopes[..height]
    }

    fn visible_mut(&mut self) -> &mut [Scope] {
        let height = self
            .visible_height
            .unwrap_or(self.scopes.len())
            .min(self.scopes.len());
        &mut self.scopes[..height]
    }

    fn variable(&self, name: &str) -> Option<&Variable> {
        self.visible().iter().rev().find_map(|s| s.variables.get(name))
    }

    fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.visible_mut()
            .iter_mut()
            .rev()
            .find_map(|s| s.variables.get_mut(name))
    }

    fn cursor_mut(&mut self, name: &str) -> ExpressionResult<&mut Cursor> {
        self.visible_mut()
            .iter_mut()
            .rev()
            .find_map(|s| s.cursors.get_mut(name))
            .ok_or_else(|| ExpressionError::UnknownCursor(name.to_string()))
    }

    fn innermost(&mut self) -> &mut Scope {
        if self.scopes.is_empty() {
            self.scopes.push(Scope::default());
        }
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }
}

/// Scope stack of one procedure invocation.
pub struct ProcedureReference {
    stack: Mutex<ScopeStack>,
}

fn normalize(name: &str) -> String {
    name.to_lowercase()
}

/// Close every iterator, returning the first failure.
fn close_iters(ctx: &Context, iters: Vec<(String, SharedIter)>) -> ExpressionResult<()> {
    let mut first_error = None;
    for (name, iter) in iters {
        if let Err(e) = iter.lock().close(ctx) {
            log::warn!("failed to close cursor {}: {}", name, e);
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

impl ProcedureReference {
    /// New reference with a single root scope.
    pub fn new() -> Self {
        Self {
            stack: Mutex::new(ScopeStack {
                scopes: vec![Scope::default()],
                visible_height: None,
            }),
        }
    }

    /// Declare a variable in the innermost scope.
    pub fn initialize_variable(
        &self,
        name: &str,
        sql_type: SqlType,
        value: Value,
    ) -> ExpressionResult<()> {
        let (value, _) = sql_type.convert(&value)?;
        let mut stack = self.stack.lock();
        stack.innermost().variables.insert(
            normalize(name),
            Variable {
                value,
                sql_type,
                has_been_set: false,
            },
        );
        Ok(())
    }

    pub fn get_variable_value(&self, name: &str) -> ExpressionResult<Value> {
        self.stack
            .lock()
            .variable(&normalize(name))
            .map(|v| v.value.clone())
            .ok_or_else(|| ExpressionError::UnknownProcedureVariable(name.to_string()))
    }

    /// Declared type of a variable; NULL when unknown.
    pub fn get_variable_type(&self, name: &str) -> SqlType {
        self.stack
            .lock()
            .variable(&normalize(name))
            .map(|v| v.sql_type.clone())
            .unwrap_or(SqlType::Null)
    }

    /// Assign a variable, converting to its declared type. `value_type` is
    /// the type of the assigned expression.
    pub fn set_variable(
        &self,
        name: &str,
        value: Value,
        value_type: &SqlType,
    ) -> ExpressionResult<()> {
        let mut stack = self.stack.lock();
        let variable = stack
            .variable_mut(&normalize(name))
            .ok_or_else(|| ExpressionError::UnknownProcedureVariable(name.to_string()))?;
        let (converted, _) =
            variable
                .sql_type
                .convert(&value)
                .map_err(|_| ExpressionError::UnableToCast {
                    left: value_type.to_string(),
                    right: variable.sql_type.to_string(),
                })?;
        variable.value = converted;
        variable.has_been_set = true;
        Ok(())
    }

    pub fn variable_has_been_set(&self, name: &str) -> bool {
        self.stack
            .lock()
            .variable(&normalize(name))
            .is_some_and(|v| v.has_been_set)
    }

    /// Declare a cursor in the innermost scope. It starts closed.
    pub fn initialize_cursor(&self, name: &str, source: Arc<dyn RowSource>) {
        self.stack
            .lock()
            .innermost()
            .cursors
            .insert(normalize(name), Cursor { source, iter: None });
    }

    pub fn open_cursor(&self, ctx: &Context, name: &str, row: &[Value]) -> ExpressionResult<()> {
        let key = normalize(name);
        let source = {
            let mut stack = self.stack.lock();
            let cursor = stack.cursor_mut(&key)?;
            if cursor.iter.is_some() {
                return Err(ExpressionError::CursorAlreadyOpen(name.to_string()));
            }
            Arc::clone(&cursor.source)
        };

        let iter = source.row_iter(ctx, row)?;

        let mut stack = self.stack.lock();
        let cursor = stack.cursor_mut(&key)?;
        if cursor.iter.is_some() {
            drop(stack);
            let mut iter = iter;
            iter.close(ctx)?;
            return Err(ExpressionError::CursorAlreadyOpen(name.to_string()));
        }
        cursor.iter = Some(Arc::new(Mutex::new(iter)));
        log::debug!("opened cursor {}", key);
        Ok(())
    }

    pub fn close_cursor(&self, ctx: &Context, name: &str) -> ExpressionResult<()> {
        let key = normalize(name);
        let iter = {
            let mut stack = self.stack.lock();
            stack
                .cursor_mut(&key)?
                .iter
                .take()
                .ok_or_else(|| ExpressionError::CursorNotOpen(name.to_string()))?
        };
        let result = iter.lock().close(ctx);
        result
    }

    /// Next row of an open cursor, with the cursor's column types. `None`
    /// once the cursor is exhausted.
    pub fn fetch_cursor(
        &self,
        ctx: &Context,
        name: &str,
    ) -> ExpressionResult<(Option<Row>, Vec<SqlType>)> {
        let (source, iter) = {
            let mut stack = self.stack.lock();
            let cursor = stack.cursor_mut(&normalize(name))?;
            let iter = cursor
                .iter
                .clone()
                .ok_or_else(|| ExpressionError::CursorNotOpen(name.to_string()))?;
            (Arc::clone(&cursor.source), iter)
        };
        let row = iter.lock().next(ctx)?;
        Ok((row, source.schema()))
    }

    /// Declare a condition handler in the innermost scope.
    pub fn initialize_handler(&self, statement: Arc<dyn RowSource>, is_exit: bool) {
        let mut stack = self.stack.lock();
        let scope_height = stack.scopes.len();
        stack.innermost().handlers.push(Handler {
            statement,
            is_exit,
            scope_height,
        });
    }

    /// Run the innermost handler for `err`. Without a handler the error is
    /// returned unchanged; an EXIT handler returns
    /// [`ExpressionError::ProcedureBlockExit`] after running.
    pub fn handle_error(&self, ctx: &Context, err: ExpressionError) -> ExpressionResult<()> {
        let (handler, previous_visibility) = {
            let mut stack = self.stack.lock();
            let handler = stack
                .visible()
                .iter()
                .rev()
                .find_map(|scope| scope.handlers.last().cloned());
            let Some(handler) = handler else {
                return Err(err);
            };
            let previous = stack.visible_height.replace(handler.scope_height);
            (handler, previous)
        };
        log::debug!(
            "running {} handler at scope height {} for: {}",
            if handler.is_exit { "EXIT" } else { "CONTINUE" },
            handler.scope_height,
            err
        );

        let result = run_to_completion(ctx, handler.statement.as_ref());
        self.stack.lock().visible_height = previous_visibility;
        result?;

        if handler.is_exit {
            return Err(ExpressionError::ProcedureBlockExit {
                scope_height: handler.scope_height,
            });
        }
        Ok(())
    }

    pub fn push_scope(&self) {
        self.stack.lock().scopes.push(Scope::default());
    }

    /// Remove the innermost scope, closing its open cursors. The scope is
    /// removed even if a close fails.
    pub fn pop_scope(&self, ctx: &Context) -> ExpressionResult<()> {
        let scope = {
            let mut stack = self.stack.lock();
            if stack.scopes.len() <= 1 {
                return Err(ExpressionError::EmptyScopeStack);
            }
            stack.scopes.pop()
        };
        let iters = scope
            .into_iter()
            .flat_map(|s| s.cursors)
            .filter_map(|(name, cursor)| cursor.iter.map(|iter| (name, iter)))
            .collect();
        close_iters(ctx, iters)
    }

    /// Close every open cursor in every scope.
    pub fn close_all_cursors(&self, ctx: &Context) -> ExpressionResult<()> {
        let iters = {
            let mut stack = self.stack.lock();
            stack
                .scopes
                .iter_mut()
                .flat_map(|s| s.cursors.iter_mut())
                .filter_map(|(name, cursor)| cursor.iter.take().map(|iter| (name.clone(), iter)))
                .collect()
        };
        close_iters(ctx, iters)
    }

    pub fn current_height(&self) -> usize {
        self.stack.lock().scopes.len()
    }
}

fn run_to_completion(ctx: &Context, statement: &dyn RowSource) -> ExpressionResult<()> {
    let mut iter = statement.row_iter(ctx, &[])?;
    let drained = loop {
        match iter.next(ctx) {
            Ok(Some(_)) => continue,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    let closed = iter.close(ctx);
    drained.and(closed)
}

impl Default for ProcedureReference {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProcedureReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stack = self.stack.lock();
        f.debug_struct("ProcedureReference")
            .field("height", &stack.scopes.len())
            .field("visible_height", &stack.visible_height)
            .finish()
    }
}

/// A procedure variable or parameter bound to its reference.
#[derive(Debug, Clone)]
pub struct ProcedureParam {
    name: String,
    reference: Arc<ProcedureReference>,
}

impl ProcedureParam {
    pub fn new(name: impl Into<String>, reference: Arc<ProcedureReference>) -> Self {
        Self {
            name: name.into(),
            reference,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reference(&self) -> &Arc<ProcedureReference> {
        &self.reference
    }

    /// `SET name = value`
    pub fn set(&self, value: Value, value_type: &SqlType) -> ExpressionResult<()> {
        self.reference.set_variable(&self.name, value, value_type)
    }
}

impl ExpressionOps for ProcedureParam {
    fn eval(&self, _ctx: &Context, _row: &[Value]) -> ExpressionResult<Value> {
        self.reference.get_variable_value(&self.name)
    }

    fn sql_type(&self) -> SqlType {
        self.reference.get_variable_type(&self.name)
    }

    fn is_nullable(&self) -> bool {
        true
    }

    fn resolved(&self) -> bool {
        true
    }

    fn children(&self) -> Vec<&Expression> {
        Vec::new()
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        take_children::<0>(self, children)?;
        Ok(Expression::ProcedureParam(self.clone()))
    }

    fn debug_string(&self) -> String {
        format!("{} ({})", self.name, self.sql_type())
    }
}

impl fmt::Display for ProcedureParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A procedure variable seen by the parser before the CALL binds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedProcedureParam {
    name: String,
}

impl UnresolvedProcedureParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_param_reference(&self, reference: Arc<ProcedureReference>) -> ProcedureParam {
        ProcedureParam::new(self.name.clone(), reference)
    }
}

impl ExpressionOps for UnresolvedProcedureParam {
    fn eval(&self, _ctx: &Context, _row: &[Value]) -> ExpressionResult<Value> {
        Err(ExpressionError::NotEvaluable {
            expression: self.to_string(),
        })
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Deferred
    }

    fn is_nullable(&self) -> bool {
        true
    }

    fn resolved(&self) -> bool {
        false
    }

    fn children(&self) -> Vec<&Expression> {
        Vec::new()
    }

    fn with_children(&self, children: Vec<Expression>) -> ExpressionResult<Expression> {
        take_children::<0>(self, children)?;
        Ok(Expression::UnresolvedProcedureParam(self.clone()))
    }

    fn debug_string(&self) -> String {
        format!("{} (unresolved)", self.name)
    }
}

impl fmt::Display for UnresolvedProcedureParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Bind every unresolved procedure parameter in `expr` to `reference`.
pub fn bind_procedure_params(
    expr: &Expression,
    reference: &Arc<ProcedureReference>,
) -> ExpressionResult<Expression> {
    let (bound, _) = transform_up(expr, &mut |node| match node {
        Expression::UnresolvedProcedureParam(param) => Ok((
            Expression::ProcedureParam(param.with_param_reference(Arc::clone(reference))),
            TreeIdentity::NewTree,
        )),
        other => Ok((other, TreeIdentity::SameTree)),
    })?;
    Ok(bound)
}
