//! Session state shared by the expressions of one client: configuration,
//! the warning list and query cancellation.

use crate::config::EvalConfig;
use crate::expression::error::{ExpressionError, ExpressionResult};
use crate::types::{SqlType, Value};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// ER_TRUNCATED_WRONG_VALUE
pub const ER_TRUNCATED_WRONG_VALUE: u16 = 1292;
/// ER_DIVISION_BY_ZERO
pub const ER_DIVISION_BY_ZERO: u16 = 1365;
/// ER_DATETIME_FUNCTION_OVERFLOW
pub const ER_DATETIME_FUNCTION_OVERFLOW: u16 = 1441;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// A warning raised while evaluating, as reported by `SHOW WARNINGS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub level: &'static str,
    pub code: u16,
    pub message: String,
}

/// Represents a client session.
#[derive(Debug)]
pub struct Session {
    /// Session ID for tracking.
    pub id: u64,
    pub config: EvalConfig,
    warnings: Mutex<Vec<Warning>>,
    /// Total warnings raised, including ones dropped past `max_warnings`.
    warning_count: AtomicUsize,
}

impl Session {
    pub fn new(config: EvalConfig) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            config,
            warnings: Mutex::new(Vec::new()),
            warning_count: AtomicUsize::new(0),
        }
    }

    /// Record a warning. Only the first `max_warnings` are kept.
    pub fn warn(&self, code: u16, message: impl Into<String>) {
        self.warning_count.fetch_add(1, Ordering::Relaxed);
        let mut warnings = self.warnings.lock();
        if warnings.len() < self.config.max_warnings {
            warnings.push(Warning {
                level: "Warning",
                code,
                message: message.into(),
            });
        }
    }

    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings.lock().clone()
    }

    pub fn clear_warnings(&self) {
        self.warnings.lock().clear();
        self.warning_count.store(0, Ordering::Relaxed);
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count.load(Ordering::Relaxed)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(EvalConfig::default())
    }
}

/// Per-query evaluation context threaded through every `eval` call.
#[derive(Debug, Clone)]
pub struct Context {
    pub session: Arc<Session>,
    cancelled: Arc<AtomicBool>,
    pub query_id: u64,
}

impl Context {
    pub fn new(session: Arc<Session>, query_id: u64) -> Self {
        Self {
            session,
            cancelled: Arc::new(AtomicBool::new(false)),
            query_id,
        }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.session.config
    }

    pub fn warn(&self, code: u16, message: impl Into<String>) {
        let message = message.into();
        log::debug!(
            "session {} query {}: warning {}: {}",
            self.session.id,
            self.query_id,
            code,
            message
        );
        self.session.warn(code, message);
    }

    /// Warn that `value` could not be read as `target` (1292).
    pub fn warn_truncated(&self, target: &SqlType, value: &Value) {
        self.warn(
            ER_TRUNCATED_WRONG_VALUE,
            format!(
                "Truncated incorrect {} value: '{}'",
                target.to_string().to_uppercase(),
                value
            ),
        );
    }

    /// Request cancellation; evaluators stop before the next row.
    pub fn cancel(&self) {
        log::debug!("query {} cancelled", self.query_id);
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn check_cancelled(&self) -> ExpressionResult<()> {
        if self.is_cancelled() {
            return Err(ExpressionError::Cancelled);
        }
        Ok(())
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Arc::new(Session::default()), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_are_capped() {
        let session = Session::new(EvalConfig {
            max_warnings: 2,
            ..EvalConfig::default()
        });
        for i in 0..5 {
            session.warn(ER_TRUNCATED_WRONG_VALUE, format!("w{}", i));
        }
        assert_eq!(session.warnings().len(), 2);
        assert_eq!(session.warning_count(), 5);
        assert_eq!(session.warnings()[1].message, "w1");

        session.clear_warnings();
        assert!(session.warnings().is_empty());
        assert_eq!(session.warning_count(), 0);
    }

    #[test]
    fn test_context_warn_reaches_session() {
        let ctx = Context::default();
        ctx.warn(ER_DIVISION_BY_ZERO, "Division by 0");
        let warnings = ctx.session.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, 1365);
        assert_eq!(warnings[0].level, "Warning");
    }

    #[test]
    fn test_warn_truncated_message() {
        let ctx = Context::default();
        ctx.warn_truncated(&SqlType::Float64, &Value::from("abc"));
        let warnings = ctx.session.warnings();
        assert_eq!(warnings[0].code, ER_TRUNCATED_WRONG_VALUE);
        assert_eq!(warnings[0].message, "Truncated incorrect DOUBLE value: 'abc'");
    }

    #[test]
    fn test_cancellation() {
        let ctx = Context::default();
        assert!(ctx.check_cancelled().is_ok());
        let clone = ctx.clone();
        clone.cancel();
        assert!(ctx.is_cancelled());
        assert!(matches!(ctx.check_cancelled(), Err(ExpressionError::Cancelled)));
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(Session::default().id, Session::default().id);
    }
}
