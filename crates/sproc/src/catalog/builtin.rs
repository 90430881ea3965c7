//! Native routines

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::backend::{Backend, Continuation};
use crate::error::EvalError;
use crate::value::Value;

/// Synchronous native implementation. An `Err` message is reported as an
/// argument mismatch.
pub type SyncFn = Arc<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync>;

/// A builtin whose effect needs backend I/O.
pub trait AsyncBuiltin: Send + Sync {
    /// Start the operation and complete `done` exactly once.
    ///
    /// Returning `Err` rejects the arguments before anything was started;
    /// `done` is dropped unused in that case.
    fn apply(&self, args: Vec<Value>, backend: &dyn Backend, done: Continuation)
        -> Result<(), String>;
}

/// Which calling surface a builtin is bound to.
#[derive(Clone)]
pub enum BuiltinKind {
    /// `(args) -> Value`
    Sync(SyncFn),
    /// `(args, continuation)`
    Async(Arc<dyn AsyncBuiltin>),
}

/// A named native routine.
#[derive(Clone)]
pub struct Builtin {
    /// Name as registered
    pub name: String,
    /// Accepted argument counts
    pub arity: RangeInclusive<usize>,
    /// Implementation
    pub kind: BuiltinKind,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("async", &self.is_async())
            .finish()
    }
}

impl Builtin {
    /// Synchronous builtin.
    pub fn sync<F>(name: impl Into<String>, arity: RangeInclusive<usize>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arity,
            kind: BuiltinKind::Sync(Arc::new(f)),
        }
    }

    /// Backend-bound builtin.
    pub fn asynchronous(
        name: impl Into<String>,
        arity: RangeInclusive<usize>,
        imp: impl AsyncBuiltin + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            kind: BuiltinKind::Async(Arc::new(imp)),
        }
    }

    /// Whether calls suspend.
    pub fn is_async(&self) -> bool {
        matches!(self.kind, BuiltinKind::Async(_))
    }

    /// Check an argument count against the arity.
    pub fn check_arity(&self, count: usize) -> Result<(), EvalError> {
        if self.arity.contains(&count) {
            return Ok(());
        }
        let expected = match (*self.arity.start(), *self.arity.end()) {
            (lo, hi) if lo == hi => format!("{lo}"),
            (lo, usize::MAX) => format!("at least {lo}"),
            (lo, hi) => format!("{lo} to {hi}"),
        };
        Err(EvalError::argument_mismatch(
            &self.name,
            format!("expected {expected} arguments, got {count}"),
        ))
    }
}
