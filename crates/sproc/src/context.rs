//! Evaluation context shared by every node of one execution

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::backend::{Backend, BackendError, Continuation};
use crate::catalog::Catalog;
use crate::error::EvalError;
use crate::ops::OperatorRegistry;
use crate::value::Value;

/// Services and settings threaded through evaluation.
///
/// Everything here is shared and read-only during a run; the mutable
/// per-execution state lives in the [`Environment`](crate::Environment).
#[derive(Clone)]
pub struct EvalContext {
    /// Routines callable by name
    pub catalog: Arc<Catalog>,

    /// Operator handlers
    pub operators: Arc<OperatorRegistry>,

    /// Where EXECUTE and async builtins send queries
    pub backend: Arc<dyn Backend>,

    /// Cancelled by the host to stop this execution
    pub cancel: CancellationToken,

    /// Emit a trace event for every statement
    pub trace: bool,
}

impl std::fmt::Debug for EvalContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalContext")
            .field("catalog", &self.catalog.len())
            .field("operators", &self.operators)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("trace", &self.trace)
            .finish()
    }
}

impl EvalContext {
    /// Context with the standard operators and a fresh cancellation token.
    pub fn new(catalog: Arc<Catalog>, backend: Arc<dyn Backend>) -> Self {
        Self {
            catalog,
            operators: Arc::new(OperatorRegistry::standard()),
            backend,
            cancel: CancellationToken::new(),
            trace: false,
        }
    }

    /// Replace the operator registry.
    pub fn with_operators(mut self, operators: Arc<OperatorRegistry>) -> Self {
        self.operators = operators;
        self
    }

    /// Turn per-statement tracing on or off.
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Whether the host asked this execution to stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Ask this execution to stop.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Suspend until an asynchronous operation completes.
    ///
    /// `start` receives the continuation and kicks the operation off; an
    /// `Err` from it aborts before anything was submitted. The wait is
    /// raced against cancellation, and a completion that arrives after
    /// cancellation finds no receiver and is discarded.
    pub async fn suspend<F>(&self, start: F) -> Result<Value, EvalError>
    where
        F: FnOnce(Continuation) -> Result<(), EvalError>,
    {
        if self.is_cancelled() {
            return Err(EvalError::Cancelled);
        }
        let (continuation, completion) = Continuation::channel();
        start(continuation)?;

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(EvalError::Cancelled),
            outcome = completion => {
                let source = match outcome {
                    Ok(Ok(value)) => return Ok(value),
                    Ok(Err(error)) => error,
                    Err(_) => BackendError::dropped(),
                };
                Err(EvalError::BackendFailure {
                    source,
                    procedure: None,
                    span: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn context() -> EvalContext {
        EvalContext::new(Arc::new(Catalog::new()), Arc::new(MemoryBackend::new()))
    }

    #[tokio::test]
    async fn test_suspend_resolves() {
        let ctx = context();
        let value = ctx
            .suspend(|k| {
                k.succeed(Value::Int(3));
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(value, Value::Int(3));
    }

    #[tokio::test]
    async fn test_dropped_continuation_is_backend_failure() {
        let ctx = context();
        let err = ctx.suspend(|k| {
            drop(k);
            Ok(())
        });
        assert!(matches!(err.await, Err(EvalError::BackendFailure { .. })));
    }

    #[tokio::test]
    async fn test_cancel_wins_over_pending_completion() {
        let ctx = context();
        let mut parked = None;
        let waiting = ctx.suspend(|k| {
            parked = Some(k);
            Ok(())
        });
        let canceller = async {
            tokio::task::yield_now().await;
            ctx.cancel();
        };
        let (result, ()) = tokio::join!(waiting, canceller);
        assert!(matches!(result, Err(EvalError::Cancelled)));

        let late = parked.take().unwrap();
        assert!(!late.succeed(Value::Int(1)));
    }
}
