//! The asynchronous query backend seen by the engine
//!
//! The backend is reached through one call: [`Backend::submit`] hands over
//! a query together with a [`Continuation`], and the backend completes the
//! continuation later, from whatever task or thread it likes. The
//! continuation is consumed on completion, so a query can never be
//! answered twice.

mod memory;

pub use memory::MemoryBackend;

use thiserror::Error;
use tokio::sync::oneshot;
use tracing::warn;

use crate::value::Value;

/// A query as handed to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    /// Query text
    pub statement: String,
    /// Bind parameters in order
    pub params: Vec<Value>,
}

impl QueryDescriptor {
    /// Query without parameters.
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            params: Vec::new(),
        }
    }

    /// Attach bind parameters.
    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }
}

/// Failure reported by the backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}{message}", .code.as_ref().map(|c| format!("[{c}] ")).unwrap_or_default())]
pub struct BackendError {
    /// Human-readable description
    pub message: String,
    /// Backend-specific error code
    pub code: Option<String>,
}

impl BackendError {
    /// Error with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Attach a backend error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// The backend dropped the continuation without completing it.
    pub fn dropped() -> Self {
        Self::new("backend dropped the query without completing it").with_code("DROPPED")
    }
}

/// Outcome delivered to a continuation.
pub type Completion = Result<Value, BackendError>;

/// One-shot completion handle for a submitted query.
///
/// Dropping a continuation without resuming it fails the waiting
/// evaluation with [`BackendError::dropped`].
#[derive(Debug)]
pub struct Continuation {
    tx: oneshot::Sender<Completion>,
}

impl Continuation {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<Completion>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Deliver the outcome and resume the suspended evaluation.
    ///
    /// Returns `false` when nobody is waiting any more (the execution was
    /// cancelled or already failed); the outcome is then discarded.
    pub fn resume(self, outcome: Completion) -> bool {
        match self.tx.send(outcome) {
            Ok(()) => true,
            Err(_) => {
                warn!("backend completion arrived after the execution stopped waiting; discarded");
                false
            }
        }
    }

    /// Resume with a result.
    pub fn succeed(self, value: Value) -> bool {
        self.resume(Ok(value))
    }

    /// Resume with a failure.
    pub fn fail(self, error: BackendError) -> bool {
        self.resume(Err(error))
    }

    /// Whether the waiting side has gone away.
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The external data service.
pub trait Backend: Send + Sync {
    /// Start `query` and complete `on_complete` exactly once when done.
    ///
    /// Must not block; the result may be delivered before or after this
    /// call returns.
    fn submit(&self, query: QueryDescriptor, on_complete: Continuation);
}
