//! Control signals for BREAK / CONTINUE / RETURN / THROW

use crate::ast::Span;
use crate::error::EvalError;
use crate::value::Value;

/// Outcome of executing a statement.
///
/// Statements never unwind through `Err` to transfer control; they return
/// a signal and every construct decides whether to consume it or hand it
/// to its parent. `Err` is reserved for engine faults.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Normal completion; continue with the next statement
    None,

    /// Leave the innermost loop
    Break,

    /// Skip to the innermost loop's next iteration
    Continue,

    /// Leave the procedure, optionally with a value
    Return(Option<Value>),

    /// Language-level exception looking for a CATCH
    Throw(Thrown),
}

/// Payload of a THROW in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct Thrown {
    /// Value bound by the catching handler
    pub payload: Value,

    /// Procedure the THROW escaped from, if it crossed a call boundary
    pub procedure: Option<String>,

    /// Where it was raised
    pub span: Option<Span>,

    /// Engine failure this THROW stands for, if it was not raised by script
    pub fault: Option<Box<EvalError>>,
}

impl Thrown {
    /// Throw `payload` from the current position.
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            procedure: None,
            span: None,
            fault: None,
        }
    }

    /// Record where the THROW was raised.
    pub fn at(mut self, span: Option<Span>) -> Self {
        self.span = self.span.or(span);
        self
    }

    /// The failure reported when nothing catches this THROW.
    ///
    /// Engine faults come back as themselves, tagged with the procedure
    /// they escaped from; script throws become `ScriptThrow`.
    pub fn into_error(self) -> EvalError {
        match self.fault {
            Some(fault) => match &self.procedure {
                Some(name) => fault.in_procedure(name),
                None => *fault,
            },
            None => EvalError::ScriptThrow {
                payload: self.payload,
                procedure: self.procedure,
                span: self.span,
            },
        }
    }
}

impl Signal {
    /// Throw `payload`.
    pub fn throw(payload: impl Into<Value>) -> Self {
        Signal::Throw(Thrown::new(payload.into()))
    }

    /// Return `value` from the enclosing procedure.
    pub fn return_value(value: impl Into<Value>) -> Self {
        Signal::Return(Some(value.into()))
    }

    /// Whether execution continues with the next statement.
    pub fn is_none(&self) -> bool {
        matches!(self, Signal::None)
    }

    /// Resolve a signal that reached the top of a script or procedure body.
    ///
    /// RETURN yields its value; BREAK and CONTINUE have no loop left to
    /// consume them; THROW becomes the failure.
    pub fn escape(self) -> Result<Option<Value>, EvalError> {
        match self {
            Signal::None => Ok(None),
            Signal::Return(value) => Ok(Some(value.unwrap_or(Value::Null))),
            Signal::Break => Err(EvalError::control_flow("BREAK outside loop")),
            Signal::Continue => Err(EvalError::control_flow("CONTINUE outside loop")),
            Signal::Throw(thrown) => Err(thrown.into_error()),
        }
    }
}
