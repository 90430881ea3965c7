//! Error types for script evaluation

use std::fmt;

use thiserror::Error;

use crate::ast::Span;
use crate::backend::BackendError;
use crate::eval::Thrown;
use crate::types::DataType;
use crate::value::Value;

/// Reporting category of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No operator handler for the operands, or a value of the wrong type
    TypeMismatch,
    /// Reference to an undeclared variable
    UndefinedVariable,
    /// Second declaration of a name in one scope
    DuplicateDeclaration,
    /// Call to an unregistered procedure or builtin
    UndefinedProcedure,
    /// Arguments do not fit the parameter list
    ArgumentMismatch,
    /// BREAK outside a loop, bad RETURN, and similar
    ControlFlowError,
    /// Unhandled language-level THROW
    ScriptThrow,
    /// The backend reported a failure
    BackendFailure,
    /// Division by zero or integer overflow
    Arithmetic,
    /// Call depth limit exceeded
    ResourceLimit,
    /// The hosting caller cancelled the execution
    Cancelled,
    /// Procedure admission rejected by the catalog
    Catalog,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::TypeMismatch => "TypeMismatch",
            ErrorKind::UndefinedVariable => "UndefinedVariable",
            ErrorKind::DuplicateDeclaration => "DuplicateDeclaration",
            ErrorKind::UndefinedProcedure => "UndefinedProcedure",
            ErrorKind::ArgumentMismatch => "ArgumentMismatch",
            ErrorKind::ControlFlowError => "ControlFlowError",
            ErrorKind::ScriptThrow => "ScriptThrow",
            ErrorKind::BackendFailure => "BackendFailure",
            ErrorKind::Arithmetic => "Arithmetic",
            ErrorKind::ResourceLimit => "ResourceLimit",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::Catalog => "Catalog",
        };
        f.write_str(name)
    }
}

/// Errors raised while evaluating scripts and procedures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// No registered operator handler accepts the operand types
    #[error(
        "type mismatch: operator `{symbol}` is not defined for {left_type}{}",
        .right_type.as_ref().map(|r| format!(" and {r}")).unwrap_or_default()
    )]
    TypeMismatch {
        /// Operator symbol
        symbol: String,
        /// Type of the left (or only) operand
        left_type: String,
        /// Type of the right operand, absent for unary operators
        right_type: Option<String>,
        /// Statement location
        span: Option<Span>,
    },

    /// A value of the wrong type outside operator dispatch
    #[error("type error: {message}")]
    TypeError {
        /// What was expected and found
        message: String,
        /// Statement location
        span: Option<Span>,
    },

    /// Variable not found in any enclosing scope
    #[error("undefined variable `{name}`")]
    UndefinedVariable {
        /// Variable name
        name: String,
        /// Statement location
        span: Option<Span>,
    },

    /// Name declared twice in the same scope
    #[error("`{name}` is already declared in this scope")]
    DuplicateDeclaration {
        /// Variable name
        name: String,
        /// Statement location
        span: Option<Span>,
    },

    /// No procedure or builtin with this name
    #[error("undefined procedure `{name}`")]
    UndefinedProcedure {
        /// Routine name
        name: String,
        /// Statement location
        span: Option<Span>,
    },

    /// Call arguments do not fit the parameter list
    #[error("argument mismatch calling `{procedure}`: {message}")]
    ArgumentMismatch {
        /// Routine name
        procedure: String,
        /// Details
        message: String,
        /// Statement location
        span: Option<Span>,
    },

    /// Illegal control transfer
    #[error("control flow error: {message}")]
    ControlFlow {
        /// Details
        message: String,
        /// Statement location
        span: Option<Span>,
    },

    /// Language-level THROW nobody caught
    #[error("unhandled THROW{}: {payload}", procedure_suffix(.procedure))]
    ScriptThrow {
        /// Thrown payload
        payload: Value,
        /// Procedure the THROW escaped from
        procedure: Option<String>,
        /// Location of the THROW
        span: Option<Span>,
    },

    /// Backend reported a failure
    #[error("backend failure{}: {source}", procedure_suffix(.procedure))]
    BackendFailure {
        /// The backend's error
        #[source]
        source: BackendError,
        /// Procedure the failure escaped from
        procedure: Option<String>,
        /// Statement location
        span: Option<Span>,
    },

    /// Division or remainder by zero
    #[error("division by zero{}", procedure_suffix(.procedure))]
    DivisionByZero {
        /// Procedure the failure escaped from
        procedure: Option<String>,
        /// Statement location
        span: Option<Span>,
    },

    /// Integer overflow in arithmetic
    #[error("integer overflow{}", procedure_suffix(.procedure))]
    IntegerOverflow {
        /// Procedure the failure escaped from
        procedure: Option<String>,
        /// Statement location
        span: Option<Span>,
    },

    /// Call depth limit exceeded
    #[error("call depth {depth} exceeds the limit of {max}")]
    StackOverflow {
        /// Depth reached
        depth: usize,
        /// Configured maximum
        max: usize,
        /// Statement location
        span: Option<Span>,
    },

    /// The hosting caller cancelled the execution
    #[error("execution cancelled")]
    Cancelled,

    /// Procedure admission rejected
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl EvalError {
    /// Taxonomy kind, for reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::TypeMismatch { .. } | EvalError::TypeError { .. } => {
                ErrorKind::TypeMismatch
            }
            EvalError::UndefinedVariable { .. } => ErrorKind::UndefinedVariable,
            EvalError::DuplicateDeclaration { .. } => ErrorKind::DuplicateDeclaration,
            EvalError::UndefinedProcedure { .. } => ErrorKind::UndefinedProcedure,
            EvalError::ArgumentMismatch { .. } => ErrorKind::ArgumentMismatch,
            EvalError::ControlFlow { .. } => ErrorKind::ControlFlowError,
            EvalError::ScriptThrow { .. } => ErrorKind::ScriptThrow,
            EvalError::BackendFailure { .. } => ErrorKind::BackendFailure,
            EvalError::DivisionByZero { .. } | EvalError::IntegerOverflow { .. } => {
                ErrorKind::Arithmetic
            }
            EvalError::StackOverflow { .. } => ErrorKind::ResourceLimit,
            EvalError::Cancelled => ErrorKind::Cancelled,
            EvalError::Catalog(_) => ErrorKind::Catalog,
        }
    }

    /// Originating statement location, if known.
    pub fn span(&self) -> Option<Span> {
        match self {
            EvalError::TypeMismatch { span, .. }
            | EvalError::TypeError { span, .. }
            | EvalError::UndefinedVariable { span, .. }
            | EvalError::DuplicateDeclaration { span, .. }
            | EvalError::UndefinedProcedure { span, .. }
            | EvalError::ArgumentMismatch { span, .. }
            | EvalError::ControlFlow { span, .. }
            | EvalError::ScriptThrow { span, .. }
            | EvalError::BackendFailure { span, .. }
            | EvalError::DivisionByZero { span, .. }
            | EvalError::IntegerOverflow { span, .. }
            | EvalError::StackOverflow { span, .. } => *span,
            EvalError::Cancelled | EvalError::Catalog(_) => None,
        }
    }

    /// Fill in the location if the error does not carry one yet.
    pub fn with_span(mut self, at: Option<Span>) -> Self {
        if let Some(slot) = self.span_slot() {
            if slot.is_none() {
                *slot = at;
            }
        }
        self
    }

    fn span_slot(&mut self) -> Option<&mut Option<Span>> {
        match self {
            EvalError::TypeMismatch { span, .. }
            | EvalError::TypeError { span, .. }
            | EvalError::UndefinedVariable { span, .. }
            | EvalError::DuplicateDeclaration { span, .. }
            | EvalError::UndefinedProcedure { span, .. }
            | EvalError::ArgumentMismatch { span, .. }
            | EvalError::ControlFlow { span, .. }
            | EvalError::ScriptThrow { span, .. }
            | EvalError::BackendFailure { span, .. }
            | EvalError::DivisionByZero { span, .. }
            | EvalError::IntegerOverflow { span, .. }
            | EvalError::StackOverflow { span, .. } => Some(span),
            EvalError::Cancelled | EvalError::Catalog(_) => None,
        }
    }

    /// Whether a script `CATCH` may handle this failure.
    ///
    /// Engine faults (type errors, undefined names, bad arguments, illegal
    /// control flow, limits, cancellation) are never catchable.
    pub fn is_catchable(&self) -> bool {
        matches!(
            self,
            EvalError::ScriptThrow { .. }
                | EvalError::BackendFailure { .. }
                | EvalError::DivisionByZero { .. }
                | EvalError::IntegerOverflow { .. }
        )
    }

    /// Convert a catchable failure into the THROW it stands for.
    ///
    /// Engine faults are thrown as a `{kind, message}` record and keep the
    /// original error, which is reported again if nothing catches it.
    /// Returns the error unchanged when it is not catchable.
    pub fn into_thrown(self) -> std::result::Result<Thrown, EvalError> {
        match self {
            EvalError::ScriptThrow {
                payload,
                procedure,
                span,
            } => Ok(Thrown {
                payload,
                procedure,
                span,
                fault: None,
            }),
            e @ (EvalError::BackendFailure { .. }
            | EvalError::DivisionByZero { .. }
            | EvalError::IntegerOverflow { .. }) => {
                let payload = Value::record_from([
                    ("kind", Value::string(e.kind().to_string())),
                    ("message", Value::string(e.to_string())),
                ]);
                Ok(Thrown {
                    payload,
                    procedure: None,
                    span: e.span(),
                    fault: Some(Box::new(e)),
                })
            }
            other => Err(other),
        }
    }

    /// Tag a failure escaping a procedure with the procedure's name.
    ///
    /// The innermost procedure wins; failures that never cross a call
    /// boundary are returned unchanged.
    pub fn in_procedure(mut self, name: &str) -> Self {
        if let EvalError::ScriptThrow { procedure, .. }
        | EvalError::BackendFailure { procedure, .. }
        | EvalError::DivisionByZero { procedure, .. }
        | EvalError::IntegerOverflow { procedure, .. } = &mut self
        {
            procedure.get_or_insert_with(|| name.to_string());
        }
        self
    }

    /// Division or remainder by zero, not yet located.
    pub fn division_by_zero() -> Self {
        EvalError::DivisionByZero {
            procedure: None,
            span: None,
        }
    }

    /// Integer overflow, not yet located.
    pub fn integer_overflow() -> Self {
        EvalError::IntegerOverflow {
            procedure: None,
            span: None,
        }
    }

    /// Build a `ControlFlow` error.
    pub fn control_flow(message: impl Into<String>) -> Self {
        EvalError::ControlFlow {
            message: message.into(),
            span: None,
        }
    }

    /// Build a `TypeError` for a value that should have had type `expected`.
    pub fn expected(expected: &str, found: &Value, context: &str) -> Self {
        EvalError::TypeError {
            message: format!(
                "expected {expected} in {context}, found {}",
                found.type_name()
            ),
            span: None,
        }
    }

    /// Build an `ArgumentMismatch` error.
    pub fn argument_mismatch(procedure: &str, message: impl Into<String>) -> Self {
        EvalError::ArgumentMismatch {
            procedure: procedure.to_string(),
            message: message.into(),
            span: None,
        }
    }
}

/// Errors from scope operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnvironmentError {
    /// Variable not found
    #[error("undefined variable `{name}`")]
    UndefinedVariable {
        /// Variable name
        name: String,
    },

    /// Name already declared in the current scope
    #[error("`{name}` is already declared in this scope")]
    DuplicateDeclaration {
        /// Variable name
        name: String,
    },

    /// Value does not fit the variable's declared type
    #[error("cannot store {found} in `{name}` declared as {expected}")]
    TypeMismatch {
        /// Variable name
        name: String,
        /// Declared type
        expected: DataType,
        /// Runtime type of the rejected value
        found: &'static str,
    },

    /// Call depth limit exceeded
    #[error("call depth {depth} exceeds the limit of {max}")]
    StackOverflow {
        /// Depth reached
        depth: usize,
        /// Configured maximum
        max: usize,
    },
}

impl From<EnvironmentError> for EvalError {
    fn from(err: EnvironmentError) -> Self {
        match err {
            EnvironmentError::UndefinedVariable { name } => {
                EvalError::UndefinedVariable { name, span: None }
            }
            EnvironmentError::DuplicateDeclaration { name } => {
                EvalError::DuplicateDeclaration { name, span: None }
            }
            e @ EnvironmentError::TypeMismatch { .. } => EvalError::TypeError {
                message: e.to_string(),
                span: None,
            },
            EnvironmentError::StackOverflow { depth, max } => EvalError::StackOverflow {
                depth,
                max,
                span: None,
            },
        }
    }
}

/// Errors from procedure admission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Redefinition attempted under the frozen policy
    #[error("`{name}` is already defined and the catalog is frozen")]
    Frozen {
        /// Routine name
        name: String,
    },

    /// Two parameters share a name
    #[error("procedure `{procedure}` declares parameter `{name}` more than once")]
    DuplicateParameter {
        /// Procedure name
        procedure: String,
        /// Parameter name
        name: String,
    },
}

fn procedure_suffix(procedure: &Option<String>) -> String {
    procedure
        .as_ref()
        .map(|p| format!(" in `{p}`"))
        .unwrap_or_default()
}

/// Result type alias for evaluation.
pub type Result<T> = std::result::Result<T, EvalError>;
