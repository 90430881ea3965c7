//! # Sproc
//!
//! An execution engine for a procedural stored-procedure language.
//!
//! Sproc walks a parsed script (see [`ast`]) statement by statement. Scripts
//! declare typed variables, branch and loop, call stored procedures and
//! functions, raise and catch errors, and run queries against an
//! asynchronous backend. A backend call suspends the running script without
//! blocking a worker thread and resumes it, with all of its state intact,
//! when the backend completes.
//!
//! ## Architecture
//!
//! - **Values and operators**: dynamically typed [`Value`]s; operators are
//!   routed by operand category through an [`OperatorRegistry`]
//! - **Environment**: lexical scopes of typed bindings, one per execution
//! - **Catalog**: procedures and builtins shared by all executions
//! - **Evaluator**: async tree walk propagating control [`Signal`]s
//! - **Backend**: the [`Backend`] trait and its [`Continuation`]
//!
//! ## Example
//!
//! ```
//! use sproc::ast::{Block, Expr, Stmt};
//! use sproc::{DataType, Engine, Value};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let engine = Engine::builder().build();
//! let mut execution = engine.execution();
//!
//! let script = Block::new(vec![
//!     Stmt::declare_init("name", DataType::String, Expr::lit("world")),
//!     Stmt::ret(Some(Expr::call("upper", vec![Expr::var("name")]))),
//! ]);
//! let outcome = execution.run_script(&script).await.unwrap();
//! assert_eq!(outcome.value, Some(Value::string("WORLD")));
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod context;
pub mod engine;
pub mod environment;
pub mod error;
pub mod eval;
pub mod ops;
pub mod types;
pub mod value;

// Re-export main types
pub use backend::{Backend, BackendError, Continuation, MemoryBackend, QueryDescriptor};
pub use catalog::{
    AsyncBuiltin, Builtin, Catalog, ParamMode, Parameter, ProcedureDef, RedefinePolicy, Routine,
};
pub use config::{ConfigError, EngineConfig};
pub use context::EvalContext;
pub use engine::{CallOutcome, Engine, EngineBuilder, Execution, ScriptOutcome};
pub use environment::{Binding, Environment, ScopeGuard};
pub use error::{CatalogError, EnvironmentError, ErrorKind, EvalError, Result};
pub use eval::{eval_expr, run_stmts, Evaluate, Execute, Signal, Thrown};
pub use ops::{BinaryOp, OperatorRegistry, RegistryError, UnaryOp};
pub use types::DataType;
pub use value::{RecordFields, TypeCategory, Value};

/// Sproc version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
