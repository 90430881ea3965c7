//! Host surface: engines and executions
//!
//! An [`Engine`] owns everything shared between script runs: the catalog,
//! the operator registry, the backend and the configuration. Each
//! [`Execution`] layers a private [`Environment`] and cancellation token on
//! top, so concurrent executions only ever meet in the catalog.

use std::sync::Arc;

use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;
use tracing::{info_span, warn, Instrument};

use crate::ast::{Block, Expr};
use crate::backend::{Backend, MemoryBackend};
use crate::catalog::{stdlib, Builtin, Catalog, ProcedureDef, Routine};
use crate::config::EngineConfig;
use crate::context::EvalContext;
use crate::environment::Environment;
use crate::error::{CatalogError, Result};
use crate::eval::call::{call_routine, ArgRef};
use crate::eval::run_stmts;
use crate::ops::OperatorRegistry;
use crate::types::DataType;
use crate::value::Value;

/// Result of a completed script run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptOutcome {
    /// Value of a top-level RETURN, if the script returned one
    pub value: Option<Value>,

    /// Top-level variables after the run, in declaration order
    pub variables: IndexMap<String, Value>,
}

/// Result of a direct procedure call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    /// Return value; `Null` for procedures without a return type
    pub value: Value,

    /// Final OUT and INOUT values keyed by parameter name
    pub out: IndexMap<String, Value>,
}

// ═══════════════════════════════════════════════════════════════════════
// Engine
// ═══════════════════════════════════════════════════════════════════════

/// Shared state for running scripts against one backend.
#[derive(Clone)]
pub struct Engine {
    catalog: Arc<Catalog>,
    operators: Arc<OperatorRegistry>,
    backend: Arc<dyn Backend>,
    config: EngineConfig,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("catalog", &self.catalog)
            .field("operators", &self.operators)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Start configuring an engine.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Engine with default configuration over `backend`.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::builder().backend(backend).build()
    }

    /// Add or replace a procedure.
    pub fn register(&self, def: ProcedureDef) -> std::result::Result<(), CatalogError> {
        self.catalog.register(def)
    }

    /// Add or replace a builtin.
    pub fn register_builtin(&self, builtin: Builtin) -> std::result::Result<(), CatalogError> {
        self.catalog.register_builtin(builtin)
    }

    /// Find a routine by name.
    pub fn lookup(&self, name: &str) -> Result<Routine> {
        self.catalog.lookup(name)
    }

    /// Remove a routine. Returns whether it existed.
    pub fn drop_procedure(&self, name: &str) -> bool {
        self.catalog.drop_routine(name)
    }

    /// The shared catalog.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// The configuration this engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A new execution with its own variables and cancellation token.
    pub fn execution(&self) -> Execution {
        let ctx = EvalContext::new(self.catalog.clone(), self.backend.clone())
            .with_operators(self.operators.clone())
            .with_trace(self.config.trace);
        Execution {
            ctx,
            env: Environment::with_max_call_depth(self.config.max_call_depth),
        }
    }
}

/// Builder for [`Engine`].
#[derive(Default)]
pub struct EngineBuilder {
    backend: Option<Arc<dyn Backend>>,
    config: EngineConfig,
    operators: Option<OperatorRegistry>,
}

impl EngineBuilder {
    /// Backend for EXECUTE and async builtins. Defaults to an empty
    /// [`MemoryBackend`].
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Engine settings.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Operator handlers. Defaults to [`OperatorRegistry::standard`].
    pub fn operators(mut self, operators: OperatorRegistry) -> Self {
        self.operators = Some(operators);
        self
    }

    /// Build the engine and install the standard builtins.
    pub fn build(self) -> Engine {
        let catalog = Catalog::with_policy(self.config.redefinition);
        stdlib::install(&catalog);
        Engine {
            catalog: Arc::new(catalog),
            operators: Arc::new(self.operators.unwrap_or_else(OperatorRegistry::standard)),
            backend: self
                .backend
                .unwrap_or_else(|| Arc::new(MemoryBackend::new())),
            config: self.config,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Execution
// ═══════════════════════════════════════════════════════════════════════

/// One logical thread of control.
///
/// Top-level variables persist across `run_script` calls on the same
/// execution. Cancelling stops the execution at its next statement or
/// pending backend call; use [`cancellation_token`](Self::cancellation_token)
/// to cancel from another task while a run is in flight.
#[derive(Debug)]
pub struct Execution {
    ctx: EvalContext,
    env: Environment,
}

impl Execution {
    /// Run a script at top level.
    ///
    /// A top-level RETURN ends the script with its value. BREAK or
    /// CONTINUE outside a loop, an uncaught THROW and every engine fault
    /// come back as errors.
    pub async fn run_script(&mut self, script: &Block) -> Result<ScriptOutcome> {
        let span = info_span!("run_script", statements = script.stmts.len());
        let outcome = run_stmts(&script.stmts, &mut self.env, &self.ctx)
            .instrument(span)
            .await
            .and_then(|signal| signal.escape());
        match outcome {
            Ok(value) => Ok(ScriptOutcome {
                value,
                variables: self.env.snapshot(),
            }),
            Err(error) => {
                warn!(kind = %error.kind(), %error, "script failed");
                Err(error)
            }
        }
    }

    /// Call a procedure or builtin with positional arguments.
    ///
    /// OUT parameters take their slot in `args` as a placeholder; the value
    /// passed there is ignored.
    pub async fn invoke(&mut self, name: &str, args: Vec<Value>) -> Result<CallOutcome> {
        let routine = self.ctx.catalog.lookup(name)?;
        let mut scope = self.env.scope_guard();

        let names: Vec<String> = (0..args.len()).map(|i| format!("$arg{i}")).collect();
        for (slot, value) in names.iter().zip(args) {
            scope.declare(slot.as_str(), DataType::Any, value)?;
        }
        let exprs: Vec<Expr> = names.iter().map(Expr::var).collect();
        let refs: Vec<ArgRef<'_>> = exprs.iter().map(ArgRef::positional).collect();

        let value = call_routine(routine.clone(), &refs, &mut scope, &self.ctx).await?;

        let mut out = IndexMap::new();
        if let Routine::Procedure(def) = &routine {
            for (param, slot) in def.params.iter().zip(&names) {
                if param.mode.writes_back() {
                    out.insert(param.name.clone(), scope.resolve(slot)?);
                }
            }
        }
        Ok(CallOutcome { value, out })
    }

    /// Top-level variables of this execution.
    pub fn variables(&self) -> IndexMap<String, Value> {
        self.env.snapshot()
    }

    /// Stop this execution.
    pub fn cancel(&self) {
        self.ctx.cancel();
    }

    /// Token that cancels this execution when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.ctx.cancel.clone()
    }

    /// Whether this execution has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.ctx.is_cancelled()
    }
}
