//! Statement and expression evaluation
//!
//! Evaluation is a tree walk over [`Stmt`] and [`Expr`]. Every node returns
//! a boxed future so any expression can suspend on the backend without
//! blocking a worker; the [`Environment`] is borrowed mutably for the whole
//! walk, which is what keeps one execution single-threaded.

pub mod array;
pub mod binary;
pub mod call;
pub mod control;
pub mod execute;
pub mod field;
pub mod if_stmt;
pub mod index;
pub mod loops;
pub mod return_stmt;
pub mod stmt;
pub mod try_catch;
pub mod unary;

pub use control::{Signal, Thrown};
pub use stmt::run_stmts;

use futures::future::{BoxFuture, FutureExt};

use crate::ast::Expr;
use crate::{Environment, EvalContext, EvalError, Value};

/// Evaluate an expression node to a value.
pub trait Evaluate {
    /// Evaluate this node in `env`.
    fn eval<'a>(
        &'a self,
        env: &'a mut Environment,
        ctx: &'a EvalContext,
    ) -> BoxFuture<'a, Result<Value, EvalError>>;
}

/// Execute a statement node for its effects.
pub trait Execute {
    /// Execute this node in `env`, reporting how control leaves it.
    fn execute<'a>(
        &'a self,
        env: &'a mut Environment,
        ctx: &'a EvalContext,
    ) -> BoxFuture<'a, Result<Signal, EvalError>>;
}

// ═══════════════════════════════════════════════════════════════════════
// Main Expression Dispatcher
// ═══════════════════════════════════════════════════════════════════════

impl Evaluate for Expr {
    fn eval<'a>(
        &'a self,
        env: &'a mut Environment,
        ctx: &'a EvalContext,
    ) -> BoxFuture<'a, Result<Value, EvalError>> {
        async move {
            if ctx.is_cancelled() {
                return Err(EvalError::Cancelled);
            }

            match self {
                Expr::Literal { value } => Ok(value.clone()),
                Expr::Var { name } => Ok(env.resolve(name)?),
                Expr::Binary { op, left, right } => {
                    binary::eval_binary(*op, left, right, env, ctx).await
                }
                Expr::Unary { op, operand } => unary::eval_unary(*op, operand, env, ctx).await,
                Expr::Call { name, args } => call::eval_call(name, args, env, ctx).await,
                Expr::Field { base, field } => field::eval_field(base, field, env, ctx).await,
                Expr::Index { base, index } => index::eval_index(base, index, env, ctx).await,
                Expr::Array { items } => array::eval_array(items, env, ctx).await,
                Expr::Record { fields } => array::eval_record(fields, env, ctx).await,
            }
        }
        .boxed()
    }
}

/// Evaluate `expr` in `env`.
pub async fn eval_expr(
    expr: &Expr,
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Value, EvalError> {
    expr.eval(env, ctx).await
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for evaluator unit tests.

    use std::sync::Arc;

    use crate::backend::MemoryBackend;
    use crate::catalog::{stdlib, Catalog};
    use crate::EvalContext;

    pub fn context() -> EvalContext {
        let catalog = Catalog::new();
        stdlib::install(&catalog);
        EvalContext::new(Arc::new(catalog), Arc::new(MemoryBackend::new()))
    }
}
