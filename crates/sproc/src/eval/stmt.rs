//! Statement dispatch, blocks and simple statements

use futures::future::{BoxFuture, FutureExt};
use tracing::trace;

use super::{Evaluate, Execute, Signal};
use crate::ast::{Block, DeclareStmt, EvalStmt, SetStmt, Span, Stmt, StmtKind};
use crate::value::Value;
use crate::{Environment, EvalContext, EvalError};

// ═══════════════════════════════════════════════════════════════════════
// Statement Dispatcher
// ═══════════════════════════════════════════════════════════════════════

impl Execute for Stmt {
    fn execute<'a>(
        &'a self,
        env: &'a mut Environment,
        ctx: &'a EvalContext,
    ) -> BoxFuture<'a, Result<Signal, EvalError>> {
        async move {
            if ctx.is_cancelled() {
                return Err(EvalError::Cancelled);
            }
            if ctx.trace {
                trace!(kind = self.kind.name(), at = ?self.span, "statement");
            }

            let outcome = match &self.kind {
                StmtKind::Block(block) => block.execute(env, ctx).await,
                StmtKind::Declare(stmt) => exec_declare(stmt, self.span, env, ctx).await,
                StmtKind::Set(stmt) => exec_set(stmt, env, ctx).await,
                StmtKind::If(stmt) => stmt.execute(env, ctx).await,
                StmtKind::While(stmt) => stmt.execute(env, ctx).await,
                StmtKind::For(stmt) => stmt.execute(env, ctx).await,
                StmtKind::Execute(stmt) => stmt.execute(env, ctx).await,
                StmtKind::Call(stmt) => stmt.execute(env, ctx).await,
                StmtKind::Return(stmt) => stmt.execute(env, ctx).await,
                StmtKind::Break => Ok(Signal::Break),
                StmtKind::Continue => Ok(Signal::Continue),
                StmtKind::Throw(stmt) => stmt.execute(env, ctx).await,
                StmtKind::Try(stmt) => stmt.execute(env, ctx).await,
                StmtKind::CreateProcedure(def) => ctx
                    .catalog
                    .register(def.clone())
                    .map(|()| Signal::None)
                    .map_err(EvalError::from),
                StmtKind::Eval(stmt) => exec_eval(stmt, env, ctx).await,
            };

            // Catchable failures continue as THROW signals from here on.
            match outcome {
                Ok(Signal::Throw(thrown)) => Ok(Signal::Throw(thrown.at(self.span))),
                Ok(signal) => Ok(signal),
                Err(err) => match err.with_span(self.span).into_thrown() {
                    Ok(thrown) => Ok(Signal::Throw(thrown)),
                    Err(fault) => Err(fault),
                },
            }
        }
        .boxed()
    }
}

/// Execute `stmts` in order in the current scope.
///
/// Stops at the first statement that does not complete normally and hands
/// its signal to the caller.
pub async fn run_stmts(
    stmts: &[Stmt],
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Signal, EvalError> {
    for stmt in stmts {
        let signal = stmt.execute(env, ctx).await?;
        if !signal.is_none() {
            return Ok(signal);
        }
    }
    Ok(Signal::None)
}

impl Execute for Block {
    fn execute<'a>(
        &'a self,
        env: &'a mut Environment,
        ctx: &'a EvalContext,
    ) -> BoxFuture<'a, Result<Signal, EvalError>> {
        async move {
            let mut scope = env.scope_guard();
            run_stmts(&self.stmts, &mut scope, ctx).await
        }
        .boxed()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// DECLARE / SET / expression statements
// ═══════════════════════════════════════════════════════════════════════

async fn exec_declare(
    stmt: &DeclareStmt,
    span: Option<Span>,
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Signal, EvalError> {
    // The initializer sees the enclosing scope, not the new name.
    let value = match &stmt.init {
        Some(init) => init.eval(env, ctx).await?,
        None => Value::Null,
    };
    env.declare_at(stmt.name.as_str(), stmt.ty, value, span)?;
    Ok(Signal::None)
}

async fn exec_set(
    stmt: &SetStmt,
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Signal, EvalError> {
    let value = stmt.value.eval(env, ctx).await?;
    env.assign(&stmt.name, value)?;
    Ok(Signal::None)
}

async fn exec_eval(
    stmt: &EvalStmt,
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Signal, EvalError> {
    stmt.expr.eval(env, ctx).await?;
    Ok(Signal::None)
}
