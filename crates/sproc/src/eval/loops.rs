//! WHILE and FOR loops

use futures::future::{BoxFuture, FutureExt};

use super::if_stmt::condition;
use super::{Evaluate, Execute, Signal};
use crate::ast::{Block, ForIter, ForStmt, WhileStmt};
use crate::types::DataType;
use crate::{Environment, EvalContext, EvalError, Value};

/// What a loop does after one pass over its body.
enum Step {
    Next,
    Exit,
    Propagate(Signal),
}

impl From<Signal> for Step {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::None | Signal::Continue => Step::Next,
            Signal::Break => Step::Exit,
            other => Step::Propagate(other),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// WHILE
// ═══════════════════════════════════════════════════════════════════════

impl Execute for WhileStmt {
    fn execute<'a>(
        &'a self,
        env: &'a mut Environment,
        ctx: &'a EvalContext,
    ) -> BoxFuture<'a, Result<Signal, EvalError>> {
        async move {
            loop {
                if ctx.is_cancelled() {
                    return Err(EvalError::Cancelled);
                }

                let cond = self.cond.eval(env, ctx).await?;
                if !condition(&cond, "WHILE condition")? {
                    return Ok(Signal::None);
                }

                // The body block opens a fresh frame on every pass.
                match Step::from(self.body.execute(env, ctx).await?) {
                    Step::Next => {}
                    Step::Exit => return Ok(Signal::None),
                    Step::Propagate(signal) => return Ok(signal),
                }
            }
        }
        .boxed()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// FOR
// ═══════════════════════════════════════════════════════════════════════

impl Execute for ForStmt {
    fn execute<'a>(
        &'a self,
        env: &'a mut Environment,
        ctx: &'a EvalContext,
    ) -> BoxFuture<'a, Result<Signal, EvalError>> {
        async move {
            match &self.iter {
                ForIter::Range {
                    start,
                    end,
                    reverse,
                } => {
                    // Bounds are evaluated once, before the first pass.
                    let lo = bound(start.eval(env, ctx).await?, "FOR range start")?;
                    let hi = bound(end.eval(env, ctx).await?, "FOR range end")?;
                    let steps: Box<dyn Iterator<Item = i64> + Send> = if *reverse {
                        Box::new((lo..=hi).rev())
                    } else {
                        Box::new(lo..=hi)
                    };

                    for i in steps {
                        let signal =
                            iteration(&self.var, DataType::Int, Value::Int(i), &self.body, env, ctx)
                                .await?;
                        match Step::from(signal) {
                            Step::Next => {}
                            Step::Exit => break,
                            Step::Propagate(signal) => return Ok(signal),
                        }
                    }
                }
                ForIter::Each { source } => {
                    let items = match source.eval(env, ctx).await? {
                        Value::Array(items) => items,
                        Value::Null => return Ok(Signal::None),
                        other => return Err(EvalError::expected("ARRAY", &other, "FOR source")),
                    };

                    for item in items.iter() {
                        let signal =
                            iteration(&self.var, DataType::Any, item.clone(), &self.body, env, ctx)
                                .await?;
                        match Step::from(signal) {
                            Step::Next => {}
                            Step::Exit => break,
                            Step::Propagate(signal) => return Ok(signal),
                        }
                    }
                }
            }
            Ok(Signal::None)
        }
        .boxed()
    }
}

fn bound(value: Value, context: &str) -> Result<i64, EvalError> {
    value
        .as_int()
        .ok_or_else(|| EvalError::expected("INT", &value, context))
}

/// One pass: the loop variable lives in its own frame around the body.
async fn iteration(
    var: &str,
    ty: DataType,
    item: Value,
    body: &Block,
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Signal, EvalError> {
    if ctx.is_cancelled() {
        return Err(EvalError::Cancelled);
    }
    let mut scope = env.scope_guard();
    scope.declare(var, ty, item)?;
    body.execute(&mut scope, ctx).await
}
