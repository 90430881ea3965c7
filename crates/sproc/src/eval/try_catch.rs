//! THROW and TRY / CATCH

use futures::future::{BoxFuture, FutureExt};

use super::if_stmt::condition;
use super::{Evaluate, Execute, Signal, Thrown};
use crate::ast::{ThrowStmt, TryStmt};
use crate::types::DataType;
use crate::{Environment, EvalContext, EvalError};

impl Execute for ThrowStmt {
    fn execute<'a>(
        &'a self,
        env: &'a mut Environment,
        ctx: &'a EvalContext,
    ) -> BoxFuture<'a, Result<Signal, EvalError>> {
        async move {
            let payload = self.value.eval(env, ctx).await?;
            Ok(Signal::Throw(Thrown::new(payload)))
        }
        .boxed()
    }
}

impl Execute for TryStmt {
    fn execute<'a>(
        &'a self,
        env: &'a mut Environment,
        ctx: &'a EvalContext,
    ) -> BoxFuture<'a, Result<Signal, EvalError>> {
        async move {
            let thrown = match self.body.execute(env, ctx).await? {
                Signal::Throw(thrown) => thrown,
                other => return Ok(other),
            };

            for clause in &self.catches {
                let mut scope = env.scope_guard();
                scope.declare(clause.var.as_str(), DataType::Any, thrown.payload.clone())?;

                if let Some(guard) = &clause.when {
                    let matched = guard.eval(&mut scope, ctx).await?;
                    if !condition(&matched, "CATCH WHEN guard")? {
                        continue;
                    }
                }

                // Whatever the handler signals, including a rethrow, is ours.
                return clause.body.execute(&mut scope, ctx).await;
            }

            Ok(Signal::Throw(thrown))
        }
        .boxed()
    }
}
