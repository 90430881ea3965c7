//! IF / ELSIF / ELSE

use futures::future::{BoxFuture, FutureExt};

use super::{Evaluate, Execute, Signal};
use crate::ast::IfStmt;
use crate::{Environment, EvalContext, EvalError, Value};

impl Execute for IfStmt {
    fn execute<'a>(
        &'a self,
        env: &'a mut Environment,
        ctx: &'a EvalContext,
    ) -> BoxFuture<'a, Result<Signal, EvalError>> {
        async move {
            for branch in &self.branches {
                let cond = branch.cond.eval(env, ctx).await?;
                if condition(&cond, "IF condition")? {
                    return branch.body.execute(env, ctx).await;
                }
            }
            match &self.otherwise {
                Some(block) => block.execute(env, ctx).await,
                None => Ok(Signal::None),
            }
        }
        .boxed()
    }
}

/// Require a BOOLEAN condition. NULL is not a boolean.
pub(crate) fn condition(value: &Value, context: &str) -> Result<bool, EvalError> {
    value
        .as_bool()
        .ok_or_else(|| EvalError::expected("BOOLEAN", value, context))
}
