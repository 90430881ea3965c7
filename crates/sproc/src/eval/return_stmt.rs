//! RETURN

use futures::future::{BoxFuture, FutureExt};

use super::{Evaluate, Execute, Signal};
use crate::ast::ReturnStmt;
use crate::{Environment, EvalContext, EvalError};

impl Execute for ReturnStmt {
    fn execute<'a>(
        &'a self,
        env: &'a mut Environment,
        ctx: &'a EvalContext,
    ) -> BoxFuture<'a, Result<Signal, EvalError>> {
        async move {
            let value = match &self.value {
                Some(expr) => Some(expr.eval(env, ctx).await?),
                None => None,
            };
            Ok(Signal::Return(value))
        }
        .boxed()
    }
}
