//! EXECUTE: backend queries from statements

use futures::future::{BoxFuture, FutureExt};
use tracing::debug;

use super::{Evaluate, Execute, Signal};
use crate::ast::ExecuteStmt;
use crate::backend::QueryDescriptor;
use crate::{Environment, EvalContext, EvalError, Value};

impl Execute for ExecuteStmt {
    fn execute<'a>(
        &'a self,
        env: &'a mut Environment,
        ctx: &'a EvalContext,
    ) -> BoxFuture<'a, Result<Signal, EvalError>> {
        async move {
            let query = self.query.eval(env, ctx).await?;
            let Value::String(statement) = &query else {
                return Err(EvalError::expected("STRING", &query, "EXECUTE"));
            };

            let mut params = Vec::with_capacity(self.params.len());
            for param in &self.params {
                params.push(param.eval(env, ctx).await?);
            }

            // Fail before the query leaves the engine, not after.
            if let Some(target) = &self.into {
                if !env.contains(target) {
                    return Err(EvalError::UndefinedVariable {
                        name: target.clone(),
                        span: None,
                    });
                }
            }

            let query = QueryDescriptor::new(statement.to_string()).with_params(params);
            debug!(statement = %query.statement, "suspending on backend query");
            let result = ctx
                .suspend(|k| {
                    ctx.backend.submit(query, k);
                    Ok(())
                })
                .await?;

            if let Some(target) = &self.into {
                env.assign(target, result)?;
            }
            Ok(Signal::None)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ast::{Expr, Stmt};
    use crate::backend::{BackendError, MemoryBackend};
    use crate::catalog::Catalog;
    use crate::eval::run_stmts;
    use crate::DataType;

    #[tokio::test]
    async fn test_result_bound_into_variable() {
        let backend = Arc::new(MemoryBackend::new());
        backend.respond("SELECT count(*) FROM orders", Value::Int(12));
        let ctx = EvalContext::new(Arc::new(Catalog::new()), backend.clone());

        let mut env = Environment::new();
        let stmts = vec![
            Stmt::declare("n", DataType::Int),
            Stmt::execute(Expr::lit("SELECT count(*) FROM orders"), Some("n")),
        ];
        run_stmts(&stmts, &mut env, &ctx).await.unwrap().escape().unwrap();
        assert_eq!(env.get("n"), Some(&Value::Int(12)));
        assert_eq!(backend.submitted().len(), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_is_throw() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail("broken", BackendError::new("shard unavailable"));
        let ctx = EvalContext::new(Arc::new(Catalog::new()), backend);

        let mut env = Environment::new();
        let stmts = vec![Stmt::execute(Expr::lit("broken"), None)];
        match run_stmts(&stmts, &mut env, &ctx).await.unwrap() {
            Signal::Throw(thrown) => assert_eq!(
                thrown.payload.get_field("kind"),
                Some(&Value::string("BackendFailure"))
            ),
            other => panic!("expected Throw, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_into_undeclared_fails_before_submit() {
        let backend = Arc::new(MemoryBackend::new());
        let ctx = EvalContext::new(Arc::new(Catalog::new()), backend.clone());

        let mut env = Environment::new();
        let stmts = vec![Stmt::execute(Expr::lit("SELECT 1"), Some("ghost"))];
        let err = run_stmts(&stmts, &mut env, &ctx).await.unwrap_err();
        assert!(matches!(err, EvalError::UndefinedVariable { .. }));
        assert!(backend.submitted().is_empty());
    }
}
