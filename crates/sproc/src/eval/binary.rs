//! Binary operators

use super::Evaluate;
use crate::ast::Expr;
use crate::ops::BinaryOp;
use crate::{Environment, EvalContext, EvalError, Value};

/// Evaluate `left op right`.
///
/// Operands are evaluated left to right. `AND` and `OR` skip the right
/// operand when the left one already decides the result; everything else
/// goes through the operator registry.
pub(crate) async fn eval_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Value, EvalError> {
    let lhs = left.eval(env, ctx).await?;

    match (op, &lhs) {
        (BinaryOp::And, Value::Bool(false)) => return Ok(Value::Bool(false)),
        (BinaryOp::Or, Value::Bool(true)) => return Ok(Value::Bool(true)),
        _ => {}
    }

    let rhs = right.eval(env, ctx).await?;
    ctx.operators.dispatch(op, &lhs, &rhs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::eval_expr;
    use crate::eval::testing::context;

    #[tokio::test]
    async fn test_and_short_circuits() {
        let ctx = context();
        let mut env = Environment::new();
        // The right side would fail with UndefinedVariable if evaluated.
        let expr = Expr::binary(BinaryOp::And, Expr::lit(false), Expr::var("missing"));
        assert_eq!(eval_expr(&expr, &mut env, &ctx).await.unwrap(), Value::Bool(false));

        let expr = Expr::binary(BinaryOp::Or, Expr::lit(true), Expr::var("missing"));
        assert_eq!(eval_expr(&expr, &mut env, &ctx).await.unwrap(), Value::Bool(true));
    }

    #[tokio::test]
    async fn test_no_handler_is_type_mismatch() {
        let ctx = context();
        let mut env = Environment::new();
        let expr = Expr::binary(BinaryOp::Add, Expr::lit(true), Expr::lit(1));
        let err = eval_expr(&expr, &mut env, &ctx).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "type mismatch: operator `+` is not defined for BOOLEAN and INT"
        );
    }

    #[tokio::test]
    async fn test_mixed_numeric_promotes() {
        let ctx = context();
        let mut env = Environment::new();
        let expr = Expr::binary(BinaryOp::Add, Expr::lit(1), Expr::lit(0.5));
        assert_eq!(eval_expr(&expr, &mut env, &ctx).await.unwrap(), Value::Float(1.5));
    }
}
