//! Unary operators

use super::Evaluate;
use crate::ast::Expr;
use crate::ops::UnaryOp;
use crate::{Environment, EvalContext, EvalError, Value};

pub(crate) async fn eval_unary(
    op: UnaryOp,
    operand: &Expr,
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Value, EvalError> {
    let value = operand.eval(env, ctx).await?;
    ctx.operators.dispatch_unary(op, &value)
}
