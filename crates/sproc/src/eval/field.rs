//! Record field access

use super::Evaluate;
use crate::ast::Expr;
use crate::{Environment, EvalContext, EvalError, Value};

/// `base.field`. A missing field, or a NULL base, reads as NULL.
pub(crate) async fn eval_field(
    base: &Expr,
    field: &str,
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Value, EvalError> {
    let record = base.eval(env, ctx).await?;
    match &record {
        Value::Null => Ok(Value::Null),
        Value::Record(_) => Ok(record.get_field(field).cloned().unwrap_or(Value::Null)),
        other => Err(EvalError::expected(
            "RECORD",
            other,
            &format!("access to field `{field}`"),
        )),
    }
}
