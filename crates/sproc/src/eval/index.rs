//! Element access

use super::Evaluate;
use crate::ast::Expr;
use crate::{Environment, EvalContext, EvalError, Value};

/// `base[index]`: 0-based array elements, or record fields by string key.
///
/// Out-of-range positions and NULL on either side read as NULL.
pub(crate) async fn eval_index(
    base: &Expr,
    index: &Expr,
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Value, EvalError> {
    let container = base.eval(env, ctx).await?;
    let key = index.eval(env, ctx).await?;
    element(&container, &key)
}

fn element(container: &Value, key: &Value) -> Result<Value, EvalError> {
    match (container, key) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Array(items), Value::Int(i)) => Ok(usize::try_from(*i)
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or(Value::Null)),
        (Value::Record(_), Value::String(name)) => {
            Ok(container.get_field(name).cloned().unwrap_or(Value::Null))
        }
        (Value::Array(_), other) => Err(EvalError::expected("INT", other, "array index")),
        (Value::Record(_), other) => Err(EvalError::expected("STRING", other, "record key")),
        (other, _) => Err(EvalError::expected("ARRAY or RECORD", other, "index expression")),
    }
}
