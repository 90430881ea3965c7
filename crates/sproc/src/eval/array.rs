//! Array and record constructors

use super::Evaluate;
use crate::ast::Expr;
use crate::value::RecordFields;
use crate::{Environment, EvalContext, EvalError, Value};

pub(crate) async fn eval_array(
    items: &[Expr],
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Value, EvalError> {
    let mut values = Vec::with_capacity(items.len());
    for item in items {
        values.push(item.eval(env, ctx).await?);
    }
    Ok(Value::array(values))
}

/// Fields are evaluated in order; a repeated name keeps its first position
/// and the last value.
pub(crate) async fn eval_record(
    fields: &[(String, Expr)],
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Value, EvalError> {
    let mut record = RecordFields::with_capacity(fields.len());
    for (name, expr) in fields {
        let value = expr.eval(env, ctx).await?;
        record.insert(name.clone(), value);
    }
    Ok(Value::record(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::eval_expr;
    use crate::eval::testing::context;
    use crate::ops::BinaryOp;

    #[tokio::test]
    async fn test_record_literal_keeps_order() {
        let ctx = context();
        let mut env = Environment::new();
        let expr = Expr::Record {
            fields: vec![
                ("z".to_string(), Expr::lit(1)),
                (
                    "a".to_string(),
                    Expr::binary(BinaryOp::Add, Expr::lit(1), Expr::lit(1)),
                ),
            ],
        };
        let value = eval_expr(&expr, &mut env, &ctx).await.unwrap();
        let keys: Vec<&str> = value
            .as_record()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["z", "a"]);
        assert_eq!(value.get_field("a"), Some(&Value::Int(2)));
    }

    #[tokio::test]
    async fn test_array_literal() {
        let ctx = context();
        let mut env = Environment::new();
        let expr = Expr::Array {
            items: vec![Expr::lit(1), Expr::lit("two"), Expr::null()],
        };
        assert_eq!(
            eval_expr(&expr, &mut env, &ctx).await.unwrap(),
            Value::array(vec![Value::Int(1), Value::string("two"), Value::Null])
        );
    }
}
