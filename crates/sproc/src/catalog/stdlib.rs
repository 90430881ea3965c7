//! Builtins available to every script

use crate::backend::{Backend, Continuation, QueryDescriptor};
use crate::value::Value;

use super::{AsyncBuiltin, Builtin, Catalog};

/// Install the standard builtins into `catalog`.
pub fn install(catalog: &Catalog) {
    catalog.install_builtin(Builtin::sync("length", 1..=1, length));
    catalog.install_builtin(Builtin::sync("upper", 1..=1, |args| {
        map_string(&args[0], "upper", str::to_uppercase)
    }));
    catalog.install_builtin(Builtin::sync("lower", 1..=1, |args| {
        map_string(&args[0], "lower", str::to_lowercase)
    }));
    catalog.install_builtin(Builtin::sync("abs", 1..=1, abs));
    catalog.install_builtin(Builtin::sync("coalesce", 1..=usize::MAX, |args| {
        Ok(args
            .iter()
            .find(|v| !v.is_null())
            .cloned()
            .unwrap_or(Value::Null))
    }));
    catalog.install_builtin(Builtin::sync("to_string", 1..=1, |args| {
        Ok(match &args[0] {
            Value::Null => Value::Null,
            other => Value::string(other.to_string()),
        })
    }));
    catalog.install_builtin(Builtin::sync("keys", 1..=1, keys));
    catalog.install_builtin(Builtin::asynchronous("search", 1..=2, Search));
}

fn length(args: &[Value]) -> Result<Value, String> {
    let n = match &args[0] {
        Value::Null => return Ok(Value::Null),
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Record(fields) => fields.len(),
        other => return Err(format!("length is not defined for {}", other.type_name())),
    };
    i64::try_from(n)
        .map(Value::Int)
        .map_err(|_| "length does not fit in INT".to_string())
}

fn map_string(value: &Value, name: &str, f: fn(&str) -> String) -> Result<Value, String> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::String(s) => Ok(Value::from(f(s))),
        other => Err(format!("{name} expects STRING, got {}", other.type_name())),
    }
}

fn abs(args: &[Value]) -> Result<Value, String> {
    match &args[0] {
        Value::Null => Ok(Value::Null),
        Value::Int(i) => i
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| format!("abs({i}) overflows INT")),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(format!("abs expects a number, got {}", other.type_name())),
    }
}

fn keys(args: &[Value]) -> Result<Value, String> {
    match &args[0] {
        Value::Null => Ok(Value::Null),
        Value::Record(fields) => Ok(Value::array(
            fields.keys().map(|k| Value::string(k)).collect(),
        )),
        other => Err(format!("keys expects RECORD, got {}", other.type_name())),
    }
}

/// `search(query [, params])`: run a backend query from an expression.
struct Search;

impl AsyncBuiltin for Search {
    fn apply(
        &self,
        mut args: Vec<Value>,
        backend: &dyn Backend,
        done: Continuation,
    ) -> Result<(), String> {
        let params = match args.len() {
            2 => match args.pop() {
                Some(Value::Array(items)) => items.as_ref().clone(),
                Some(Value::Null) | None => Vec::new(),
                Some(other) => {
                    return Err(format!("search params must be ARRAY, got {}", other.type_name()))
                }
            },
            _ => Vec::new(),
        };
        let statement = match args.first() {
            Some(Value::String(s)) => s.to_string(),
            Some(other) => {
                return Err(format!("search query must be STRING, got {}", other.type_name()))
            }
            None => return Err("search needs a query".to_string()),
        };
        backend.submit(QueryDescriptor::new(statement).with_params(params), done);
        Ok(())
    }
}
