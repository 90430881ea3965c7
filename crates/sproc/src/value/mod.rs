//! Runtime values
//!
//! A closed tagged union over everything a script can hold. Values are
//! immutable once produced: composite variants are `Arc`-shared and every
//! operation builds a new value.

mod display;
mod impls;
mod json;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

/// Field map of a record value, in insertion order.
pub type RecordFields = IndexMap<String, Value>;

/// Runtime value of the scripting language.
#[derive(Clone)]
pub enum Value {
    /// SQL `NULL`
    Null,

    /// `TRUE` / `FALSE`
    Bool(bool),

    /// 64-bit signed integer
    Int(i64),

    /// 64-bit floating point
    Float(f64),

    /// Text
    String(Arc<str>),

    /// Ordered list, e.g. the rows of a backend result
    Array(Arc<Vec<Value>>),

    /// Named fields, e.g. one backend document
    Record(Arc<RecordFields>),
}

/// Coarse type category used to route operator dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeCategory {
    /// `NULL`
    Null,
    /// `BOOLEAN`
    Boolean,
    /// `INT` and `FLOAT`
    Numeric,
    /// `STRING`
    String,
    /// `ARRAY` and `RECORD`
    Composite,
}

impl TypeCategory {
    /// Every category, in declaration order.
    pub const ALL: [TypeCategory; 5] = [
        TypeCategory::Null,
        TypeCategory::Boolean,
        TypeCategory::Numeric,
        TypeCategory::String,
        TypeCategory::Composite,
    ];
}

impl fmt::Display for TypeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeCategory::Null => "null",
            TypeCategory::Boolean => "boolean",
            TypeCategory::Numeric => "numeric",
            TypeCategory::String => "string",
            TypeCategory::Composite => "composite",
        };
        f.write_str(name)
    }
}

impl Value {
    /// Name of the value's runtime type, as shown in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "INT",
            Value::Float(_) => "FLOAT",
            Value::String(_) => "STRING",
            Value::Array(_) => "ARRAY",
            Value::Record(_) => "RECORD",
        }
    }

    /// Coarse category for operator routing.
    pub fn category(&self) -> TypeCategory {
        match self {
            Value::Null => TypeCategory::Null,
            Value::Bool(_) => TypeCategory::Boolean,
            Value::Int(_) | Value::Float(_) => TypeCategory::Numeric,
            Value::String(_) => TypeCategory::String,
            Value::Array(_) | Value::Record(_) => TypeCategory::Composite,
        }
    }
}
