//! Declared types of variables and parameters

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A declared type as written in `DECLARE` statements and parameter lists.
///
/// Type names are case-insensitive and accept the usual SQL aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    /// `INT`, `INTEGER`, `BIGINT`
    Int,
    /// `FLOAT`, `DOUBLE`, `NUMBER`, `DECIMAL`
    Float,
    /// `STRING`, `VARCHAR`, `TEXT`
    String,
    /// `BOOLEAN`, `BOOL`
    Boolean,
    /// `RECORD`
    Record,
    /// `ARRAY`
    Array,
    /// `ANY`: accepts every value
    Any,
}

impl DataType {
    /// Canonical upper-case name.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Int => "INT",
            DataType::Float => "FLOAT",
            DataType::String => "STRING",
            DataType::Boolean => "BOOLEAN",
            DataType::Record => "RECORD",
            DataType::Array => "ARRAY",
            DataType::Any => "ANY",
        }
    }

    /// Convert `value` into a value of this type.
    ///
    /// NULL is accepted by every type and INT widens to FLOAT. Returns the
    /// rejected value when it does not fit.
    pub fn coerce(&self, value: Value) -> Result<Value, Value> {
        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),
            (DataType::Any, v) => Ok(v),
            (DataType::Int, v @ Value::Int(_)) => Ok(v),
            (DataType::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
            (DataType::Float, v @ Value::Float(_)) => Ok(v),
            (DataType::String, v @ Value::String(_)) => Ok(v),
            (DataType::Boolean, v @ Value::Bool(_)) => Ok(v),
            (DataType::Record, v @ Value::Record(_)) => Ok(v),
            (DataType::Array, v @ Value::Array(_)) => Ok(v),
            (_, v) => Err(v),
        }
    }

    /// Whether values declared as `other` can be stored under this type.
    ///
    /// `ANY` on either side is left to the per-value check.
    pub fn stores(&self, other: DataType) -> bool {
        match (self, other) {
            (DataType::Any, _) | (_, DataType::Any) => true,
            (DataType::Float, DataType::Int) => true,
            (a, b) => *a == b,
        }
    }

    /// Whether `value` can be stored under this type.
    pub fn accepts(&self, value: &Value) -> bool {
        self.coerce(value.clone()).is_ok()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for an unknown type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown type `{0}`")]
pub struct UnknownType(pub String);

impl FromStr for DataType {
    type Err = UnknownType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INT" | "INTEGER" | "BIGINT" => Ok(DataType::Int),
            "FLOAT" | "DOUBLE" | "NUMBER" | "DECIMAL" => Ok(DataType::Float),
            "STRING" | "VARCHAR" | "TEXT" => Ok(DataType::String),
            "BOOLEAN" | "BOOL" => Ok(DataType::Boolean),
            "RECORD" => Ok(DataType::Record),
            "ARRAY" => Ok(DataType::Array),
            "ANY" => Ok(DataType::Any),
            _ => Err(UnknownType(s.to_string())),
        }
    }
}

impl TryFrom<String> for DataType {
    type Error = UnknownType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataType> for String {
    fn from(ty: DataType) -> Self {
        ty.name().to_string()
    }
}

/// Case-folded lookup key for identifiers.
///
/// Variable and procedure names are case-insensitive.
pub(crate) fn ident_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases_case_insensitive() {
        assert_eq!("int".parse::<DataType>().unwrap(), DataType::Int);
        assert_eq!("Varchar".parse::<DataType>().unwrap(), DataType::String);
        assert_eq!("NUMBER".parse::<DataType>().unwrap(), DataType::Float);
        assert_eq!("bool".parse::<DataType>().unwrap(), DataType::Boolean);
        assert!("blob".parse::<DataType>().is_err());
    }

    #[test]
    fn test_stores_declared_types() {
        assert!(DataType::Float.stores(DataType::Int));
        assert!(!DataType::Int.stores(DataType::Float));
        assert!(!DataType::Int.stores(DataType::String));
        assert!(DataType::Any.stores(DataType::Record));
        assert!(DataType::Int.stores(DataType::Any));
    }

    #[test]
    fn test_coerce_widens_int_to_float() {
        assert_eq!(DataType::Float.coerce(Value::Int(2)), Ok(Value::Float(2.0)));
        assert_eq!(
            DataType::Int.coerce(Value::Float(2.0)),
            Err(Value::Float(2.0))
        );
    }

    #[test]
    fn test_null_fits_every_type() {
        for ty in [
            DataType::Int,
            DataType::Float,
            DataType::String,
            DataType::Boolean,
            DataType::Record,
            DataType::Array,
            DataType::Any,
        ] {
            assert!(ty.accepts(&Value::Null), "{ty} should accept NULL");
        }
    }

    #[test]
    fn test_serde_uses_names() {
        let ty: DataType = serde_json::from_str("\"integer\"").unwrap();
        assert_eq!(ty, DataType::Int);
        assert_eq!(serde_json::to_string(&DataType::Boolean).unwrap(), "\"BOOLEAN\"");
    }
}
