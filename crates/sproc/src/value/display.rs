//! Display and Debug implementations for Value

use std::fmt;

use super::*;

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Float(n) => write!(f, "Float({n:?})"),
            Value::String(s) => write!(f, "String({:?})", s.as_ref()),
            Value::Array(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Record(fields) => f.debug_map().entries(fields.iter()).finish(),
        }
    }
}

/// Renders values the way scripts write them. Top-level strings are shown
/// bare; strings nested in arrays and records are quoted.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            other => write_nested(f, other),
        }
    }
}

fn write_nested(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Null => write!(f, "NULL"),
        Value::Bool(true) => write!(f, "TRUE"),
        Value::Bool(false) => write!(f, "FALSE"),
        Value::Int(n) => write!(f, "{n}"),
        Value::Float(n) => {
            if n.is_finite() && n.fract() == 0.0 {
                write!(f, "{n:.1}")
            } else {
                write!(f, "{n}")
            }
        }
        Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        Value::Array(items) => {
            write!(f, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_nested(f, item)?;
            }
            write!(f, "]")
        }
        Value::Record(fields) => {
            write!(f, "{{")?;
            for (i, (name, item)) in fields.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{name}: ")?;
                write_nested(f, item)?;
            }
            write!(f, "}}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_scalars() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Bool(true).to_string(), "TRUE");
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::string("it's").to_string(), "it's");
    }

    #[test]
    fn test_display_nested_quotes_strings() {
        let v = Value::record_from([
            ("name", Value::string("o'neil")),
            ("tags", Value::array(vec![Value::string("a"), Value::Int(1)])),
        ]);
        assert_eq!(v.to_string(), "{name: 'o''neil', tags: ['a', 1]}");
    }
}
