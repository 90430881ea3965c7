//! Value trait implementations: constructors, predicates, extractors, From traits, PartialEq

use std::sync::Arc;

use super::*;

// ═══════════════════════════════════════════════════════════════════
// Convenience Constructors
// ═══════════════════════════════════════════════════════════════════

impl Value {
    /// Create a string value
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Arc::from(s.as_ref()))
    }

    /// Create an array value
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(items))
    }

    /// Create a record value
    pub fn record(fields: RecordFields) -> Self {
        Value::Record(Arc::new(fields))
    }

    /// Create a record value from `(name, value)` pairs
    pub fn record_from<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::record(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Type Predicates
    // ═══════════════════════════════════════════════════════════════════

    /// Check if value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if value is INT or FLOAT
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Check if value is an array or record
    pub fn is_composite(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Record(_))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Extractors
    // ═══════════════════════════════════════════════════════════════════

    /// Extract a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract an integer (no float truncation)
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Extract a number as `f64`, promoting integers
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Extract a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Extract array elements
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Extract record fields
    pub fn as_record(&self) -> Option<&RecordFields> {
        match self {
            Value::Record(fields) => Some(fields),
            _ => None,
        }
    }

    /// Look up a record field by name.
    ///
    /// Exact matches win; otherwise field names compare case-insensitively,
    /// like identifiers in scripts.
    pub fn get_field(&self, name: &str) -> Option<&Value> {
        let fields = self.as_record()?;
        fields.get(name).or_else(|| {
            fields
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
    }
}

// ═══════════════════════════════════════════════════════════════════
// From Implementations
// ═══════════════════════════════════════════════════════════════════

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

impl From<RecordFields> for Value {
    fn from(fields: RecordFields) -> Self {
        Value::record(fields)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

// ═══════════════════════════════════════════════════════════════════
// PartialEq
// ═══════════════════════════════════════════════════════════════════

/// Structural equality. `Int(1)` and `Float(1.0)` are different values;
/// numeric comparison with promotion is the `=` operator's job.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Record(a), Value::Record(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_field_case_insensitive() {
        let rec = Value::record_from([("Total", Value::Int(3))]);
        assert_eq!(rec.get_field("Total"), Some(&Value::Int(3)));
        assert_eq!(rec.get_field("total"), Some(&Value::Int(3)));
        assert_eq!(rec.get_field("missing"), None);
    }

    #[test]
    fn test_as_f64_promotes() {
        assert_eq!(Value::Int(4).as_f64(), Some(4.0));
        assert_eq!(Value::string("4").as_f64(), None);
    }

    #[test]
    fn test_option_into_value() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::string("a"));
    }

    #[test]
    fn test_int_and_float_are_distinct_values() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
    }
}
