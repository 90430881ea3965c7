//! String concatenation

use crate::error::EvalError;
use crate::value::{TypeCategory, Value};

use super::{CategoryPair, OperatorHandler};

/// `||` with at least one string operand.
///
/// The other side may be any scalar; numbers and booleans are rendered the
/// way `Display` shows them and NULL concatenates as the empty string.
#[derive(Debug, Clone)]
pub struct StringConcat {
    pairs: Vec<CategoryPair>,
}

impl StringConcat {
    /// The standard concatenation handler.
    pub fn new() -> Self {
        use TypeCategory::{Boolean, Null, Numeric, String};
        let mut pairs = vec![(String, String)];
        for other in [Null, Boolean, Numeric] {
            pairs.push((String, other));
            pairs.push((other, String));
        }
        Self { pairs }
    }
}

impl Default for StringConcat {
    fn default() -> Self {
        Self::new()
    }
}

fn fragment(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl OperatorHandler for StringConcat {
    fn name(&self) -> &str {
        "string-concat"
    }

    fn operands(&self) -> &[CategoryPair] {
        &self.pairs
    }

    fn apply(&self, left: &Value, right: &Value) -> Result<Value, EvalError> {
        Ok(Value::from(fragment(left) + &fragment(right)))
    }
}
