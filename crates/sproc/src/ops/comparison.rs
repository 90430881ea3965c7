//! Comparison and null-test handlers

use std::cmp::Ordering;

use crate::error::EvalError;
use crate::value::{TypeCategory, Value};

use super::{pairs_touching, BinaryOp, CategoryPair, OperatorHandler, UnaryHandler};

/// Comparison operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    /// The operator symbol this comparison is registered under.
    pub fn binary(&self) -> BinaryOp {
        match self {
            CompareOp::Eq => BinaryOp::Eq,
            CompareOp::Ne => BinaryOp::Ne,
            CompareOp::Lt => BinaryOp::Lt,
            CompareOp::Le => BinaryOp::Le,
            CompareOp::Gt => BinaryOp::Gt,
            CompareOp::Ge => BinaryOp::Ge,
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
        }
    }

    /// Whether the comparison holds for `ordering`. Unordered operands
    /// (NaN) only satisfy `<>`.
    fn holds(&self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (CompareOp::Ne, None) => true,
            (_, None) => false,
            (CompareOp::Eq, Some(o)) => o == Ordering::Equal,
            (CompareOp::Ne, Some(o)) => o != Ordering::Equal,
            (CompareOp::Lt, Some(o)) => o == Ordering::Less,
            (CompareOp::Le, Some(o)) => o != Ordering::Greater,
            (CompareOp::Gt, Some(o)) => o == Ordering::Greater,
            (CompareOp::Ge, Some(o)) => o != Ordering::Less,
        }
    }
}

fn mismatch(op: CompareOp, left: &Value, right: &Value) -> EvalError {
    EvalError::TypeMismatch {
        symbol: op.binary().symbol().to_string(),
        left_type: left.type_name().to_string(),
        right_type: Some(right.type_name().to_string()),
        span: None,
    }
}

macro_rules! comparison_handler {
    ($(#[$doc:meta])* $name:ident, $prefix:literal, $category:expr, $compare:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            op: CompareOp,
            name: String,
            pairs: [CategoryPair; 1],
        }

        impl $name {
            /// Handler for `op`.
            pub fn new(op: CompareOp) -> Self {
                Self {
                    op,
                    name: format!("{}-{}", $prefix, op.suffix()),
                    pairs: [($category, $category)],
                }
            }
        }

        impl OperatorHandler for $name {
            fn name(&self) -> &str {
                &self.name
            }

            fn operands(&self) -> &[CategoryPair] {
                &self.pairs
            }

            fn apply(&self, left: &Value, right: &Value) -> Result<Value, EvalError> {
                let compare: fn(&Value, &Value) -> Option<Option<Ordering>> = $compare;
                match compare(left, right) {
                    Some(ordering) => Ok(Value::Bool(self.op.holds(ordering))),
                    None => Err(mismatch(self.op, left, right)),
                }
            }
        }
    };
}

comparison_handler!(
    /// Numeric comparison with Int/Float promotion.
    NumericComparison,
    "numeric",
    TypeCategory::Numeric,
    |l, r| match (l, r) {
        (Value::Int(a), Value::Int(b)) => Some(Some(a.cmp(b))),
        _ => Some(l.as_f64()?.partial_cmp(&r.as_f64()?)),
    }
);

comparison_handler!(
    /// Lexicographic string comparison.
    StringComparison,
    "string",
    TypeCategory::String,
    |l, r| Some(Some(l.as_str()?.cmp(r.as_str()?)))
);

comparison_handler!(
    /// Boolean comparison, `FALSE < TRUE`.
    BooleanComparison,
    "boolean",
    TypeCategory::Boolean,
    |l, r| Some(Some(l.as_bool()?.cmp(&r.as_bool()?)))
);

/// `=` / `<>` when either side is NULL: NULL equals only NULL.
#[derive(Debug, Clone)]
pub struct NullEquality {
    op: CompareOp,
    name: String,
    pairs: Vec<CategoryPair>,
}

impl NullEquality {
    /// Handler for `op`; only `Eq` and `Ne` are meaningful.
    pub fn new(op: CompareOp) -> Self {
        Self {
            op,
            name: format!("null-{}", op.suffix()),
            pairs: pairs_touching(TypeCategory::Null),
        }
    }
}

impl OperatorHandler for NullEquality {
    fn name(&self) -> &str {
        &self.name
    }

    fn operands(&self) -> &[CategoryPair] {
        &self.pairs
    }

    fn apply(&self, left: &Value, right: &Value) -> Result<Value, EvalError> {
        let both_null = left.is_null() && right.is_null();
        match self.op {
            CompareOp::Eq => Ok(Value::Bool(both_null)),
            CompareOp::Ne => Ok(Value::Bool(!both_null)),
            op => Err(mismatch(op, left, right)),
        }
    }
}

/// Structural `=` / `<>` on arrays and records.
#[derive(Debug, Clone)]
pub struct CompositeEquality {
    op: CompareOp,
    name: String,
}

impl CompositeEquality {
    /// Handler for `op`; only `Eq` and `Ne` are meaningful.
    pub fn new(op: CompareOp) -> Self {
        Self {
            op,
            name: format!("composite-{}", op.suffix()),
        }
    }
}

const COMPOSITE_PAIR: [CategoryPair; 1] = [(TypeCategory::Composite, TypeCategory::Composite)];

impl OperatorHandler for CompositeEquality {
    fn name(&self) -> &str {
        &self.name
    }

    fn operands(&self) -> &[CategoryPair] {
        &COMPOSITE_PAIR
    }

    fn apply(&self, left: &Value, right: &Value) -> Result<Value, EvalError> {
        match self.op {
            CompareOp::Eq => Ok(Value::Bool(left == right)),
            CompareOp::Ne => Ok(Value::Bool(left != right)),
            op => Err(mismatch(op, left, right)),
        }
    }
}

/// `IS NULL` / `IS NOT NULL`, defined for every operand.
#[derive(Debug, Clone, Copy)]
pub struct NullTest {
    negate: bool,
}

impl NullTest {
    /// `IS NULL` when `negate` is false, `IS NOT NULL` otherwise.
    pub fn new(negate: bool) -> Self {
        Self { negate }
    }
}

impl UnaryHandler for NullTest {
    fn name(&self) -> &str {
        if self.negate {
            "is-not-null"
        } else {
            "is-null"
        }
    }

    fn operands(&self) -> &[TypeCategory] {
        &TypeCategory::ALL
    }

    fn apply(&self, operand: &Value) -> Result<Value, EvalError> {
        Ok(Value::Bool(operand.is_null() != self.negate))
    }
}
