//! Numeric arithmetic handlers

use crate::error::EvalError;
use crate::value::{TypeCategory, Value};

use super::{BinaryOp, CategoryPair, OperatorHandler, UnaryHandler};

/// Arithmetic operations covered by [`NumericArithmetic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`, truncating for two integers
    Div,
    /// `%`
    Mod,
}

impl ArithOp {
    /// The operator symbol this operation is registered under.
    pub fn binary(&self) -> BinaryOp {
        match self {
            ArithOp::Add => BinaryOp::Add,
            ArithOp::Sub => BinaryOp::Sub,
            ArithOp::Mul => BinaryOp::Mul,
            ArithOp::Div => BinaryOp::Div,
            ArithOp::Mod => BinaryOp::Mod,
        }
    }
}

const NUMERIC_PAIR: [CategoryPair; 1] = [(TypeCategory::Numeric, TypeCategory::Numeric)];

/// Integer and floating-point arithmetic.
///
/// Two integers use checked integer arithmetic; any float operand promotes
/// both sides to `f64`.
#[derive(Debug, Clone)]
pub struct NumericArithmetic {
    op: ArithOp,
    name: String,
}

impl NumericArithmetic {
    /// Handler for `op`.
    pub fn new(op: ArithOp) -> Self {
        let name = match op {
            ArithOp::Add => "numeric-add",
            ArithOp::Sub => "numeric-sub",
            ArithOp::Mul => "numeric-mul",
            ArithOp::Div => "numeric-div",
            ArithOp::Mod => "numeric-mod",
        };
        Self {
            op,
            name: name.to_string(),
        }
    }

    fn apply_int(&self, a: i64, b: i64) -> Result<Value, EvalError> {
        let result = match self.op {
            ArithOp::Add => a.checked_add(b),
            ArithOp::Sub => a.checked_sub(b),
            ArithOp::Mul => a.checked_mul(b),
            ArithOp::Div | ArithOp::Mod if b == 0 => {
                return Err(EvalError::division_by_zero())
            }
            ArithOp::Div => a.checked_div(b),
            ArithOp::Mod => a.checked_rem(b),
        };
        result
            .map(Value::Int)
            .ok_or_else(EvalError::integer_overflow)
    }

    fn apply_float(&self, a: f64, b: f64) -> Result<Value, EvalError> {
        let result = match self.op {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div | ArithOp::Mod if b == 0.0 => {
                return Err(EvalError::division_by_zero())
            }
            ArithOp::Div => a / b,
            ArithOp::Mod => a % b,
        };
        Ok(Value::Float(result))
    }
}

impl OperatorHandler for NumericArithmetic {
    fn name(&self) -> &str {
        &self.name
    }

    fn operands(&self) -> &[CategoryPair] {
        &NUMERIC_PAIR
    }

    fn apply(&self, left: &Value, right: &Value) -> Result<Value, EvalError> {
        match (left, right) {
            (Value::Int(a), Value::Int(b)) => self.apply_int(*a, *b),
            (l, r) => match (l.as_f64(), r.as_f64()) {
                (Some(a), Some(b)) => self.apply_float(a, b),
                _ => Err(EvalError::TypeMismatch {
                    symbol: self.op.binary().symbol().to_string(),
                    left_type: l.type_name().to_string(),
                    right_type: Some(r.type_name().to_string()),
                    span: None,
                }),
            },
        }
    }
}

/// Unary minus on numbers.
#[derive(Debug, Clone, Copy)]
pub struct NumericNegate;

impl UnaryHandler for NumericNegate {
    fn name(&self) -> &str {
        "numeric-negate"
    }

    fn operands(&self) -> &[TypeCategory] {
        &[TypeCategory::Numeric]
    }

    fn apply(&self, operand: &Value) -> Result<Value, EvalError> {
        match operand {
            Value::Int(n) => n
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(EvalError::integer_overflow),
            Value::Float(n) => Ok(Value::Float(-n)),
            other => Err(EvalError::TypeMismatch {
                symbol: "-".to_string(),
                left_type: other.type_name().to_string(),
                right_type: None,
                span: None,
            }),
        }
    }
}
