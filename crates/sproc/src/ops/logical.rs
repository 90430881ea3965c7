//! Boolean logic handlers

use crate::error::EvalError;
use crate::value::{TypeCategory, Value};

use super::{CategoryPair, OperatorHandler, UnaryHandler};

/// `AND` / `OR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    /// Conjunction
    And,
    /// Disjunction
    Or,
}

const BOOLEAN_PAIR: [CategoryPair; 1] = [(TypeCategory::Boolean, TypeCategory::Boolean)];

/// Boolean `AND` / `OR` on two already-evaluated operands.
///
/// Short-circuiting is the evaluator's business; by the time this handler
/// runs both sides exist.
#[derive(Debug, Clone, Copy)]
pub struct BooleanLogic {
    op: LogicOp,
}

impl BooleanLogic {
    /// Handler for `op`.
    pub fn new(op: LogicOp) -> Self {
        Self { op }
    }
}

impl OperatorHandler for BooleanLogic {
    fn name(&self) -> &str {
        match self.op {
            LogicOp::And => "boolean-and",
            LogicOp::Or => "boolean-or",
        }
    }

    fn operands(&self) -> &[CategoryPair] {
        &BOOLEAN_PAIR
    }

    fn apply(&self, left: &Value, right: &Value) -> Result<Value, EvalError> {
        match (left, right) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(match self.op {
                LogicOp::And => *a && *b,
                LogicOp::Or => *a || *b,
            })),
            _ => Err(EvalError::TypeMismatch {
                symbol: match self.op {
                    LogicOp::And => "AND",
                    LogicOp::Or => "OR",
                }
                .to_string(),
                left_type: left.type_name().to_string(),
                right_type: Some(right.type_name().to_string()),
                span: None,
            }),
        }
    }
}

/// `NOT`.
#[derive(Debug, Clone, Copy)]
pub struct BooleanNot;

impl UnaryHandler for BooleanNot {
    fn name(&self) -> &str {
        "boolean-not"
    }

    fn operands(&self) -> &[TypeCategory] {
        &[TypeCategory::Boolean]
    }

    fn apply(&self, operand: &Value) -> Result<Value, EvalError> {
        match operand {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            other => Err(EvalError::TypeMismatch {
                symbol: "NOT".to_string(),
                left_type: other.type_name().to_string(),
                right_type: None,
                span: None,
            }),
        }
    }
}
